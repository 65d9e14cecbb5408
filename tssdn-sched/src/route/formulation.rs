/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! MILP formulation of joint multicast routing and slot selection.
//!
//! Variables, in declaration order:
//!
//! | Name | Domain | Meaning |
//! |---|---|---|
//! | `slot[c]` | {0, 1} | candidate slot `c` is chosen |
//! | `used[l]` | {0, 1} | link `l` is part of the tree |
//! | `load[l]` | 0..=\|dst\| | destinations served through `l` |
//! | `aux[l,c]` | {0, 1} | `used[l] ∧ slot[c]` |
//! | `max_load` | 0..=\|C\| | MiniMax only |
//!
//! Constraints: exactly one slot; flow conservation on `load`;
//! `|dst|·used[l] − load[l] ≥ 0`; the AND linearisation of `aux`; and
//! `busy(c, l) + aux[l,c] ≤ 1` for every candidate and link.  MiniMax adds
//! `Σ_c busy(c, l) + used[l] ≤ max_load` for links not leaving the source
//! and not entering a destination.

use std::collections::{BTreeMap, BTreeSet};

use crate::flow::{Link, NodeId, Slot};
use crate::milp::{LinearExpr, Model, Relation, Solution, SolverStatus, VarId};
use crate::state::LinkStateSnapshot;
use crate::topology::Topology;

use super::{Algorithm, RouteResult};

/// A built model plus the handles needed to read a solution back.
#[derive(Debug, Clone)]
pub struct RouteFormulation {
    model: Model,
    slot_vars: Vec<(Slot, VarId)>,
    link_vars: Vec<(Link, VarId)>,
}

impl RouteFormulation {
    pub fn build(
        algorithm: Algorithm,
        topology: &Topology,
        source: &str,
        destinations: &BTreeSet<NodeId>,
        snapshot: &LinkStateSnapshot,
    ) -> Self {
        let num_dst = destinations.len() as f64;
        let candidates: Vec<Slot> = snapshot.candidates().copied().collect();
        let links: Vec<Link> = topology.links().into_iter().collect();
        let position: BTreeMap<&Link, usize> =
            links.iter().enumerate().map(|(i, l)| (l, i)).collect();

        let name = match algorithm {
            Algorithm::ShortestAvailablePath => "shortest_available_path",
            Algorithm::MiniMax => "minimax",
        };
        let mut model = Model::new(name);

        // Slot variables first so a branching solver fixes the slot before
        // exploring routes, earliest candidate first.
        let slot_vars: Vec<(Slot, VarId)> = candidates
            .iter()
            .map(|c| {
                let v = model.add_binary(format!("slot{c}"));
                model.prefer_high(v);
                (*c, v)
            })
            .collect();

        let used: Vec<VarId> = links
            .iter()
            .map(|l| model.add_binary(format!("used{l}")))
            .collect();
        let load: Vec<VarId> = links
            .iter()
            .map(|l| model.add_integer(format!("load{l}"), 0, destinations.len() as i64))
            .collect();
        let aux: Vec<Vec<VarId>> = links
            .iter()
            .map(|l| {
                candidates
                    .iter()
                    .map(|c| model.add_binary(format!("aux{l}{c}")))
                    .collect()
            })
            .collect();

        // ── exactly one slot ──────────────────────────────────────────────────
        model.add_constraint(
            "one_slot",
            LinearExpr::sum(slot_vars.iter().map(|(_, v)| *v)),
            Relation::Equal,
            1.0,
        );

        // ── flow conservation ─────────────────────────────────────────────────
        let load_sum = |incident: Vec<Link>| {
            LinearExpr::sum(
                incident
                    .iter()
                    .filter_map(|l| position.get(l))
                    .map(|&i| load[i]),
            )
        };
        for node in topology.nodes() {
            let out = load_sum(topology.out_links(node).collect());
            let inc = load_sum(topology.in_links(node).collect());
            if node == source {
                model.add_constraint(format!("out[{node}]"), out, Relation::Equal, num_dst);
                model.add_constraint(format!("in[{node}]"), inc, Relation::Equal, 0.0);
            } else if destinations.contains(node) {
                model.add_constraint(format!("out[{node}]"), out, Relation::Equal, 0.0);
                model.add_constraint(format!("in[{node}]"), inc, Relation::Equal, 1.0);
            } else {
                let mut balance = out;
                for (v, a) in inc.terms() {
                    balance.add_term(v, -a);
                }
                model.add_constraint(format!("balance[{node}]"), balance, Relation::Equal, 0.0);
            }
        }

        // ── link usage, AND linearisation, collisions ─────────────────────────
        for (i, link) in links.iter().enumerate() {
            model.add_constraint(
                format!("usage{link}"),
                LinearExpr::new()
                    .with_term(used[i], num_dst)
                    .with_term(load[i], -1.0),
                Relation::GreaterEq,
                0.0,
            );

            for (j, (slot, slot_var)) in slot_vars.iter().enumerate() {
                let a = aux[i][j];
                model.add_constraint(
                    format!("and_link{link}{slot}"),
                    LinearExpr::new().with_term(a, 1.0).with_term(used[i], -1.0),
                    Relation::LessEq,
                    0.0,
                );
                model.add_constraint(
                    format!("and_slot{link}{slot}"),
                    LinearExpr::new().with_term(a, 1.0).with_term(*slot_var, -1.0),
                    Relation::LessEq,
                    0.0,
                );
                model.add_constraint(
                    format!("and_both{link}{slot}"),
                    LinearExpr::new()
                        .with_term(a, 1.0)
                        .with_term(used[i], -1.0)
                        .with_term(*slot_var, -1.0),
                    Relation::GreaterEq,
                    -1.0,
                );

                let busy = if snapshot.busy(slot, link) { 1.0 } else { 0.0 };
                let mut collision = LinearExpr::sum([a]);
                collision.add_constant(busy);
                model.add_constraint(format!("collision{link}{slot}"), collision, Relation::LessEq, 1.0);
            }
        }

        // ── objective ─────────────────────────────────────────────────────────
        match algorithm {
            Algorithm::ShortestAvailablePath => {
                model.set_objective(LinearExpr::sum(used.iter().copied()));
            }
            Algorithm::MiniMax => {
                let max_load = model.add_integer("max_load", 0, candidates.len() as i64);
                for (i, link) in links.iter().enumerate() {
                    if link.from == source || destinations.contains(&link.to) {
                        continue;
                    }
                    let mut expr = LinearExpr::new()
                        .with_term(used[i], 1.0)
                        .with_term(max_load, -1.0);
                    expr.add_constant(snapshot.busy_count(link) as f64);
                    model.add_constraint(format!("max_load{link}"), expr, Relation::LessEq, 0.0);
                }

                let mut objective = LinearExpr::sum([max_load]);
                let weight = tie_break_weight(links.len());
                for v in &used {
                    objective.add_term(*v, weight);
                }
                model.set_objective(objective);
            }
        }

        Self {
            model,
            slot_vars,
            link_vars: links.into_iter().zip(used).collect(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Read the chosen slot and links out of `solution`.
    ///
    /// A non-optimal status is passed through as `Infeasible`.  An optimal
    /// status with no selected slot variable is reported as `Undefined`.
    pub fn extract(&self, solution: &Solution) -> RouteResult {
        if !solution.status.is_optimal() {
            return RouteResult::Infeasible {
                status: solution.status,
            };
        }

        let Some(slot) = self
            .slot_vars
            .iter()
            .find(|(_, v)| solution.is_selected(*v))
            .map(|(s, _)| *s)
        else {
            return RouteResult::Infeasible {
                status: SolverStatus::Undefined,
            };
        };

        let links: Vec<Link> = self
            .link_vars
            .iter()
            .filter(|(_, v)| solution.is_selected(*v))
            .map(|(l, _)| l.clone())
            .collect();
        if links.is_empty() {
            return RouteResult::Infeasible {
                status: SolverStatus::Undefined,
            };
        }

        RouteResult::Scheduled { links, slot }
    }
}

/// `1 / links` rounded to five decimals; zero for an empty graph.
fn tie_break_weight(links: usize) -> f64 {
    if links == 0 {
        return 0.0;
    }
    (1.0 / links as f64 * 1e5).round() / 1e5
}

// ── Tests ─────────────────────────────────────────────────────────────────────
