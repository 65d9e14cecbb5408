/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Joint route and slot selection for one core flow.
//!
//! [`RouteOptimizer::optimize`] takes the topology, the flow endpoints and a
//! [`LinkStateSnapshot`] covering a batch of candidate slots, optionally
//! trims the topology, formulates a MILP (see [`formulation`]) and hands it
//! to the injected [`MilpSolver`].  The solve either yields a multicast tree
//! plus the one slot it occupies, or the solver status explaining why not.
//!
//! The optimizer never touches the link-state store; committing a route is
//! the scheduler's job.

pub mod formulation;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flow::{Link, NodeId, Slot};
use crate::milp::{MilpSolver, SolverStatus};
use crate::state::LinkStateSnapshot;
use crate::topology::{trim::trim_for_flow, Topology};

use formulation::RouteFormulation;

// ── Algorithm ─────────────────────────────────────────────────────────────────

/// Objective used by the route optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// Minimise the number of links in the tree.
    #[default]
    #[serde(rename = "shortest_available_path", alias = "sap")]
    ShortestAvailablePath,
    /// Minimise the most loaded interior link, then the tree size.
    #[serde(rename = "minimax", alias = "mm")]
    MiniMax,
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sap" | "shortest_available_path" => Ok(Algorithm::ShortestAvailablePath),
            "mm" | "minimax" => Ok(Algorithm::MiniMax),
            other => Err(format!(
                "unknown algorithm '{other}' (valid: sap, shortest_available_path, mm, minimax)"
            )),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::ShortestAvailablePath => "shortest_available_path",
            Algorithm::MiniMax => "minimax",
        })
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// What routing a flow produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    /// A route of at least one link, transmitting at `slot`.
    Scheduled { links: Vec<Link>, slot: Slot },
    /// The solver ran and found nothing; `status` is its raw verdict.
    Infeasible { status: SolverStatus },
    /// No candidate slot existed, so nothing was tried.
    NotAttempted,
}

impl RouteResult {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, RouteResult::Scheduled { .. })
    }

    /// Links of a scheduled route; empty otherwise.
    pub fn links(&self) -> &[Link] {
        match self {
            RouteResult::Scheduled { links, .. } => links,
            _ => &[],
        }
    }

    pub fn slot(&self) -> Option<Slot> {
        match self {
            RouteResult::Scheduled { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<SolverStatus> {
        match self {
            RouteResult::Infeasible { status } => Some(*status),
            _ => None,
        }
    }
}

/// Time spent building and solving MILP models for one flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizerTimings {
    pub build: Duration,
    pub solve: Duration,
}

impl OptimizerTimings {
    pub fn accumulate(&mut self, other: OptimizerTimings) {
        self.build += other.build;
        self.solve += other.solve;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerOutcome {
    pub result: RouteResult,
    pub timings: OptimizerTimings,
}

// ── RouteOptimizer ────────────────────────────────────────────────────────────

/// Builds and solves one routing MILP per call.
#[derive(Clone)]
pub struct RouteOptimizer {
    algorithm: Algorithm,
    trimming: bool,
    solver: Arc<dyn MilpSolver>,
}

impl fmt::Debug for RouteOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptimizer")
            .field("algorithm", &self.algorithm)
            .field("trimming", &self.trimming)
            .field("solver", &self.solver.name())
            .finish()
    }
}

impl RouteOptimizer {
    pub fn new(algorithm: Algorithm, trimming: bool, solver: Arc<dyn MilpSolver>) -> Self {
        Self {
            algorithm,
            trimming,
            solver,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn trimming(&self) -> bool {
        self.trimming
    }

    pub fn solver(&self) -> Arc<dyn MilpSolver> {
        Arc::clone(&self.solver)
    }

    /// Route a flow from `source` to `destinations` in one of the snapshot's
    /// candidate slots.
    ///
    /// An empty snapshot returns `Infeasible { NotSolved }` without calling
    /// the solver.  `topology` is never modified; trimming works on a copy.
    pub fn optimize(
        &self,
        topology: &Topology,
        source: &str,
        destinations: &BTreeSet<NodeId>,
        snapshot: &LinkStateSnapshot,
    ) -> OptimizerOutcome {
        if snapshot.is_empty() {
            return OptimizerOutcome {
                result: RouteResult::Infeasible {
                    status: SolverStatus::NotSolved,
                },
                timings: OptimizerTimings::default(),
            };
        }

        let build_start = Instant::now();
        let trimmed;
        let graph = if self.trimming {
            trimmed = trim_for_flow(topology, source, destinations);
            &trimmed
        } else {
            topology
        };
        let formulation =
            RouteFormulation::build(self.algorithm, graph, source, destinations, snapshot);
        let build = build_start.elapsed();

        let solve_start = Instant::now();
        let solution = self.solver.solve(formulation.model());
        let solve = solve_start.elapsed();

        let result = formulation.extract(&solution);

        debug!(
            algorithm = %self.algorithm,
            solver = self.solver.name(),
            source,
            candidates = snapshot.len(),
            links = graph.link_count(),
            variables = formulation.model().variables().len(),
            constraints = formulation.model().constraints().len(),
            status = %solution.status,
            build_us = build.as_micros() as u64,
            solve_us = solve.as_micros() as u64,
            "route optimizer finished"
        );

        OptimizerOutcome {
            result,
            timings: OptimizerTimings { build, solve },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
