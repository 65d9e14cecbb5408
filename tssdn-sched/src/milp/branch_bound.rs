/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exact depth-first branch-and-bound over bounded integer variables.
//!
//! At every search node the solver
//!
//! 1. propagates interval bounds through all rows until nothing changes
//!    (rows whose activity range cannot meet their bounds prune the node),
//! 2. prunes on the objective lower bound implied by the current domains,
//! 3. branches on the first unfixed variable in declaration order, trying
//!    values in the variable's [`BranchOrder`].
//!
//! Ties keep the first incumbent found, so the result is deterministic for a
//! given model.  The search is exponential in the worst case; it is meant for
//! the compact formulations a trimmed topology produces.

use tracing::{debug, trace};

use super::{BranchOrder, MilpSolver, Model, Relation, Solution, SolverStatus};

const EPS: f64 = 1e-9;

/// Domains wider than this are bisected instead of enumerated.
const ENUMERATION_WIDTH: i64 = 8;

/// Bundled exact solver.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver {
    node_limit: Option<u64>,
}

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `limit` search nodes.  The best incumbent found so far is
    /// returned as `Optimal`; without one the status is `NotSolved`.
    pub fn with_node_limit(limit: u64) -> Self {
        Self {
            node_limit: Some(limit),
        }
    }
}

/// `lo ≤ Σ aᵢ·xᵢ ≤ hi`, constants already folded into the bounds.
struct Row {
    terms: Vec<(usize, f64)>,
    lo: f64,
    hi: f64,
}

fn build_rows(model: &Model) -> Vec<Row> {
    model
        .constraints()
        .iter()
        .map(|c| {
            let rhs = c.rhs - c.expr.constant();
            let (lo, hi) = match c.relation {
                Relation::LessEq => (f64::NEG_INFINITY, rhs),
                Relation::Equal => (rhs, rhs),
                Relation::GreaterEq => (rhs, f64::INFINITY),
            };
            Row {
                terms: c
                    .expr
                    .terms()
                    .filter(|(_, a)| *a != 0.0)
                    .map(|(v, a)| (v.index(), a))
                    .collect(),
                lo,
                hi,
            }
        })
        .collect()
}

/// Tighten `lb`/`ub` to a fixpoint.  Returns `false` when some row can no
/// longer be satisfied.
fn propagate(rows: &[Row], lb: &mut [i64], ub: &mut [i64]) -> bool {
    loop {
        let mut changed = false;
        for row in rows {
            let mut min_act = 0.0;
            let mut max_act = 0.0;
            for &(j, a) in &row.terms {
                if a > 0.0 {
                    min_act += a * lb[j] as f64;
                    max_act += a * ub[j] as f64;
                } else {
                    min_act += a * ub[j] as f64;
                    max_act += a * lb[j] as f64;
                }
            }
            if min_act > row.hi + EPS || max_act < row.lo - EPS {
                return false;
            }

            // min_act/max_act may go stale as terms tighten below; stale
            // values only weaken the derived bounds.
            for &(j, a) in &row.terms {
                let (t_min, t_max) = if a > 0.0 {
                    (a * lb[j] as f64, a * ub[j] as f64)
                } else {
                    (a * ub[j] as f64, a * lb[j] as f64)
                };

                if row.hi.is_finite() {
                    let slack = row.hi - (min_act - t_min);
                    if a > 0.0 {
                        let bound = (slack / a + EPS).floor() as i64;
                        if bound < ub[j] {
                            ub[j] = bound;
                            changed = true;
                        }
                    } else {
                        let bound = (slack / a - EPS).ceil() as i64;
                        if bound > lb[j] {
                            lb[j] = bound;
                            changed = true;
                        }
                    }
                }

                if row.lo.is_finite() {
                    let need = row.lo - (max_act - t_max);
                    if a > 0.0 {
                        let bound = (need / a - EPS).ceil() as i64;
                        if bound > lb[j] {
                            lb[j] = bound;
                            changed = true;
                        }
                    } else {
                        let bound = (need / a + EPS).floor() as i64;
                        if bound < ub[j] {
                            ub[j] = bound;
                            changed = true;
                        }
                    }
                }

                if lb[j] > ub[j] {
                    return false;
                }
            }
        }
        if !changed {
            return true;
        }
    }
}

fn objective_lower_bound(objective: &[(usize, f64)], constant: f64, lb: &[i64], ub: &[i64]) -> f64 {
    constant
        + objective
            .iter()
            .map(|&(j, a)| if a > 0.0 { a * lb[j] as f64 } else { a * ub[j] as f64 })
            .sum::<f64>()
}

impl MilpSolver for BranchAndBoundSolver {
    fn solve(&self, model: &Model) -> Solution {
        let rows = build_rows(model);
        let objective: Vec<(usize, f64)> = model
            .objective()
            .terms()
            .map(|(v, a)| (v.index(), a))
            .collect();
        let constant = model.objective().constant();
        let order: Vec<BranchOrder> = model.variables().iter().map(|v| v.branch).collect();

        let lb0: Vec<i64> = model.variables().iter().map(|v| v.lower).collect();
        let ub0: Vec<i64> = model.variables().iter().map(|v| v.upper).collect();
        if lb0.iter().zip(&ub0).any(|(l, u)| l > u) {
            return Solution::with_status(SolverStatus::Infeasible);
        }

        let mut best: Option<(f64, Vec<i64>)> = None;
        let mut stack: Vec<(Vec<i64>, Vec<i64>)> = vec![(lb0, ub0)];
        let mut nodes: u64 = 0;
        let mut truncated = false;

        while let Some((mut lb, mut ub)) = stack.pop() {
            if self.node_limit.is_some_and(|limit| nodes >= limit) {
                truncated = true;
                break;
            }
            nodes += 1;

            if !propagate(&rows, &mut lb, &mut ub) {
                continue;
            }
            let bound = objective_lower_bound(&objective, constant, &lb, &ub);
            if let Some((incumbent, _)) = &best {
                if bound >= *incumbent - EPS {
                    continue;
                }
            }

            match (0..lb.len()).find(|&j| lb[j] < ub[j]) {
                None => {
                    trace!(objective = bound, nodes, "new incumbent");
                    best = Some((bound, lb));
                }
                Some(j) => {
                    let (lo, hi) = (lb[j], ub[j]);
                    let mut children: Vec<(i64, i64)> = if hi - lo >= ENUMERATION_WIDTH {
                        let mid = lo + (hi - lo) / 2;
                        vec![(lo, mid), (mid + 1, hi)]
                    } else {
                        (lo..=hi).map(|v| (v, v)).collect()
                    };
                    if order[j] == BranchOrder::Ascending {
                        // stack is LIFO: push the preferred child last
                        children.reverse();
                    }
                    for (clo, chi) in children {
                        let mut l = lb.clone();
                        let mut u = ub.clone();
                        l[j] = clo;
                        u[j] = chi;
                        stack.push((l, u));
                    }
                }
            }
        }

        debug!(
            model = model.name(),
            variables = model.variables().len(),
            constraints = model.constraints().len(),
            nodes,
            truncated,
            found = best.is_some(),
            "branch-and-bound finished"
        );

        match best {
            Some((_, values)) => Solution {
                status: SolverStatus::Optimal,
                values: values.into_iter().map(|v| v as f64).collect(),
            },
            None if truncated => Solution::with_status(SolverStatus::NotSolved),
            None => Solution::with_status(SolverStatus::Infeasible),
        }
    }

    fn name(&self) -> &str {
        "branch-and-bound"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::LinearExpr;

    #[test]
    fn solves_small_knapsack_minimisation() {
        // min 3x + 2y + 4z  s.t.  x + y + z >= 2
        let mut m = Model::new("knap");
        let x = m.add_binary("x");
        let y = m.add_binary("y");
        let z = m.add_binary("z");
        m.add_constraint("cover", LinearExpr::sum([x, y, z]), Relation::GreaterEq, 2.0);
        m.set_objective(
            LinearExpr::new()
                .with_term(x, 3.0)
                .with_term(y, 2.0)
                .with_term(z, 4.0),
        );

        let sol = BranchAndBoundSolver::new().solve(&m);
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.values, vec![1.0, 1.0, 0.0]);
        assert!(m.is_feasible(&sol.values, 1e-9));
    }

    #[test]
    fn reports_infeasible_models() {
        let mut m = Model::new("bad");
        let x = m.add_binary("x");
        let y = m.add_binary("y");
        m.add_constraint("both", LinearExpr::sum([x, y]), Relation::Equal, 3.0);
        let sol = BranchAndBoundSolver::new().solve(&m);
        assert_eq!(sol.status, SolverStatus::Infeasible);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn handles_wide_integer_domains() {
        // min -v  s.t.  3v <= 100, v in [0, 1000]  → v = 33
        let mut m = Model::new("wide");
        let v = m.add_integer("v", 0, 1000);
        m.add_constraint("cap", LinearExpr::new().with_term(v, 3.0), Relation::LessEq, 100.0);
        m.set_objective(LinearExpr::new().with_term(v, -1.0));
        let sol = BranchAndBoundSolver::new().solve(&m);
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.value(v), 33.0);
    }

    #[test]
    fn fractional_coefficients_are_respected() {
        // y >= x / 4 written with a fractional coefficient; x = 3 forces y = 1
        let mut m = Model::new("frac");
        let x = m.add_integer("x", 0, 4);
        let y = m.add_binary("y");
        m.add_constraint("fix", LinearExpr::new().with_term(x, 1.0), Relation::Equal, 3.0);
        m.add_constraint(
            "link",
            LinearExpr::new().with_term(y, 1.0).with_term(x, -0.25),
            Relation::GreaterEq,
            0.0,
        );
        m.set_objective(LinearExpr::sum([y]));
        let sol = BranchAndBoundSolver::new().solve(&m);
        assert_eq!(sol.value(y), 1.0);
    }

    #[test]
    fn ties_keep_the_preferred_branch() {
        // exactly one of a, b; both cost the same. Descending order on `a`
        // makes a = 1 the first incumbent.
        let mut m = Model::new("tie");
        let a = m.add_binary("a");
        let b = m.add_binary("b");
        m.prefer_high(a);
        m.add_constraint("one", LinearExpr::sum([a, b]), Relation::Equal, 1.0);
        m.set_objective(LinearExpr::sum([a, b]));
        let sol = BranchAndBoundSolver::new().solve(&m);
        assert!(sol.is_selected(a));
        assert!(!sol.is_selected(b));
    }

    #[test]
    fn constant_terms_fold_into_bounds() {
        // (x + 1) <= 1  → x = 0 even though x prefers high
        let mut m = Model::new("const");
        let x = m.add_binary("x");
        m.prefer_high(x);
        let mut e = LinearExpr::sum([x]);
        e.add_constant(1.0);
        m.add_constraint("c", e, Relation::LessEq, 1.0);
        let sol = BranchAndBoundSolver::new().solve(&m);
        assert_eq!(sol.value(x), 0.0);
    }

    #[test]
    fn node_limit_without_incumbent_is_not_solved() {
        let mut m = Model::new("limited");
        let vars: Vec<_> = (0..6).map(|i| m.add_binary(format!("x{i}"))).collect();
        m.add_constraint("odd", LinearExpr::sum(vars.clone()), Relation::Equal, 3.0);
        let sol = BranchAndBoundSolver::with_node_limit(0).solve(&m);
        assert_eq!(sol.status, SolverStatus::NotSolved);
    }
}
