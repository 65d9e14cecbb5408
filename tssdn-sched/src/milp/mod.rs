/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Solver-agnostic mixed-integer linear programs.
//!
//! The route optimizer builds a [`Model`] and hands it to whatever
//! [`MilpSolver`] the scheduler was constructed with.  The solver answers with
//! a [`Solution`]: a [`SolverStatus`] and one value per variable, in
//! declaration order.
//!
//! | Type | Role |
//! |---|---|
//! | [`Model`] | variables, linear constraints, minimisation objective |
//! | [`LinearExpr`] | sparse `Σ aᵢ·xᵢ + c` |
//! | [`MilpSolver`] | the injected solving capability |
//! | [`BranchAndBoundSolver`] | bundled exact backend for small instances |
//!
//! Every variable is integral with finite bounds, which is all the scheduling
//! formulations need.

pub mod branch_bound;

pub use branch_bound::BranchAndBoundSolver;

use std::collections::BTreeMap;
use std::fmt;

// ── Variables ─────────────────────────────────────────────────────────────────

/// Handle to a variable inside one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
}

/// Order in which a branching solver should try the values of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: i64,
    pub upper: i64,
    pub branch: BranchOrder,
}

// ── Linear expressions ────────────────────────────────────────────────────────

/// `Σ coefficient·variable + constant`.  Repeated terms are summed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of `vars`, each with coefficient 1.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        let mut e = Self::new();
        for v in vars {
            e.add_term(v, 1.0);
        }
        e
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) -> &mut Self {
        *self.terms.entry(var).or_insert(0.0) += coefficient;
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    /// Builder form of [`add_term`](Self::add_term).
    pub fn with_term(mut self, var: VarId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value of the expression under `values` (indexed by [`VarId::index`]).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
                .sum::<f64>()
    }
}

// ── Constraints ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    Equal,
    GreaterEq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::LessEq => "<=",
            Relation::Equal => "==",
            Relation::GreaterEq => ">=",
        })
    }
}

/// `expr (<=|==|>=) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    /// Whether `values` satisfy this constraint within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
            Relation::GreaterEq => lhs >= self.rhs - tolerance,
        }
    }
}

// ── Model ─────────────────────────────────────────────────────────────────────

/// A minimisation problem over bounded integer variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarKind::Binary, 0, 1)
    }

    pub fn add_integer(&mut self, name: impl Into<String>, lower: i64, upper: i64) -> VarId {
        self.push_var(name.into(), VarKind::Integer, lower, upper)
    }

    fn push_var(&mut self, name: String, kind: VarKind, lower: i64, upper: i64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name,
            kind,
            lower,
            upper,
            branch: BranchOrder::Ascending,
        });
        id
    }

    /// Ask branching solvers to try the high end of `var`'s domain first.
    pub fn prefer_high(&mut self, var: VarId) {
        if let Some(v) = self.variables.get_mut(var.0) {
            v.branch = BranchOrder::Descending;
        }
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            relation,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Every constraint holds and every value lies inside its bounds.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && self
                .variables
                .iter()
                .zip(values)
                .all(|(v, x)| *x >= v.lower as f64 - tolerance && *x <= v.upper as f64 + tolerance)
            && self.constraints.iter().all(|c| c.is_satisfied(values, tolerance))
    }
}

// ── Solver interface ──────────────────────────────────────────────────────────

/// Outcome of a solve, with stable raw integer codes.
///
/// | Variant | Code |
/// |---|---|
/// | `Optimal` | 1 |
/// | `NotSolved` | 0 |
/// | `Infeasible` | -1 |
/// | `Unbounded` | -2 |
/// | `Undefined` | -3 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStatus {
    Optimal,
    NotSolved,
    Infeasible,
    Unbounded,
    Undefined,
}

impl SolverStatus {
    pub fn code(self) -> i32 {
        match self {
            SolverStatus::Optimal => 1,
            SolverStatus::NotSolved => 0,
            SolverStatus::Infeasible => -1,
            SolverStatus::Unbounded => -2,
            SolverStatus::Undefined => -3,
        }
    }

    /// Parse a raw code.  Unknown codes map to `Undefined`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => SolverStatus::Optimal,
            0 => SolverStatus::NotSolved,
            -1 => SolverStatus::Infeasible,
            -2 => SolverStatus::Unbounded,
            _ => SolverStatus::Undefined,
        }
    }

    pub fn is_optimal(self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::NotSolved => "not solved",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::Undefined => "undefined",
        };
        write!(f, "{label} ({})", self.code())
    }
}

/// Threshold above which a nominally binary value counts as selected.
pub const SELECTION_THRESHOLD: f64 = 0.5;

/// Status plus one value per model variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolverStatus,
    pub values: Vec<f64>,
}

impl Solution {
    /// A solution with no assignment.
    pub fn with_status(status: SolverStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// `value(var) > 0.5`, the reading used for every binary decision.
    pub fn is_selected(&self, var: VarId) -> bool {
        self.value(var) > SELECTION_THRESHOLD
    }
}

/// An opaque MILP capability: submit a model, get back a status and an
/// assignment.
///
/// Calls are synchronous and non-cancellable.
pub trait MilpSolver: Send + Sync {
    fn solve(&self, model: &Model) -> Solution;

    /// Short backend name for log output.
    fn name(&self) -> &str {
        "milp"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
