/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-flow admission outcomes and the append-only log that holds them.

use std::time::Duration;

use crate::flow::{Flow, FlowClass};
use crate::route::{OptimizerTimings, RouteResult};

// ── ScheduleRecord ────────────────────────────────────────────────────────────

/// Outcome of admitting (or evaluating) one flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub flow: Flow,
    pub result: RouteResult,
    /// Accumulated over every optimizer attempt; `None` if the optimizer was
    /// never called.
    pub timings: Option<OptimizerTimings>,
    pub class: FlowClass,
    pub attempts: u32,
    /// Wall time spent on this flow, planning included.
    pub elapsed: Duration,
}

impl ScheduleRecord {
    pub fn is_scheduled(&self) -> bool {
        self.result.is_scheduled()
    }

    /// Number of links in the route; `0` for an unscheduled flow.
    pub fn route_len(&self) -> usize {
        self.result.links().len()
    }

    /// Equality ignoring the wall-clock fields.
    pub fn same_outcome(&self, other: &ScheduleRecord) -> bool {
        self.flow == other.flow
            && self.result == other.result
            && self.class == other.class
            && self.attempts == other.attempts
            && self.timings.is_some() == other.timings.is_some()
    }
}

// ── FlowDatabase ──────────────────────────────────────────────────────────────

/// Arrival-ordered log of [`ScheduleRecord`]s.  Records are only appended.
#[derive(Debug, Clone, Default)]
pub struct FlowDatabase {
    records: Vec<ScheduleRecord>,
}

/// Aggregate counts over a [`FlowDatabase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub flows: usize,
    pub edge_flows: usize,
    pub core_flows: usize,
    pub scheduled_edge: usize,
    pub scheduled_core: usize,
    /// Unscheduled flows for which the optimizer ran at least once.
    pub optimizer_failures: usize,
    pub max_elapsed: Duration,
    pub total_elapsed: Duration,
}

impl DatabaseSummary {
    pub fn scheduled(&self) -> usize {
        self.scheduled_edge + self.scheduled_core
    }

    pub fn mean_elapsed(&self) -> Duration {
        if self.flows == 0 {
            return Duration::ZERO;
        }
        self.total_elapsed / self.flows as u32
    }
}

/// Incremental outcomes measured against an optimal evaluation of the same
/// flow sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimalComparison {
    pub compared: usize,
    /// Incremental route longer than the optimal one, or scheduled
    /// incrementally while the optimal evaluation found nothing.
    pub suboptimal: usize,
    /// Scheduled optimally but not incrementally.
    pub false_negatives: usize,
    /// Scheduled both ways, incremental route shorter.
    pub better_than_optimal: usize,
}

impl FlowDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: ScheduleRecord) -> &ScheduleRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[ScheduleRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleRecord> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleRecord> {
        self.records.get(index)
    }

    pub fn last(&self) -> Option<&ScheduleRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn scheduled_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_scheduled()).count()
    }

    pub fn summary(&self) -> DatabaseSummary {
        let mut s = DatabaseSummary::default();
        for r in &self.records {
            s.flows += 1;
            match (r.class, r.is_scheduled()) {
                (FlowClass::Edge, true) => s.scheduled_edge += 1,
                (FlowClass::Core, true) => s.scheduled_core += 1,
                (_, false) if r.timings.is_some() => s.optimizer_failures += 1,
                _ => {}
            }
            match r.class {
                FlowClass::Edge => s.edge_flows += 1,
                FlowClass::Core => s.core_flows += 1,
            }
            s.total_elapsed += r.elapsed;
            s.max_elapsed = s.max_elapsed.max(r.elapsed);
        }
        s
    }

    /// Population standard deviation of the per-flow wall time.
    pub fn elapsed_std_dev(&self) -> Duration {
        if self.records.is_empty() {
            return Duration::ZERO;
        }
        let n = self.records.len() as f64;
        let mean = self.records.iter().map(|r| r.elapsed.as_secs_f64()).sum::<f64>() / n;
        let var = self
            .records
            .iter()
            .map(|r| (r.elapsed.as_secs_f64() - mean).powi(2))
            .sum::<f64>()
            / n;
        Duration::from_secs_f64(var.sqrt())
    }

    /// Pair records index by index with `optimal` and classify the
    /// differences.  Extra records on either side are ignored.
    pub fn compare_with_optimal(&self, optimal: &FlowDatabase) -> OptimalComparison {
        let mut cmp = OptimalComparison::default();
        for (inc, opt) in self.records.iter().zip(&optimal.records) {
            cmp.compared += 1;
            match (inc.is_scheduled(), opt.is_scheduled()) {
                (true, true) if inc.route_len() > opt.route_len() => cmp.suboptimal += 1,
                (true, true) if inc.route_len() < opt.route_len() => cmp.better_than_optimal += 1,
                (true, false) => cmp.suboptimal += 1,
                (false, true) => cmp.false_negatives += 1,
                _ => {}
            }
        }
        cmp
    }
}

impl<'a> IntoIterator for &'a FlowDatabase {
    type Item = &'a ScheduleRecord;
    type IntoIter = std::slice::Iter<'a, ScheduleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Link, Slot};
    use crate::milp::SolverStatus;

    fn record(class: FlowClass, result: RouteResult, ms: u64) -> ScheduleRecord {
        let optimized = class.is_core() && !matches!(result, RouteResult::NotAttempted);
        ScheduleRecord {
            flow: Flow::new("h0", ["h1"], 1).unwrap(),
            result,
            timings: optimized.then(OptimizerTimings::default),
            class,
            attempts: 1,
            elapsed: Duration::from_millis(ms),
        }
    }

    fn scheduled() -> RouteResult {
        RouteResult::Scheduled {
            links: vec![Link::new("h0", "s0"), Link::new("s0", "h1")],
            slot: Slot::new(0, 0),
        }
    }

    #[test]
    fn same_outcome_ignores_wall_clock() {
        let a = record(FlowClass::Core, scheduled(), 3);
        let mut b = a.clone();
        b.elapsed = Duration::from_secs(9);
        b.timings = Some(OptimizerTimings {
            build: Duration::from_millis(1),
            solve: Duration::from_millis(2),
        });
        assert!(a.same_outcome(&b));
        b.attempts = 2;
        assert!(!a.same_outcome(&b));
    }

    #[test]
    fn route_len_is_zero_when_unscheduled() {
        let r = record(
            FlowClass::Core,
            RouteResult::Infeasible {
                status: SolverStatus::Infeasible,
            },
            1,
        );
        assert!(!r.is_scheduled());
        assert_eq!(r.route_len(), 0);
        assert_eq!(record(FlowClass::Edge, scheduled(), 1).route_len(), 2);
    }

    #[test]
    fn summary_counts_by_class_and_outcome() {
        let mut db = FlowDatabase::new();
        db.push(record(FlowClass::Edge, scheduled(), 2));
        db.push(record(FlowClass::Core, scheduled(), 4));
        db.push(record(
            FlowClass::Core,
            RouteResult::Infeasible {
                status: SolverStatus::Infeasible,
            },
            6,
        ));
        db.push(record(FlowClass::Edge, RouteResult::NotAttempted, 0));

        let s = db.summary();
        assert_eq!(s.flows, 4);
        assert_eq!((s.edge_flows, s.core_flows), (2, 2));
        assert_eq!((s.scheduled_edge, s.scheduled_core), (1, 1));
        assert_eq!(s.optimizer_failures, 1);
        assert_eq!(s.max_elapsed, Duration::from_millis(6));
        assert_eq!(s.mean_elapsed(), Duration::from_millis(3));
        assert_eq!(db.scheduled_count(), 2);
    }

    #[test]
    fn std_dev_of_elapsed() {
        let mut db = FlowDatabase::new();
        assert_eq!(db.elapsed_std_dev(), Duration::ZERO);
        db.push(record(FlowClass::Edge, scheduled(), 2));
        db.push(record(FlowClass::Edge, scheduled(), 6));
        let sd = db.elapsed_std_dev().as_secs_f64();
        assert!((sd - 0.002).abs() < 1e-9, "{sd}");
    }

    // ── Optimal comparison ────────────────────────────────────────────────────

    #[test]
    fn comparison_classifies_route_differences() {
        let long = RouteResult::Scheduled {
            links: vec![
                Link::new("h0", "s0"),
                Link::new("s0", "s1"),
                Link::new("s1", "s0"),
                Link::new("s0", "h1"),
            ],
            slot: Slot::new(1, 0),
        };
        let failed = RouteResult::Infeasible {
            status: SolverStatus::Infeasible,
        };

        let mut inc = FlowDatabase::new();
        let mut opt = FlowDatabase::new();
        for (i, o) in [
            (long.clone(), scheduled()),
            (failed.clone(), scheduled()),
            (scheduled(), long),
            (scheduled(), scheduled()),
            (scheduled(), failed.clone()),
            (failed.clone(), failed),
        ] {
            inc.push(record(FlowClass::Core, i, 1));
            opt.push(record(FlowClass::Core, o, 1));
        }

        let cmp = inc.compare_with_optimal(&opt);
        assert_eq!(
            cmp,
            OptimalComparison {
                compared: 6,
                suboptimal: 2,
                false_negatives: 1,
                better_than_optimal: 1,
            }
        );
    }

    #[test]
    fn scheduled_flow_with_failed_optimal_is_suboptimal() {
        let mut inc = FlowDatabase::new();
        let mut opt = FlowDatabase::new();
        inc.push(record(FlowClass::Core, scheduled(), 1));
        opt.push(record(
            FlowClass::Core,
            RouteResult::Infeasible {
                status: SolverStatus::NotSolved,
            },
            1,
        ));

        let cmp = inc.compare_with_optimal(&opt);
        assert_eq!(cmp.suboptimal, 1);
        assert_eq!(cmp.false_negatives + cmp.better_than_optimal, 0);
    }
}
