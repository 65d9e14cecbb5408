/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Incremental admission of time-triggered flows.
//!
//! [`IncrementalScheduler`] admits one flow at a time, in arrival order:
//!
//! 1. **classify**: edge flow (one switch) or core flow (several switches);
//! 2. **rank** timeslots with [`rank_slots`];
//! 3. **route**: edge flows take the best-ranked slot on their mandatory
//!    links directly; core flows go through the [`RouteOptimizer`], either
//!    in ranked batches of `slice_size` slots (at most `max_attempts` of
//!    them) or in a single attempt over every timeslot and phase;
//! 4. **commit** a found route to the [`LinkStateStore`] and append a
//!    [`ScheduleRecord`] to the [`FlowDatabase`], success or not.
//!
//! Planning (steps 1–3) only reads state and lives on [`FlowPlanner`], so it
//! can run against a cloned snapshot off the critical path.  Committing
//! (step 4) goes through [`IncrementalScheduler::admit`], which re-plans any
//! plan computed against an outdated link-state generation.
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Map iteration order | `BTreeMap` / `BTreeSet` everywhere, deterministic replays |
//! | Failure to schedule | a record with `RouteResult::Infeasible` / `NotAttempted`, never an `Err` |
//! | Invariant violation on commit | `Err(SchedulerError::StateViolation)`, no record, store unchanged |
//! | Optimal evaluation | separate database, never mutates the store |
//!
//! # Example
//! ```rust,ignore
//! let model = TopologyModel::classify_by_prefix(topology)?;
//! let mut scheduler = IncrementalScheduler::new(model, config, Arc::new(BranchAndBoundSolver::new()))?;
//! scheduler.configure();
//! let record = scheduler.schedule_flow(&Flow::new("h0", ["h3"], 2)?)?;
//! ```

pub mod admission;
pub mod error;
pub mod record;
pub mod slots;

pub use error::SchedulerError;
pub use record::{DatabaseSummary, FlowDatabase, OptimalComparison, ScheduleRecord};
pub use slots::{rank_slots, RankedSlot};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::flow::{Flow, FlowClass, Link, NodeId, Slot};
use crate::milp::MilpSolver;
use crate::route::{OptimizerTimings, RouteOptimizer, RouteResult};
use crate::state::LinkStateStore;
use crate::topology::{Topology, TopologyModel};

// ── Internal types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanMode {
    /// Sliced/retried per the configuration; the result may be committed.
    Incremental,
    /// Single attempt over every slot; never committed.
    Optimal,
}

/// What the routing step produced for one flow.
struct Routing {
    result: RouteResult,
    timings: Option<OptimizerTimings>,
    attempts: u32,
}

impl Routing {
    fn not_attempted() -> Self {
        Self {
            result: RouteResult::NotAttempted,
            timings: None,
            attempts: 0,
        }
    }
}

// ── FlowPlan ──────────────────────────────────────────────────────────────────

/// A scheduling decision computed against one link-state generation and not
/// yet committed.
#[derive(Debug, Clone)]
pub struct FlowPlan {
    record: ScheduleRecord,
    generation: u64,
}

impl FlowPlan {
    pub fn flow(&self) -> &Flow {
        &self.record.flow
    }

    pub fn record(&self) -> &ScheduleRecord {
        &self.record
    }

    /// Link-state generation the plan was computed against.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ── FlowPlanner ───────────────────────────────────────────────────────────────

/// The read-only half of the scheduler: topology, configuration, optimizer
/// and a link-state table to plan against.
///
/// Cloning a planner clones its link-state table, which is how the admission
/// pipeline takes an immutable snapshot.
#[derive(Debug, Clone)]
pub struct FlowPlanner {
    topology: Arc<TopologyModel>,
    config: SchedulerConfig,
    optimizer: RouteOptimizer,
    state: LinkStateStore,
}

impl FlowPlanner {
    /// Plan `flow` for incremental admission against this planner's state.
    ///
    /// # Errors
    /// [`SchedulerError::NotConfigured`] and [`SchedulerError::UnknownHost`].
    pub fn plan(&self, flow: &Flow) -> Result<FlowPlan, SchedulerError> {
        let record = self.evaluate(flow, PlanMode::Incremental)?;
        Ok(FlowPlan {
            record,
            generation: self.state.generation(),
        })
    }

    pub fn link_state(&self) -> &LinkStateStore {
        &self.state
    }

    fn evaluate(&self, flow: &Flow, mode: PlanMode) -> Result<ScheduleRecord, SchedulerError> {
        let start = Instant::now();
        self.ensure_configured()?;
        let (class, mandatory) = self.classify(flow)?;

        let routing = match class {
            FlowClass::Edge => self.route_edge_flow(flow, mandatory),
            FlowClass::Core if mode == PlanMode::Optimal || !self.config.slicing_enabled() => {
                self.route_unsliced(flow, &mandatory)
            }
            FlowClass::Core => self.route_sliced(flow, &mandatory),
        };

        Ok(ScheduleRecord {
            flow: flow.clone(),
            result: routing.result,
            timings: routing.timings,
            class,
            attempts: routing.attempts,
            elapsed: start.elapsed(),
        })
    }

    fn ensure_configured(&self) -> Result<(), SchedulerError> {
        if !self.state.is_configured() || self.state.total_slots() != self.config.total_slots {
            return Err(SchedulerError::NotConfigured {
                configured: self.state.total_slots(),
                requested: self.config.total_slots,
            });
        }
        Ok(())
    }

    /// Edge/core classification plus the mandatory links: `source → switch`
    /// and `switch → destination` for every destination.
    fn classify(&self, flow: &Flow) -> Result<(FlowClass, Vec<Link>), SchedulerError> {
        let switch_of = |host: &str| {
            self.topology
                .switch_of(host)
                .ok_or_else(|| SchedulerError::UnknownHost {
                    host: host.to_string(),
                })
        };

        let src_switch = switch_of(flow.source())?;
        let mut switches: BTreeSet<&NodeId> = BTreeSet::from([src_switch]);
        let mut mandatory = vec![Link::new(flow.source(), src_switch.clone())];
        for dst in flow.destinations() {
            let sw = switch_of(dst)?;
            switches.insert(sw);
            mandatory.push(Link::new(sw.clone(), dst.clone()));
        }

        let class = if switches.len() > 1 {
            FlowClass::Core
        } else {
            FlowClass::Edge
        };
        Ok((class, mandatory))
    }

    /// Links covered by an optimizer snapshot: every core link, plus the
    /// mandatory links (trimmed) or every edge link (untrimmed).
    fn snapshot_links<'a>(&'a self, mandatory: &'a [Link]) -> Vec<&'a Link> {
        let mut links: Vec<&Link> = self.topology.core_links().iter().collect();
        if self.optimizer.trimming() {
            links.extend(mandatory.iter());
        } else {
            links.extend(self.topology.edge_links().iter());
        }
        links
    }

    // ── Routing paths ─────────────────────────────────────────────────────────

    fn route_edge_flow(&self, flow: &Flow, mandatory: Vec<Link>) -> Routing {
        let best = rank_slots(&self.state, flow, &mandatory, false).first().copied();
        match best {
            Some(best) => Routing {
                result: RouteResult::Scheduled {
                    links: mandatory,
                    slot: best.slot,
                },
                timings: None,
                attempts: 1,
            },
            None => Routing::not_attempted(),
        }
    }

    fn route_unsliced(&self, flow: &Flow, mandatory: &[Link]) -> Routing {
        let period = flow.period();
        let candidates: Vec<Slot> = (0..self.state.total_slots())
            .flat_map(|t| (0..period).map(move |ph| Slot::new(t, ph)))
            .collect();
        let links = self.snapshot_links(mandatory);
        let snapshot = self.state.snapshot(candidates, period, links.iter().copied());

        let outcome = self.optimizer.optimize(
            self.topology.topology(),
            flow.source(),
            flow.destinations(),
            &snapshot,
        );
        debug!(
            flow = %flow,
            algorithm = %self.optimizer.algorithm(),
            candidates = snapshot.len(),
            build_us = outcome.timings.build.as_micros() as u64,
            solve_us = outcome.timings.solve.as_micros() as u64,
            scheduled = outcome.result.is_scheduled(),
            "single-shot optimizer attempt"
        );

        Routing {
            result: outcome.result,
            timings: Some(outcome.timings),
            attempts: 1,
        }
    }

    fn route_sliced(&self, flow: &Flow, mandatory: &[Link]) -> Routing {
        let ranked = rank_slots(&self.state, flow, mandatory, true);
        if ranked.is_empty() {
            return Routing::not_attempted();
        }

        let period = flow.period();
        let links = self.snapshot_links(mandatory);
        let mut timings = OptimizerTimings::default();
        let mut attempts = 0u32;
        let mut result = RouteResult::NotAttempted;

        for (batch, chunk) in ranked.chunks(self.config.slice_size).enumerate() {
            if attempts >= self.config.max_attempts {
                break;
            }
            attempts += 1;

            let snapshot =
                self.state
                    .snapshot(chunk.iter().map(|r| r.slot), period, links.iter().copied());
            let outcome = self.optimizer.optimize(
                self.topology.topology(),
                flow.source(),
                flow.destinations(),
                &snapshot,
            );
            timings.accumulate(outcome.timings);

            debug!(
                flow = %flow,
                algorithm = %self.optimizer.algorithm(),
                batch,
                candidates = chunk.len(),
                build_us = outcome.timings.build.as_micros() as u64,
                solve_us = outcome.timings.solve.as_micros() as u64,
                scheduled = outcome.result.is_scheduled(),
                "sliced optimizer attempt"
            );

            result = outcome.result;
            if result.is_scheduled() {
                break;
            }
        }

        Routing {
            result,
            timings: Some(timings),
            attempts,
        }
    }
}

// ── IncrementalScheduler ──────────────────────────────────────────────────────

/// Per-flow admission over a fixed topology.
///
/// Owns the only mutable link-state table.  Every admitted flow appends
/// exactly one record to [`flow_database`](Self::flow_database) and changes
/// the link state at most once.
#[derive(Debug)]
pub struct IncrementalScheduler {
    planner: FlowPlanner,
    flow_db: FlowDatabase,
    optimal_db: FlowDatabase,
}

impl IncrementalScheduler {
    /// Create a scheduler over a classified topology.  Call
    /// [`configure`](Self::configure) before scheduling.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        topology: TopologyModel,
        config: SchedulerConfig,
        solver: Arc<dyn MilpSolver>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        info!(
            algorithm = %config.algorithm,
            solver = solver.name(),
            total_slots = config.total_slots,
            topology_trimming = config.topology_trimming,
            slice_size = config.slice_size,
            max_attempts = config.max_attempts,
            "IncrementalScheduler created"
        );
        let optimizer = RouteOptimizer::new(config.algorithm, config.topology_trimming, solver);
        Ok(Self {
            planner: FlowPlanner {
                topology: Arc::new(topology),
                config,
                optimizer,
                state: LinkStateStore::new(),
            },
            flow_db: FlowDatabase::new(),
            optimal_db: FlowDatabase::new(),
        })
    }

    /// Classify `topology` by the host-prefix convention, then [`new`](Self::new).
    pub fn from_topology(
        topology: Topology,
        config: SchedulerConfig,
        solver: Arc<dyn MilpSolver>,
    ) -> Result<Self, SchedulerError> {
        let model = TopologyModel::classify_by_prefix(topology)?;
        Self::new(model, config, solver)
    }

    /// (Re)initialise the link state for the configured number of timeslots.
    /// Every entry starts free; previously committed flows are forgotten.
    pub fn configure(&mut self) {
        let planner = &mut self.planner;
        planner.state.configure(
            planner.config.total_slots,
            planner.topology.core_links(),
            planner.topology.edge_links(),
        );
    }

    /// Replace the configuration.  A changed `total_slots` takes effect at
    /// the next [`configure`](Self::configure); scheduling before that fails
    /// with [`SchedulerError::NotConfigured`].
    pub fn set_config(&mut self, config: SchedulerConfig) -> Result<(), SchedulerError> {
        config.validate()?;
        self.planner.optimizer = RouteOptimizer::new(
            config.algorithm,
            config.topology_trimming,
            self.planner.optimizer.solver(),
        );
        self.planner.config = config;
        Ok(())
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    /// Plan, commit and record `flow`.
    ///
    /// # Errors
    /// Rejected input ([`SchedulerError::UnknownHost`],
    /// [`SchedulerError::NotConfigured`]) or a fatal
    /// [`SchedulerError::StateViolation`].  Failing to find a route is not an
    /// error; it yields an unscheduled record.
    pub fn schedule_flow(&mut self, flow: &Flow) -> Result<&ScheduleRecord, SchedulerError> {
        let plan = self.plan_flow(flow)?;
        self.admit(plan)
    }

    /// Plan `flow` against the live link state without committing.
    pub fn plan_flow(&self, flow: &Flow) -> Result<FlowPlan, SchedulerError> {
        self.planner.plan(flow)
    }

    /// Commit and record a plan.  A plan computed against an older link-state
    /// generation is recomputed against live state first.
    pub fn admit(&mut self, plan: FlowPlan) -> Result<&ScheduleRecord, SchedulerError> {
        let plan = if plan.generation != self.planner.state.generation() {
            debug!(
                flow = %plan.flow(),
                planned = plan.generation,
                live = self.planner.state.generation(),
                "stale plan, re-planning against live state"
            );
            self.planner.plan(plan.flow())?
        } else {
            plan
        };
        let record = plan.record;

        match &record.result {
            RouteResult::Scheduled { links, slot } => {
                if let Err(violation) = self.planner.state.commit(record.flow.period(), links, *slot) {
                    error!(
                        flow = %record.flow,
                        error = %violation,
                        "link state violation, flow aborted"
                    );
                    return Err(violation.into());
                }
                info!(
                    flow = %record.flow,
                    class = %record.class,
                    slot = %slot,
                    route_len = links.len(),
                    attempts = record.attempts,
                    "flow scheduled"
                );
            }
            other => {
                warn!(
                    flow = %record.flow,
                    class = %record.class,
                    status = ?other.status(),
                    attempts = record.attempts,
                    "flow not scheduled"
                );
            }
        }

        Ok(self.flow_db.push(record))
    }

    /// Evaluate `flow` with a single attempt over every slot and record the
    /// outcome in the optimal database.  The link state is never modified.
    pub fn schedule_flow_optimally(&mut self, flow: &Flow) -> Result<&ScheduleRecord, SchedulerError> {
        let record = self.planner.evaluate(flow, PlanMode::Optimal)?;
        debug!(
            flow = %record.flow,
            class = %record.class,
            route_len = record.route_len(),
            "optimal evaluation"
        );
        Ok(self.optimal_db.push(record))
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn flow_database(&self) -> &FlowDatabase {
        &self.flow_db
    }

    pub fn optimal_flow_database(&self) -> &FlowDatabase {
        &self.optimal_db
    }

    pub fn link_state(&self) -> &LinkStateStore {
        &self.planner.state
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.planner.config
    }

    pub fn topology(&self) -> &TopologyModel {
        &self.planner.topology
    }

    /// The planning half of the scheduler; clone it for an immutable
    /// snapshot of the current link state.
    pub fn planner(&self) -> &FlowPlanner {
        &self.planner
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{BranchAndBoundSolver, Model, Solution, SolverStatus};
    use crate::route::Algorithm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Test helpers ──────────────────────────────────────────────────────────

    /// Branch-and-bound solver that counts its invocations.
    #[derive(Default)]
    struct CountingSolver {
        inner: BranchAndBoundSolver,
        calls: AtomicUsize,
    }

    impl CountingSolver {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MilpSolver for CountingSolver {
        fn solve(&self, model: &Model) -> Solution {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.solve(model)
        }
    }

    fn config(total_slots: usize) -> SchedulerConfig {
        SchedulerConfig {
            total_slots,
            ..Default::default()
        }
    }

    fn build(topology: Topology, cfg: SchedulerConfig) -> (IncrementalScheduler, Arc<CountingSolver>) {
        let solver = Arc::new(CountingSolver::default());
        let mut sched = IncrementalScheduler::from_topology(topology, cfg, solver.clone()).unwrap();
        sched.configure();
        (sched, solver)
    }

    fn flow(src: &str, dsts: &[&str], period: u32) -> Flow {
        Flow::new(src, dsts.iter().copied(), period).unwrap()
    }

    /// ```text
    ///   h0 ─┐
    ///       s0 ═ s1 ─ h2
    ///   h1 ─┘
    /// ```
    fn shared_switch() -> Topology {
        let mut t = Topology::new();
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("h1", "s0");
        t.add_bidirectional("s0", "s1");
        t.add_bidirectional("h2", "s1");
        t
    }

    /// ```text
    ///   h0 ─ s0 ═ s1 ─┬ h1
    ///                 └ h2
    /// ```
    fn two_switches() -> Topology {
        let mut t = Topology::new();
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("s0", "s1");
        t.add_bidirectional("s1", "h1");
        t.add_bidirectional("s1", "h2");
        t
    }

    /// Two disconnected islands: `h0 ─ s0 ═ s1 ─ h1` and `h2 ─ s2 ═ s3 ─ h3`.
    fn two_islands() -> Topology {
        let mut t = Topology::new();
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("s0", "s1");
        t.add_bidirectional("s1", "h1");
        t.add_bidirectional("h2", "s2");
        t.add_bidirectional("s2", "s3");
        t.add_bidirectional("s3", "h3");
        t
    }

    /// ```text
    ///   h0 ─ s0 ═ s1 ─ h1
    ///         ║    ║
    ///         s2 ═ s3 ─ h3
    ///              ║
    ///              s4
    /// ```
    fn square_with_spur() -> Topology {
        let mut t = Topology::new();
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("h1", "s1");
        t.add_bidirectional("h3", "s3");
        t.add_bidirectional("s0", "s1");
        t.add_bidirectional("s0", "s2");
        t.add_bidirectional("s1", "s3");
        t.add_bidirectional("s2", "s3");
        t.add_bidirectional("s3", "s4");
        t
    }

    // ── Edge flows ────────────────────────────────────────────────────────────

    #[test]
    fn edge_flow_scheduled_without_optimizer() {
        let (mut sched, solver) = build(shared_switch(), config(2));
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap().clone();

        assert_eq!(rec.class, FlowClass::Edge);
        assert_eq!(
            rec.result,
            RouteResult::Scheduled {
                links: vec![Link::new("h0", "s0"), Link::new("s0", "h1")],
                slot: Slot::new(0, 0),
            }
        );
        assert_eq!(rec.attempts, 1);
        assert!(rec.timings.is_none());
        assert_eq!(solver.calls(), 0);
        assert_eq!(sched.link_state().entry(0, &Link::new("h0", "s0")).unwrap().period, 1);
    }

    #[test]
    fn edge_flow_without_free_slot_is_not_attempted() {
        let (mut sched, _) = build(shared_switch(), config(1));
        let f = flow("h0", &["h1"], 1);
        assert!(sched.schedule_flow(&f).unwrap().is_scheduled());

        let rec = sched.schedule_flow(&f).unwrap();
        assert_eq!(rec.result, RouteResult::NotAttempted);
        assert_eq!(rec.attempts, 0);
        assert_eq!(sched.flow_database().len(), 2);
    }

    // ── Core flows ────────────────────────────────────────────────────────────

    #[test]
    fn core_flow_uses_the_core_link() {
        let (mut sched, solver) = build(two_switches(), config(2));
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 2)).unwrap();

        assert_eq!(rec.class, FlowClass::Core);
        assert_eq!(rec.result.slot(), Some(Slot::new(0, 0)));
        assert_eq!(
            rec.result.links(),
            &[Link::new("h0", "s0"), Link::new("s0", "s1"), Link::new("s1", "h1")]
        );
        assert_eq!(rec.attempts, 1);
        assert!(rec.timings.is_some());
        assert_eq!(solver.calls(), 1);
    }

    #[test]
    fn same_period_flow_shares_timeslot_on_another_phase() {
        let (mut sched, _) = build(two_switches(), config(2));
        sched.schedule_flow(&flow("h0", &["h1"], 2)).unwrap();
        let rec = sched.schedule_flow(&flow("h0", &["h2"], 2)).unwrap();

        assert_eq!(rec.result.slot(), Some(Slot::new(0, 1)));
        let core = sched.link_state().entry(0, &Link::new("s0", "s1")).unwrap();
        assert_eq!(core.period, 2);
        assert_eq!(core.used_phases, BTreeSet::from([0, 1]));
    }

    #[test]
    fn multicast_flow_covers_every_destination() {
        let (mut sched, _) = build(two_switches(), config(1));
        let rec = sched.schedule_flow(&flow("h0", &["h1", "h2"], 1)).unwrap();
        assert_eq!(rec.route_len(), 4);
        assert!(rec.result.links().contains(&Link::new("s1", "h2")));
    }

    #[test]
    fn unknown_host_is_rejected() {
        let (mut sched, _) = build(two_switches(), config(1));
        let err = sched.schedule_flow(&flow("h0", &["h9"], 1)).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownHost { host } if host == "h9"));
        assert!(sched.flow_database().is_empty());
    }

    // ── Slicing ───────────────────────────────────────────────────────────────

    /// t0 ranks first but its only core path is taken by period 2; t1 is
    /// feasible.
    fn slicing_fixture(
        slice_size: usize,
        max_attempts: u32,
    ) -> (IncrementalScheduler, Arc<CountingSolver>) {
        let cfg = SchedulerConfig {
            total_slots: 2,
            slice_size,
            max_attempts,
            ..Default::default()
        };
        let (mut sched, solver) = build(two_islands(), cfg);
        sched
            .planner
            .state
            .commit(2, &[Link::new("s0", "s1")], Slot::new(0, 0))
            .unwrap();
        sched
            .planner
            .state
            .commit(2, &[Link::new("s2", "s3"), Link::new("s3", "s2")], Slot::new(1, 0))
            .unwrap();
        (sched, solver)
    }

    #[test]
    fn ranking_prefers_the_blocked_timeslot() {
        let (sched, _) = slicing_fixture(1, 1);
        let f = flow("h0", &["h1"], 1);
        let mandatory = vec![Link::new("h0", "s0"), Link::new("s1", "h1")];
        let ranked = rank_slots(sched.link_state(), &f, &mandatory, true);
        assert_eq!(ranked[0], RankedSlot { slot: Slot::new(0, 0), score: 5 });
        assert_eq!(ranked[1], RankedSlot { slot: Slot::new(1, 0), score: 4 });
    }

    #[test]
    fn single_attempt_misses_second_batch() {
        let (mut sched, solver) = slicing_fixture(1, 1);
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap();
        assert!(!rec.is_scheduled());
        assert_eq!(rec.result.status(), Some(SolverStatus::Infeasible));
        assert_eq!(rec.attempts, 1);
        assert_eq!(solver.calls(), 1);
    }

    #[test]
    fn second_attempt_finds_second_batch() {
        let (mut sched, solver) = slicing_fixture(1, 2);
        let gen_before = sched.link_state().generation();
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap();
        assert_eq!(rec.result.slot(), Some(Slot::new(1, 0)));
        assert_eq!(rec.attempts, 2);
        assert_eq!(solver.calls(), 2);
        assert_eq!(sched.link_state().generation(), gen_before + 1);
    }

    #[test]
    fn wide_slice_covers_both_timeslots_in_one_attempt() {
        let (mut sched, solver) = slicing_fixture(2, 1);
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap();
        assert_eq!(rec.result.slot(), Some(Slot::new(1, 0)));
        assert_eq!(rec.attempts, 1);
        assert_eq!(solver.calls(), 1);
    }

    #[test]
    fn slice_wider_than_ranking_is_one_attempt() {
        let (mut sched, solver) = slicing_fixture(5, 3);
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap();
        assert!(rec.is_scheduled());
        assert_eq!(rec.attempts, 1);
        assert_eq!(solver.calls(), 1);
    }

    #[test]
    fn unsliced_mode_makes_exactly_one_attempt() {
        let cfg = SchedulerConfig {
            total_slots: 2,
            slice_size: 0,
            max_attempts: 5,
            ..Default::default()
        };
        let (mut sched, solver) = build(two_islands(), cfg);
        sched
            .planner
            .state
            .commit(2, &[Link::new("s0", "s1")], Slot::new(0, 0))
            .unwrap();
        let rec = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap();
        assert_eq!(rec.result.slot(), Some(Slot::new(1, 0)));
        assert_eq!(rec.attempts, 1);
        assert_eq!(solver.calls(), 1);
    }

    // ── Trimming ──────────────────────────────────────────────────────────────

    #[test]
    fn trimmed_and_untrimmed_routes_have_equal_length() {
        let run = |trim: bool| {
            let cfg = SchedulerConfig {
                total_slots: 1,
                topology_trimming: trim,
                ..Default::default()
            };
            let (mut sched, _) = build(square_with_spur(), cfg);
            // block the direct core link so the route has to detour
            sched
                .planner
                .state
                .commit(5, &[Link::new("s0", "s1")], Slot::new(0, 0))
                .unwrap();
            sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap().clone()
        };

        let trimmed = run(true);
        let untrimmed = run(false);
        assert!(trimmed.is_scheduled() && untrimmed.is_scheduled());
        assert_eq!(trimmed.route_len(), 5);
        assert_eq!(trimmed.route_len(), untrimmed.route_len());
    }

    /// One-way core ring `s0 → s1 → s2 → s0`; `s1` has no host.
    fn one_way_ring() -> Topology {
        let mut t = Topology::new();
        t.add_link(Link::new("s0", "s1"));
        t.add_link(Link::new("s1", "s2"));
        t.add_link(Link::new("s2", "s0"));
        t.add_bidirectional("h0", "s0");
        t.add_bidirectional("h2", "s2");
        t
    }

    #[test]
    fn one_way_ring_is_routed_with_and_without_trimming() {
        for trim in [true, false] {
            let cfg = SchedulerConfig {
                total_slots: 1,
                topology_trimming: trim,
                ..Default::default()
            };
            let (mut sched, _) = build(one_way_ring(), cfg);
            let rec = sched.schedule_flow(&flow("h0", &["h2"], 1)).unwrap();
            assert!(rec.is_scheduled(), "trimming {trim}: {rec:?}");
            assert_eq!(rec.route_len(), 4);
            assert!(rec.result.links().contains(&Link::new("s1", "s2")));
        }
    }

    #[test]
    fn trimming_keeps_scheduler_topology_intact() {
        let (mut sched, _) = build(square_with_spur(), config(1));
        let before = sched.topology().topology().clone();
        sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap();
        assert_eq!(sched.topology().topology(), &before);
    }

    #[test]
    fn minimax_schedules_core_flow() {
        let cfg = SchedulerConfig {
            algorithm: Algorithm::MiniMax,
            total_slots: 2,
            ..Default::default()
        };
        let (mut sched, _) = build(square_with_spur(), cfg);
        let rec = sched.schedule_flow(&flow("h0", &["h3"], 1)).unwrap();
        assert!(rec.is_scheduled());
        assert_eq!(rec.route_len(), 4);
    }

    // ── Optimal evaluation ────────────────────────────────────────────────────

    #[test]
    fn optimal_evaluation_never_mutates_state() {
        let (mut sched, _) = build(two_switches(), config(2));
        let gen_before = sched.link_state().generation();
        let rec = sched.schedule_flow_optimally(&flow("h0", &["h1"], 2)).unwrap();
        assert!(rec.is_scheduled());
        assert_eq!(rec.attempts, 1);
        assert_eq!(sched.optimal_flow_database().len(), 1);
        assert!(sched.flow_database().is_empty());
        assert_eq!(sched.link_state().generation(), gen_before);
        assert!(sched.link_state().is_free(0, &Link::new("s0", "s1")));
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    #[test]
    fn scheduling_before_configure_is_rejected() {
        let solver = Arc::new(CountingSolver::default());
        let mut sched = IncrementalScheduler::from_topology(two_switches(), config(2), solver).unwrap();
        let err = sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap_err();
        assert!(matches!(err, SchedulerError::NotConfigured { configured: 0, requested: 2 }));
    }

    #[test]
    fn changed_slot_count_requires_reconfigure() {
        let (mut sched, _) = build(two_switches(), config(2));
        sched.set_config(config(3)).unwrap();
        assert!(matches!(
            sched.schedule_flow(&flow("h0", &["h1"], 1)),
            Err(SchedulerError::NotConfigured { configured: 2, requested: 3 })
        ));
        sched.configure();
        assert!(sched.schedule_flow(&flow("h0", &["h1"], 1)).unwrap().is_scheduled());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (mut sched, _) = build(two_switches(), config(2));
        assert!(matches!(
            sched.set_config(config(0)),
            Err(SchedulerError::InvalidConfig(_))
        ));
        assert_eq!(sched.config().total_slots, 2);
    }

    // ── Plan / admit ──────────────────────────────────────────────────────────

    #[test]
    fn stale_plan_is_replanned() {
        let (mut sched, _) = build(two_switches(), config(2));
        let p1 = sched.plan_flow(&flow("h0", &["h1"], 2)).unwrap();
        let p2 = sched.plan_flow(&flow("h0", &["h2"], 2)).unwrap();
        assert_eq!(p1.record().result.slot(), Some(Slot::new(0, 0)));
        assert_eq!(p2.record().result.slot(), Some(Slot::new(0, 0)));

        sched.admit(p1).unwrap();
        let rec = sched.admit(p2).unwrap();
        assert_eq!(rec.result.slot(), Some(Slot::new(0, 1)));
    }

    #[test]
    fn state_violation_aborts_without_record() {
        let (mut sched, _) = build(two_switches(), config(1));
        sched
            .planner
            .state
            .commit(3, &[Link::new("h0", "s0")], Slot::new(0, 0))
            .unwrap();
        let f = flow("h0", &["h1"], 1);
        let bogus = FlowPlan {
            record: ScheduleRecord {
                flow: f.clone(),
                result: RouteResult::Scheduled {
                    links: vec![Link::new("h0", "s0"), Link::new("s0", "s1"), Link::new("s1", "h1")],
                    slot: Slot::new(0, 0),
                },
                timings: None,
                class: FlowClass::Core,
                attempts: 1,
                elapsed: Default::default(),
            },
            generation: sched.link_state().generation(),
        };

        let err = sched.admit(bogus).unwrap_err();
        assert!(matches!(err, SchedulerError::StateViolation(_)));
        assert!(sched.flow_database().is_empty());
        assert!(sched.link_state().is_free(0, &Link::new("s0", "s1")));
    }

    // ── Properties ────────────────────────────────────────────────────────────

    fn workload() -> Vec<Flow> {
        vec![
            flow("h0", &["h1"], 2),
            flow("h0", &["h3"], 1),
            flow("h1", &["h0", "h3"], 2),
            flow("h3", &["h1"], 4),
            flow("h0", &["h1"], 2),
            flow("h1", &["h3"], 1),
        ]
    }

    #[test]
    fn replay_is_deterministic() {
        let run = || {
            let (mut sched, _) = build(square_with_spur(), config(2));
            for f in workload() {
                sched.schedule_flow(&f).unwrap();
            }
            sched.flow_database().records().to_vec()
        };
        let a = run();
        let b = run();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!(x.same_outcome(y), "{x:?} != {y:?}");
        }
    }

    #[test]
    fn committed_flows_never_collide() {
        let (mut sched, _) = build(square_with_spur(), config(2));
        for f in workload() {
            sched.schedule_flow(&f).unwrap();
        }
        let scheduled: Vec<_> = sched
            .flow_database()
            .iter()
            .filter_map(|r| r.result.slot().map(|s| (r, s)))
            .collect();
        for (i, (a, sa)) in scheduled.iter().enumerate() {
            for (b, sb) in &scheduled[i + 1..] {
                if sa.timeslot != sb.timeslot {
                    continue;
                }
                for l in a.result.links() {
                    if b.result.links().contains(l) {
                        assert_eq!(a.flow.period(), b.flow.period(), "period clash on {l}");
                        assert_ne!(sa.phase, sb.phase, "phase clash on {l}");
                    }
                }
            }
        }
    }
}
