/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core flow data structures for the TSSDN incremental scheduler.
//!
//! ```text
//! arrival ──(Flow)──►  IncrementalScheduler  ──(ScheduleRecord)──►  FlowDatabase
//!             ↑ input         │ commits Link × Slot                    ↑ output
//!             immutable       ▼                                        append-only
//!                        LinkStateStore
//! ```
//!
//! # Ownership model
//! A [`Flow`] is immutable once constructed.  The scheduler clones it into the
//! [`ScheduleRecord`](crate::scheduler::ScheduleRecord) it appends, so the
//! caller keeps its own copy of the arrival sequence.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Identifier of a switch or host.  Both share one id space.
pub type NodeId = String;

/// A directed link `from → to`.
///
/// `Ord` on the tuple gives every link-keyed collection a stable order, which
/// is what makes scheduling runs reproducible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
}

impl Link {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} → {})", self.from, self.to)
    }
}

// ── Slot ──────────────────────────────────────────────────────────────────────

/// A recurring transmission slot: one timeslot plus a phase offset inside it.
///
/// `phase < period` of the flow that occupies the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Slot {
    pub timeslot: usize,
    pub phase: u32,
}

impl Slot {
    pub fn new(timeslot: usize, phase: u32) -> Self {
        Self { timeslot, phase }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(t={}, ph={})", self.timeslot, self.phase)
    }
}

// ── Flow classification ───────────────────────────────────────────────────────

/// Whether a flow stays behind one switch or crosses the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowClass {
    /// Source and every destination hang off the same switch; the route is
    /// fixed to the mandatory edge links.
    Edge,
    /// At least two switches are involved; the route is chosen by the
    /// optimizer.
    Core,
}

impl FlowClass {
    pub fn is_core(self) -> bool {
        matches!(self, FlowClass::Core)
    }
}

impl fmt::Display for FlowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowClass::Edge => f.write_str("edge"),
            FlowClass::Core => f.write_str("core"),
        }
    }
}

// ── Flow ──────────────────────────────────────────────────────────────────────

/// Reasons a flow is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("flow from '{origin}' has period 0 — periods must be positive")]
    ZeroPeriod { origin: NodeId },

    #[error("flow from '{origin}' has no destinations")]
    NoDestinations { origin: NodeId },

    #[error("flow from '{origin}' lists its own source as a destination")]
    SourceIsDestination { origin: NodeId },
}

/// A periodic multicast flow: one source host, a set of destination hosts and
/// a period expressed in phases per timeslot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    source: NodeId,
    destinations: BTreeSet<NodeId>,
    period: u32,
}

impl Flow {
    /// Build a validated flow.
    ///
    /// # Errors
    /// Fails on a zero period, an empty destination set, or a destination
    /// equal to the source.
    pub fn new<I, S>(source: impl Into<NodeId>, destinations: I, period: u32) -> Result<Self, FlowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let source = source.into();
        let destinations: BTreeSet<NodeId> = destinations.into_iter().map(Into::into).collect();

        if period == 0 {
            return Err(FlowError::ZeroPeriod { origin: source });
        }
        if destinations.is_empty() {
            return Err(FlowError::NoDestinations { origin: source });
        }
        if destinations.contains(&source) {
            return Err(FlowError::SourceIsDestination { origin: source });
        }

        Ok(Self {
            source,
            destinations,
            period,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destinations(&self) -> &BTreeSet<NodeId> {
        &self.destinations
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Source followed by every destination.
    pub fn endpoints(&self) -> impl Iterator<Item = &NodeId> {
        std::iter::once(&self.source).chain(self.destinations.iter())
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {{", self.source)?;
        for (i, d) in self.destinations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(d)?;
        }
        write!(f, "}} /{}", self.period)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
