/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for the incremental scheduler.
//!
//! An ordinary scheduling failure (no free slot, infeasible solve, exhausted
//! attempt budget) is **not** an error: it is recorded as an unscheduled
//! [`ScheduleRecord`](super::ScheduleRecord).  [`SchedulerError`] is reserved
//! for rejected input and for link-state corruption.
//!
//! Every variant carries enough structured data to emit a fully-qualified
//! `tracing` event without further lookups.

use thiserror::Error;

use crate::config::ConfigError;
use crate::flow::NodeId;
use crate::state::StateViolation;
use crate::topology::TopologyError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A flow endpoint is not a host of the classified topology.
    #[error("host '{host}' is not attached to any switch in the topology")]
    UnknownHost { host: NodeId },

    /// The link-state store does not match the configured slot count.
    /// Call `configure()` after changing `total_slots`.
    #[error("link state has {configured} timeslot(s) but the configuration asks for {requested} — call configure() first")]
    NotConfigured { configured: usize, requested: usize },

    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    /// A route reached commit that the availability check should have
    /// excluded.  Fatal for the flow; the store is unchanged.
    #[error("link state violation: {0}")]
    StateViolation(#[from] StateViolation),

    /// A background planning task panicked or was cancelled.
    #[error("planning task failed: {0}")]
    PlanningTask(#[from] tokio::task::JoinError),
}
