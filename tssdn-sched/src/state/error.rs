/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Link-state invariant violations.
//!
//! A [`StateViolation`] is never an expected scheduling outcome.  It means a
//! route reached [`LinkStateStore::commit`](super::LinkStateStore::commit)
//! that the preceding availability check should have excluded, so the caller
//! aborts the flow instead of retrying.

use thiserror::Error;

use crate::flow::Link;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateViolation {
    /// The link already carries flows of a different period in this timeslot.
    #[error("period change on link {link} in timeslot {timeslot}: assigned {assigned}, requested {requested}")]
    PeriodMismatch {
        timeslot: usize,
        link: Link,
        assigned: u32,
        requested: u32,
    },

    /// The phase is already taken on this link in this timeslot.
    #[error("phase {phase} already assigned to link {link} in timeslot {timeslot}")]
    PhaseInUse { timeslot: usize, link: Link, phase: u32 },

    /// The route names a link the store was not configured with.
    #[error("link {link} is not part of the configured link state")]
    UnknownLink { link: Link },

    #[error("timeslot {timeslot} out of range (store has {total} slots)")]
    TimeslotOutOfRange { timeslot: usize, total: usize },

    #[error("phase {phase} out of range for period {period}")]
    PhaseOutOfRange { phase: u32, period: u32 },
}
