/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timeslot ranking heuristic.
//!
//! For every timeslot, [`rank_slots`] finds the phases free on **all** of a
//! flow's mandatory edge links and scores the timeslot by how much capacity
//! it still offers.  The ranking only orders the optimizer's search; a
//! high-scoring slot may still turn out infeasible.

use tracing::trace;

use crate::flow::{Flow, Link, Slot};
use crate::state::LinkStateStore;

/// A candidate slot with its heuristic score (higher is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedSlot {
    pub slot: Slot,
    pub score: usize,
}

/// Rank every timeslot of `store` for `flow`.
///
/// Score of a timeslot:
/// * `|mandatory|` if at least one phase is free on every mandatory link,
///   otherwise the timeslot is dropped;
/// * plus, when `include_core`, the number of core links with no flow at
///   all in that timeslot;
/// * plus, when `include_core` and some core link already carries the
///   flow's period, the number of such links on which the chosen phase is
///   still unused.
///
/// The chosen phase is the smallest phase free on the mandatory links,
/// unless the core-link rule applies: then it is the free phase with the
/// most matching core links (smallest on ties).
///
/// Entries are sorted by descending score; equal scores keep timeslot order.
pub fn rank_slots(
    store: &LinkStateStore,
    flow: &Flow,
    mandatory: &[Link],
    include_core: bool,
) -> Vec<RankedSlot> {
    let mut ranked: Vec<RankedSlot> = (0..store.total_slots())
        .filter_map(|t| analyse_timeslot(store, flow.period(), mandatory, include_core, t))
        .collect();

    // stable: ties stay in ascending timeslot order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

fn analyse_timeslot(
    store: &LinkStateStore,
    period: u32,
    mandatory: &[Link],
    include_core: bool,
    timeslot: usize,
) -> Option<RankedSlot> {
    if mandatory.is_empty() {
        return None;
    }

    let free_phases: Vec<u32> = (0..period)
        .filter(|&ph| {
            mandatory
                .iter()
                .all(|l| store.is_available(Slot::new(timeslot, ph), period, l))
        })
        .collect();
    let &first = free_phases.first()?;

    let mut phase = first;
    let mut score = mandatory.len();

    if include_core {
        score += store.free_core_links(timeslot);

        let same_period: Vec<&Link> = store
            .core_links()
            .iter()
            .filter(|l| store.entry(timeslot, l).is_some_and(|e| e.period == period))
            .collect();

        if !same_period.is_empty() {
            // max_by_key keeps the last maximum; iterate in reverse so the
            // smallest phase wins ties
            let best = free_phases
                .iter()
                .rev()
                .map(|&ph| {
                    let matching = same_period
                        .iter()
                        .filter(|l| store.is_available(Slot::new(timeslot, ph), period, l))
                        .count();
                    (ph, matching)
                })
                .max_by_key(|&(_, matching)| matching);
            if let Some((ph, matching)) = best {
                phase = ph;
                score += matching;
            }
        }
    }

    trace!(timeslot, phase, score, "timeslot analysed");
    Some(RankedSlot {
        slot: Slot::new(timeslot, phase),
        score,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
