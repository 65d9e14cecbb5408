/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-(timeslot, link) occupancy table.
//!
//! [`LinkStateStore`] is the single owner of mutable scheduling state.  Each
//! entry records the period currently assigned to a link in one timeslot
//! (`0` = free) and the set of phases already taken by flows of that period.
//!
//! # Invariants
//! * `period == 0` ⇒ `used_phases` is empty.
//! * At most one non-zero period per `(timeslot, link)`; once assigned it only
//!   changes through [`configure`](LinkStateStore::configure).
//! * Flows sharing a period coexist on one `(timeslot, link)` only on
//!   disjoint phases.
//!
//! All mutation goes through [`commit`](LinkStateStore::commit), which checks
//! every link of a route before touching any entry.

pub mod error;

pub use error::StateViolation;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::flow::{Link, Slot};

// ── LinkStateEntry ────────────────────────────────────────────────────────────

/// Occupancy of one link during one timeslot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStateEntry {
    /// Period assigned to this `(timeslot, link)`; `0` means unassigned.
    pub period: u32,
    /// Phases already used by flows of `period`.
    pub used_phases: BTreeSet<u32>,
}

impl LinkStateEntry {
    /// `true` when no flow has been committed here.
    pub fn is_free(&self) -> bool {
        self.period == 0
    }

    /// A flow of `period` can transmit here on `phase`.
    pub fn admits(&self, period: u32, phase: u32) -> bool {
        self.period == 0 || (self.period == period && !self.used_phases.contains(&phase))
    }
}

// ── LinkStateSnapshot ─────────────────────────────────────────────────────────

/// Busy indicators for a set of candidate slots, as seen by the optimizer.
///
/// `busy(slot, link) == true` means the flow may not use `link` in `slot`.
/// Links that were not part of the snapshot are reported busy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStateSnapshot {
    slots: BTreeMap<Slot, BTreeMap<Link, bool>>,
}

impl LinkStateSnapshot {
    pub fn candidates(&self) -> impl Iterator<Item = &Slot> {
        self.slots.keys()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn busy(&self, slot: &Slot, link: &Link) -> bool {
        self.slots
            .get(slot)
            .and_then(|m| m.get(link))
            .copied()
            .unwrap_or(true)
    }

    /// Number of candidate slots in which `link` is busy.
    pub fn busy_count(&self, link: &Link) -> usize {
        self.slots.keys().filter(|s| self.busy(s, link)).count()
    }

    /// Insert (or overwrite) one indicator.  Used by tests and by callers
    /// building synthetic snapshots.
    pub fn set(&mut self, slot: Slot, link: Link, busy: bool) {
        self.slots.entry(slot).or_default().insert(link, busy);
    }
}

// ── LinkStateStore ────────────────────────────────────────────────────────────

/// The network link-state table: `timeslot → link → LinkStateEntry`.
///
/// Cloning is how an immutable snapshot of the whole store is taken for
/// off-critical-path planning.
#[derive(Debug, Clone, Default)]
pub struct LinkStateStore {
    /// One map per timeslot, indexed by timeslot number.
    table: Vec<BTreeMap<Link, LinkStateEntry>>,
    core_links: BTreeSet<Link>,
    edge_links: BTreeSet<Link>,
    /// Bumped by every `configure` and every successful `commit`.
    generation: u64,
}

impl LinkStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)initialise the table for `timeslots` slots over the given links.
    /// Every entry starts free.
    pub fn configure(
        &mut self,
        timeslots: usize,
        core_links: &BTreeSet<Link>,
        edge_links: &BTreeSet<Link>,
    ) {
        let blank: BTreeMap<Link, LinkStateEntry> = core_links
            .iter()
            .chain(edge_links.iter())
            .map(|l| (l.clone(), LinkStateEntry::default()))
            .collect();

        self.table = vec![blank; timeslots];
        self.core_links = core_links.clone();
        self.edge_links = edge_links.clone();
        self.generation += 1;

        info!(
            timeslots,
            core_links = core_links.len(),
            edge_links = edge_links.len(),
            generation = self.generation,
            "link state configured"
        );
    }

    pub fn is_configured(&self) -> bool {
        !self.table.is_empty()
    }

    pub fn total_slots(&self) -> usize {
        self.table.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn core_links(&self) -> &BTreeSet<Link> {
        &self.core_links
    }

    pub fn edge_links(&self) -> &BTreeSet<Link> {
        &self.edge_links
    }

    pub fn entry(&self, timeslot: usize, link: &Link) -> Option<&LinkStateEntry> {
        self.table.get(timeslot).and_then(|m| m.get(link))
    }

    pub fn is_free(&self, timeslot: usize, link: &Link) -> bool {
        self.entry(timeslot, link).is_some_and(LinkStateEntry::is_free)
    }

    /// Link could carry a flow of `period` at `slot`.  Unknown links and
    /// out-of-range timeslots are never available.
    pub fn is_available(&self, slot: Slot, period: u32, link: &Link) -> bool {
        self.entry(slot.timeslot, link)
            .is_some_and(|e| e.admits(period, slot.phase))
    }

    /// Build the busy matrix for `candidates × links` for a flow of `period`.
    pub fn snapshot<'a, I, L>(&self, candidates: I, period: u32, links: L) -> LinkStateSnapshot
    where
        I: IntoIterator<Item = Slot>,
        L: IntoIterator<Item = &'a Link> + Clone,
    {
        let mut snap = LinkStateSnapshot::default();
        for slot in candidates {
            let row: BTreeMap<Link, bool> = links
                .clone()
                .into_iter()
                .map(|l| (l.clone(), !self.is_available(slot, period, l)))
                .collect();
            snap.slots.insert(slot, row);
        }
        snap
    }

    /// Record a flow of `period` on every link of `links` at `slot`.
    ///
    /// The whole route is validated first; on any violation the store is left
    /// unchanged.
    ///
    /// # Errors
    /// A [`StateViolation`] means the availability check that produced this
    /// route was wrong.  It must not be retried.
    pub fn commit(&mut self, period: u32, links: &[Link], slot: Slot) -> Result<(), StateViolation> {
        if period == 0 || slot.phase >= period {
            return Err(StateViolation::PhaseOutOfRange {
                phase: slot.phase,
                period,
            });
        }

        let row = self
            .table
            .get(slot.timeslot)
            .ok_or(StateViolation::TimeslotOutOfRange {
                timeslot: slot.timeslot,
                total: self.table.len(),
            })?;

        let mut seen: BTreeSet<&Link> = BTreeSet::new();
        for link in links {
            let entry = row.get(link).ok_or_else(|| StateViolation::UnknownLink {
                link: link.clone(),
            })?;
            if entry.period != 0 && entry.period != period {
                return Err(StateViolation::PeriodMismatch {
                    timeslot: slot.timeslot,
                    link: link.clone(),
                    assigned: entry.period,
                    requested: period,
                });
            }
            // a link listed twice would take its own phase a second time
            if entry.used_phases.contains(&slot.phase) || !seen.insert(link) {
                return Err(StateViolation::PhaseInUse {
                    timeslot: slot.timeslot,
                    link: link.clone(),
                    phase: slot.phase,
                });
            }
        }

        let row = &mut self.table[slot.timeslot];
        for link in links {
            if let Some(entry) = row.get_mut(link) {
                entry.period = period;
                entry.used_phases.insert(slot.phase);
            }
        }
        self.generation += 1;

        debug!(
            timeslot = slot.timeslot,
            phase = slot.phase,
            period,
            links = links.len(),
            generation = self.generation,
            "route committed"
        );
        Ok(())
    }

    /// Number of core links with no flow assigned at `timeslot`.
    pub fn free_core_links(&self, timeslot: usize) -> usize {
        self.core_links
            .iter()
            .filter(|l| self.is_free(timeslot, l))
            .count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
