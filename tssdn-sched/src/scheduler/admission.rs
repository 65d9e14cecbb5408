/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Batch admission with parallel planning and serialized commits.
//!
//! Flows are planned in waves.  Each wave plans up to `width` pending flows
//! on the blocking pool against one clone of the scheduler's planner, then
//! admits the plans strictly in arrival order under the scheduler lock.  A
//! commit moves the link-state generation on and makes the rest of the
//! wave stale; those flows go back to the front of the queue and are planned
//! again, in parallel, by the next wave.  Plans that do not commit (for
//! example flows with no feasible route) leave the generation unchanged, so
//! a whole wave of them is admitted at once.
//!
//! Records match a sequential run exactly.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{FlowPlan, IncrementalScheduler, ScheduleRecord, SchedulerError};
use crate::flow::Flow;

/// Admit `flows` in order and return their records.  Waves are as wide as
/// the machine's available parallelism.
///
/// # Errors
/// The first planning or admission error aborts the batch.  Flows admitted
/// before it stay committed.
pub async fn admit_all(
    scheduler: Arc<Mutex<IncrementalScheduler>>,
    flows: Vec<Flow>,
) -> Result<Vec<ScheduleRecord>, SchedulerError> {
    let width = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    admit_in_waves(scheduler, flows, width).await
}

async fn admit_in_waves(
    scheduler: Arc<Mutex<IncrementalScheduler>>,
    flows: Vec<Flow>,
    width: usize,
) -> Result<Vec<ScheduleRecord>, SchedulerError> {
    let width = width.max(1);
    let mut pending: VecDeque<Flow> = flows.into();
    let mut records = Vec::with_capacity(pending.len());
    let mut waves = 0usize;

    while !pending.is_empty() {
        waves += 1;
        let planner = {
            let guard = scheduler.lock().await;
            Arc::new(guard.planner().clone())
        };
        let generation = planner.link_state().generation();
        let wave: Vec<Flow> = pending.drain(..width.min(pending.len())).collect();
        debug!(wave = waves, flows = wave.len(), generation, "planning wave");

        let handles: Vec<JoinHandle<Result<FlowPlan, SchedulerError>>> = wave
            .iter()
            .cloned()
            .map(|flow| {
                let planner = Arc::clone(&planner);
                tokio::task::spawn_blocking(move || planner.plan(&flow))
            })
            .collect();

        let mut admitted = 0usize;
        for handle in handles {
            let plan = handle.await??;
            let mut guard = scheduler.lock().await;
            // the first plan always goes through; admit re-plans it if the
            // store was changed from outside since the snapshot
            if admitted > 0 && guard.link_state().generation() != generation {
                break;
            }
            records.push(guard.admit(plan)?.clone());
            admitted += 1;
        }

        let stale = wave.len() - admitted;
        if stale > 0 {
            debug!(wave = waves, stale, "re-queueing flows planned before the last commit");
        }
        for flow in wave.into_iter().skip(admitted).rev() {
            pending.push_front(flow);
        }
    }

    info!(
        flows = records.len(),
        scheduled = records.iter().filter(|r| r.is_scheduled()).count(),
        waves,
        "batch admitted"
    );
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
