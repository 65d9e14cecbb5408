/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use tssdn_sched::config::SchedulerConfig;
use tssdn_sched::dataset::Dataset;
use tssdn_sched::milp::{BranchAndBoundSolver, MilpSolver};
use tssdn_sched::route::Algorithm;
use tssdn_sched::scheduler::{admission, IncrementalScheduler};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Incremental time-triggered flow scheduler (evaluation driver).
///
/// Example:
///   tssdn-sched datasets/ER-s8-h16 -c sched.yaml -a mm --slice-size 2 --optimal
#[derive(Debug, Parser)]
#[command(
    name = "tssdn-sched",
    about = "Incremental TSSDN flow scheduler – evaluation driver",
    long_about = None,
)]
struct Cli {
    /// Dataset directory containing links.dat and flows.dat.
    dataset: PathBuf,

    /// Path to the YAML scheduler configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Routing formulation: sap (shortest available path) or mm (minimax).
    #[arg(short = 'a', long = "algorithm")]
    algorithm: Option<Algorithm>,

    /// Number of timeslots.
    #[arg(short = 's', long = "slots")]
    slots: Option<usize>,

    /// Disable topology trimming before each optimizer call.
    #[arg(long = "no-trim", default_value_t = false)]
    no_trim: bool,

    /// Candidate slots per optimizer attempt (0 disables slicing).
    #[arg(long = "slice-size")]
    slice_size: Option<usize>,

    /// Maximum optimizer attempts per core flow.
    #[arg(long = "attempts")]
    attempts: Option<u32>,

    /// Also evaluate every flow in optimal mode and report the comparison.
    #[arg(long = "optimal", default_value_t = false)]
    optimal: bool,
}

impl Cli {
    /// Command-line values override the configuration file.
    fn apply_overrides(&self, config: &mut SchedulerConfig) {
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(slots) = self.slots {
            config.total_slots = slots;
        }
        if self.no_trim {
            config.topology_trimming = false;
        }
        if let Some(slice_size) = self.slice_size {
            config.slice_size = slice_size;
        }
        if let Some(attempts) = self.attempts {
            config.max_attempts = attempts;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(
        dataset = %cli.dataset.display(),
        config = ?cli.config,
        optimal = cli.optimal,
        "tssdn-sched starting up..."
    );

    if let Err(e) = run(cli).await {
        error!("Scheduling run failed: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using default scheduler settings");
            SchedulerConfig::default()
        }
    };
    cli.apply_overrides(&mut config);
    config
        .validate()
        .context("Invalid command-line configuration override")?;

    let solver: Arc<dyn MilpSolver> = Arc::new(match config.solver_node_limit {
        Some(limit) => BranchAndBoundSolver::with_node_limit(limit),
        None => BranchAndBoundSolver::new(),
    });

    // ── Dataset + scheduler ───────────────────────────────────────────────────
    let dataset = Dataset::load_dir(&cli.dataset)?;
    let mut scheduler = IncrementalScheduler::from_topology(dataset.topology, config, solver)
        .context("Cannot build scheduler from dataset topology")?;
    scheduler.configure();

    // ── Admission ─────────────────────────────────────────────────────────────
    let scheduler = if cli.optimal {
        // each flow is evaluated optimally against the state the incremental
        // run is about to see
        for flow in &dataset.flows {
            scheduler.schedule_flow_optimally(flow)?;
            scheduler.schedule_flow(flow)?;
        }
        scheduler
    } else {
        let shared = Arc::new(Mutex::new(scheduler));
        admission::admit_all(Arc::clone(&shared), dataset.flows).await?;
        Arc::try_unwrap(shared)
            .map_err(|_| anyhow::anyhow!("scheduler still shared after admission"))?
            .into_inner()
    };

    report(&scheduler, cli.optimal);
    Ok(())
}

// ── Reporting ─────────────────────────────────────────────────────────────────

fn report(scheduler: &IncrementalScheduler, compare_optimal: bool) {
    let db = scheduler.flow_database();
    for (index, r) in db.iter().enumerate() {
        info!(
            index,
            flow = %r.flow,
            class = %r.class,
            scheduled = r.is_scheduled(),
            slot = ?r.result.slot(),
            route_len = r.route_len(),
            status = ?r.result.status(),
            attempts = r.attempts,
            elapsed_us = r.elapsed.as_micros() as u64,
            "record"
        );
    }

    let s = db.summary();
    info!(
        flows = s.flows,
        edge_flows = s.edge_flows,
        core_flows = s.core_flows,
        scheduled_edge = s.scheduled_edge,
        scheduled_core = s.scheduled_core,
        optimizer_failures = s.optimizer_failures,
        mean_elapsed_us = s.mean_elapsed().as_micros() as u64,
        std_elapsed_us = db.elapsed_std_dev().as_micros() as u64,
        max_elapsed_us = s.max_elapsed.as_micros() as u64,
        "Summary"
    );

    if compare_optimal {
        let optimal = scheduler.optimal_flow_database();
        let cmp = db.compare_with_optimal(optimal);
        info!(
            compared = cmp.compared,
            optimal_scheduled = optimal.scheduled_count(),
            suboptimal = cmp.suboptimal,
            false_negatives = cmp.false_negatives,
            better_than_optimal = cmp.better_than_optimal,
            "Optimal comparison"
        );
    }
}
