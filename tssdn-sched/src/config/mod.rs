/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler configuration loading and validation.
//!
//! The expected YAML structure (every key optional):
//! ```yaml
//! algorithm: shortest_available_path   # or: minimax
//! total_slots: 10
//! topology_trimming: true
//! slice_size: 1                        # 0 disables timeslot slicing
//! max_attempts: 1
//! solver_node_limit: 200000            # omit for an unbounded search
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::route::Algorithm;

// ── Defaults ──────────────────────────────────────────────────────────────────

const DEFAULT_TOTAL_SLOTS: usize = 10;
const DEFAULT_SLICE_SIZE: usize = 1;
const DEFAULT_MAX_ATTEMPTS: u32 = 1;

// ── ConfigError ───────────────────────────────────────────────────────────────

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("total_slots must be > 0")]
    ZeroTotalSlots,

    #[error("max_attempts must be >= 1")]
    ZeroMaxAttempts,

    #[error("solver_node_limit must be > 0 when set")]
    ZeroNodeLimit,
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// Tunables of the incremental scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub algorithm: Algorithm,
    pub total_slots: usize,
    pub topology_trimming: bool,
    /// Candidate slots per optimizer attempt; `0` disables slicing and runs a
    /// single attempt over every timeslot and phase.
    pub slice_size: usize,
    pub max_attempts: u32,
    /// Search-node budget for the bundled branch-and-bound solver.
    pub solver_node_limit: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::ShortestAvailablePath,
            total_slots: DEFAULT_TOTAL_SLOTS,
            topology_trimming: true,
            slice_size: DEFAULT_SLICE_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            solver_node_limit: None,
        }
    }
}

impl SchedulerConfig {
    pub fn slicing_enabled(&self) -> bool {
        self.slice_size > 0
    }

    /// # Errors
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_slots == 0 {
            return Err(ConfigError::ZeroTotalSlots);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if self.solver_node_limit == Some(0) {
            return Err(ConfigError::ZeroNodeLimit);
        }
        Ok(())
    }

    /// Parse and validate the YAML file at `path`.
    ///
    /// An empty file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, has
    /// unknown keys, or fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scheduler configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config = if content.trim().is_empty() {
            warn!("Configuration file is empty, using defaults");
            Self::default()
        } else {
            serde_yaml::from_str::<Self>(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        info!(
            algorithm = %config.algorithm,
            total_slots = config.total_slots,
            topology_trimming = config.topology_trimming,
            slice_size = config.slice_size,
            max_attempts = config.max_attempts,
            solver_node_limit = ?config.solver_node_limit,
            "Scheduler configuration loaded"
        );
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
