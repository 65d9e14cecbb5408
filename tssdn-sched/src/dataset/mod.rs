/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Dataset directory loader.
//!
//! A dataset is a directory with two files:
//! ```text
//! links.dat   one directed link per line:  (s0 s1)
//! flows.dat   one flow per line:           (h0 h3 h5 4)   source, destinations…, period
//! ```
//! Blank lines are ignored.  Any other malformed line rejects the whole file.

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::flow::{Flow, FlowError, Link};
use crate::topology::Topology;

pub const LINKS_FILE: &str = "links.dat";
pub const FLOWS_FILE: &str = "flows.dat";

// ── DatasetError ──────────────────────────────────────────────────────────────

/// A rejected dataset line.  Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("line {line}: expected a parenthesised record, found '{text}'")]
    Malformed { line: usize, text: String },

    #[error("line {line}: a link needs exactly 2 nodes, found {found}")]
    LinkArity { line: usize, found: usize },

    #[error("line {line}: a flow needs a source, at least one destination and a period, found {found} field(s)")]
    FlowArity { line: usize, found: usize },

    #[error("line {line}: period '{value}' is not a non-negative integer")]
    BadPeriod { line: usize, value: String },

    #[error("line {line}: {source}")]
    InvalidFlow {
        line: usize,
        #[source]
        source: FlowError,
    },
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Non-blank lines of `content` split into the fields between the
/// parentheses, with their line number.
fn records(content: &str) -> impl Iterator<Item = Result<(usize, Vec<&str>), DatasetError>> {
    content
        .lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw.trim()))
        .filter(|(_, text)| !text.is_empty())
        .map(|(line, text)| {
            text.strip_prefix('(')
                .and_then(|t| t.strip_suffix(')'))
                .map(|inner| (line, inner.split_whitespace().collect()))
                .ok_or_else(|| DatasetError::Malformed {
                    line,
                    text: text.to_string(),
                })
        })
}

/// Parse the contents of a `links.dat` file.
pub fn parse_links(content: &str) -> Result<Topology, DatasetError> {
    let mut topology = Topology::new();
    for record in records(content) {
        let (line, fields) = record?;
        match fields.as_slice() {
            [from, to] => topology.add_link(Link::new(*from, *to)),
            _ => {
                return Err(DatasetError::LinkArity {
                    line,
                    found: fields.len(),
                })
            }
        }
    }
    Ok(topology)
}

/// Parse the contents of a `flows.dat` file, keeping file order.
pub fn parse_flows(content: &str) -> Result<Vec<Flow>, DatasetError> {
    let mut flows = Vec::new();
    for record in records(content) {
        let (line, fields) = record?;
        let [source, destinations @ .., period] = fields.as_slice() else {
            return Err(DatasetError::FlowArity { line, found: fields.len() });
        };
        if destinations.is_empty() {
            return Err(DatasetError::FlowArity { line, found: fields.len() });
        }
        let period: u32 = period.parse().map_err(|_| DatasetError::BadPeriod {
            line,
            value: period.to_string(),
        })?;
        let flow = Flow::new(*source, destinations.iter().copied(), period)
            .map_err(|source| DatasetError::InvalidFlow { line, source })?;
        flows.push(flow);
    }
    Ok(flows)
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// A topology plus the arrival-ordered flows to schedule on it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub topology: Topology,
    pub flows: Vec<Flow>,
}

impl Dataset {
    /// Load `links.dat` and `flows.dat` from `dir`.
    ///
    /// # Errors
    /// Returns an error if either file cannot be read or contains a
    /// malformed line.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        info!("Loading dataset from: {}", dir.display());

        let links_path = dir.join(LINKS_FILE);
        let content = std::fs::read_to_string(&links_path)
            .with_context(|| format!("Cannot open links file: {}", links_path.display()))?;
        let topology = parse_links(&content)
            .with_context(|| format!("Failed to parse links file: {}", links_path.display()))?;

        let flows_path = dir.join(FLOWS_FILE);
        let content = std::fs::read_to_string(&flows_path)
            .with_context(|| format!("Cannot open flows file: {}", flows_path.display()))?;
        let flows = parse_flows(&content)
            .with_context(|| format!("Failed to parse flows file: {}", flows_path.display()))?;

        info!(
            nodes = topology.node_count(),
            links = topology.link_count(),
            flows = flows.len(),
            "Dataset loaded"
        );
        Ok(Self { topology, flows })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
