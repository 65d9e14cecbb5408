/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! tssdn-sched – incremental time-triggered flow scheduler
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── flow            – flows, links, slots
//! ├── topology/       – switch/host classification and trimming
//! ├── state/          – per-(timeslot, link) occupancy table
//! ├── milp/           – constraint model, solver trait, branch-and-bound backend
//! ├── route/          – shortest-available-path and min-max route formulations
//! ├── scheduler/      – slot ranking, per-flow admission, batch pipeline
//! ├── config/         – YAML scheduler configuration
//! └── dataset/        – links.dat / flows.dat loader
//! ```

pub mod config;
pub mod dataset;
pub mod flow;
pub mod milp;
pub mod route;
pub mod scheduler;
pub mod state;
pub mod topology;
