// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! arguelauncher: run case-based reasoning experiments on argument graphs
//!
//! This crate loads a case base and benchmark requests, sends them to the
//! retrieval and adaptation services, and evaluates the answers against
//! the user benchmarks stored in each request.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
