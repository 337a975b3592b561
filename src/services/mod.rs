// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - loading, service clients, evaluation and export.

pub mod adaptation;
pub mod connect;
pub mod evaluation;
pub mod exporter;
pub mod graph2text;
pub mod launcher;
pub mod loader;
pub mod metrics;
pub mod retrieval;

pub use adaptation::AdaptationClient;
pub use evaluation::{AdaptationEvaluation, EvaluationError, RetrievalEvaluation};
pub use launcher::{Launcher, RunReport};
pub use retrieval::RetrievalClient;
