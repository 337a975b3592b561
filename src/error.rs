// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent exit codes.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::models::graph::GraphError;
use crate::models::rules::RuleError;
use crate::services::evaluation::EvaluationError;

/// Application error type shared by the launcher services.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load graph {}: {source}", path.display())]
    Graph {
        path: PathBuf,
        #[source]
        source: GraphError,
    },

    #[error("Invalid adaptation rule: {0}")]
    Rule(#[from] RuleError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{service} service error ({code}): {message}")]
    Service {
        service: &'static str,
        code: String,
        message: String,
    },

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Connect code for services that could not be reached.
    pub const UNAVAILABLE: &'static str = "unavailable";
    /// Connect code for calls that ran into the client timeout.
    pub const DEADLINE_EXCEEDED: &'static str = "deadline_exceeded";
    /// Code used when a service answered with a body we cannot decode.
    pub const INVALID_RESPONSE: &'static str = "invalid_response";

    /// Returns true if the error means a service could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::Service { code, .. }
                if code == Self::UNAVAILABLE || code == Self::DEADLINE_EXCEEDED
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Graph { .. }
            | AppError::Rule(_)
            | AppError::BadRequest(_)
            | AppError::Evaluation(EvaluationError::Rule(_)) => 3,
            AppError::Service { .. } => 4,
            AppError::Evaluation(_) | AppError::Io(_) | AppError::Internal(_) => 1,
        }
    }
}

/// Result type alias for launcher operations
pub type Result<T> = std::result::Result<T, AppError>;
