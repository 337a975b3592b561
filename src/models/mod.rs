// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models: argument graphs, adaptation rules and service messages.

pub mod graph;
pub mod rules;
pub mod wire;

pub use graph::{CbrEvaluation, Graph, GraphError};
pub use rules::{AdaptationRules, Concept, Pos, Rule, RuleError};
pub use wire::{AnnotatedGraph, MappingAlgorithm, NlpConfig, NlpPreset, SchemeHandling};
