// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Launcher configuration loaded from layered YAML files and overrides.
//!
//! Layers are merged in this order, later layers winning:
//! built-in defaults, the main config file, `app.local.yaml` next to it,
//! and finally `dotted.key=value` overrides from the command line.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::models::wire::{MappingAlgorithm, NlpPreset, SchemeHandling};
use crate::services::graph2text::Graph2TextAlgorithm;

/// Main config file used when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_FILE: &str = "config/app.yaml";
/// Name of the untracked override file looked up next to the main file.
pub const LOCAL_CONFIG_FILE: &str = "app.local.yaml";
/// Environment variable pointing at the main config file.
pub const CONFIG_ENV_VAR: &str = "ARGUELAUNCHER_CONFIG";

/// Complete launcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// NLP preset sent to both services
    pub nlp_config: NlpPreset,
    /// Language applied on top of the NLP preset
    #[validate(length(min = 1))]
    pub language: String,
    /// How graphs are flattened to text for the services
    pub graph2text: Graph2TextAlgorithm,
    /// Root folder for timestamped run directories
    pub output_root: PathBuf,
    #[validate(nested)]
    pub path: PathConfig,
    /// Retrieval stage; `null` disables it
    #[validate(nested)]
    pub retrieval: Option<RetrievalConfig>,
    /// Adaptation stage; `null` disables it
    #[validate(nested)]
    pub adaptation: Option<AdaptationConfig>,
    #[validate(nested)]
    pub evaluation: EvaluationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nlp_config: NlpPreset::default(),
            language: "en".to_string(),
            graph2text: Graph2TextAlgorithm::default(),
            output_root: PathBuf::from("outputs"),
            path: PathConfig::default(),
            retrieval: Some(RetrievalConfig::default()),
            adaptation: Some(AdaptationConfig::default()),
            evaluation: EvaluationConfig::default(),
        }
    }
}

/// Locations of the case base and the requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PathConfig {
    pub cases: PathBuf,
    #[validate(length(min = 1))]
    pub cases_pattern: String,
    pub requests: PathBuf,
    #[validate(length(min = 1))]
    pub requests_pattern: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            cases: PathBuf::from("data/cases/microtexts"),
            cases_pattern: "*.json".to_string(),
            requests: PathBuf::from("data/requests/microtexts-retrieval-complex"),
            requests_pattern: "**/*.json".to_string(),
        }
    }
}

/// Retrieval service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetrievalConfig {
    #[validate(length(min = 1))]
    pub address: String,
    pub scheme_handling: SchemeHandling,
    pub mapping_algorithm: MappingAlgorithm,
    /// Semantic retrieval ("many are called")
    pub mac: bool,
    /// Structural retrieval ("few are chosen")
    pub fac: bool,
    #[validate(range(min = 1))]
    pub limit: u32,
    pub astar_queue_limit: u32,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:50200".to_string(),
            scheme_handling: SchemeHandling::default(),
            mapping_algorithm: MappingAlgorithm::default(),
            mac: true,
            fac: true,
            limit: 10,
            astar_queue_limit: 1000,
            timeout_secs: 600,
        }
    }
}

/// Adaptation service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AdaptationConfig {
    #[validate(length(min = 1))]
    pub address: String,
    /// Benchmark rules forwarded per case; 0 sends none at all
    pub predefined_rules_limit: usize,
    /// Free-form settings forwarded to the adaptation service
    pub extras: serde_json::Map<String, serde_json::Value>,
    #[validate(range(min = 1))]
    pub max_concurrent_requests: usize,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:50300".to_string(),
            predefined_rules_limit: 0,
            extras: serde_json::Map::new(),
            max_concurrent_requests: 4,
            timeout_secs: 600,
        }
    }
}

/// Evaluation and export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Worst user rank still counted as relevant
    #[validate(range(min = 1))]
    pub max_user_rank: u32,
    /// Betas of the F-scores to compute
    #[validate(custom(function = "validate_f_scores"))]
    pub f_scores: Vec<f64>,
    /// Keep the full graphs in exported results
    pub export_graph: bool,
    pub individual_results: bool,
    pub aggregated_results: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_user_rank: 3,
            f_scores: vec![1.0, 2.0],
            export_graph: false,
            individual_results: false,
            aggregated_results: true,
        }
    }
}

fn validate_f_scores(betas: &[f64]) -> Result<(), ValidationError> {
    if betas.iter().all(|beta| beta.is_finite() && *beta > 0.0) {
        Ok(())
    } else {
        Err(ValidationError::new("f_scores_positive"))
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `file` takes precedence over `ARGUELAUNCHER_CONFIG`, which takes
    /// precedence over `config/app.yaml`. An explicitly named file must exist;
    /// the default file and the local override are optional.
    pub fn load(file: Option<&Path>, overrides: &[String]) -> Result<Self, ConfigError> {
        let main_file = match file {
            Some(path) => Some(path.to_path_buf()),
            None => env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from).or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }),
        };

        let mut value = Value::Mapping(Mapping::new());
        let local_file = match &main_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Reading config file");
                value = merge_values(value, read_yaml(path)?);
                path.with_file_name(LOCAL_CONFIG_FILE)
            }
            None => Path::new(DEFAULT_CONFIG_FILE).with_file_name(LOCAL_CONFIG_FILE),
        };

        if main_file.as_deref() != Some(local_file.as_path()) && local_file.exists() {
            tracing::debug!(path = %local_file.display(), "Applying local config overrides");
            value = merge_values(value, read_yaml(&local_file)?);
        }

        for entry in overrides {
            value = apply_override(value, entry)?;
        }

        Self::from_value(value)
    }

    /// Parse and validate a single YAML document (defaults fill the gaps).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        let value = match value {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other,
        };
        let config: Config =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate_all()?;
        Ok(config)
    }

    /// Field validation plus the cross-section rules.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.retrieval.is_none() && self.adaptation.is_none() {
            return Err(ConfigError::Invalid(
                "neither retrieval nor adaptation is enabled".to_string(),
            ));
        }

        if let Some(retrieval) = &self.retrieval {
            if !retrieval.mac && !retrieval.fac {
                tracing::warn!("Retrieval enabled with both mac and fac disabled");
            }
        }

        Ok(())
    }

    /// Render the resolved configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|e| {
        ConfigError::Parse(format!("{}: {}", path.display(), e))
    })?;

    // An empty file parses to null
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Deep-merge `overlay` into `base`. Mappings merge key by key; any other
/// overlay value (including null) replaces the base value.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Mapping(base)
        }
        (_, overlay) => overlay,
    }
}

/// Apply a `dotted.key=value` override. The value is read as a YAML scalar,
/// so `true`, `5` and `null` get their YAML types.
pub fn apply_override(root: Value, entry: &str) -> Result<Value, ConfigError> {
    let (key, raw) = entry
        .split_once('=')
        .ok_or_else(|| ConfigError::Override(format!("expected key=value, got '{}'", entry)))?;

    let segments: Vec<&str> = key.trim().split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Override(format!("invalid key '{}'", key)));
    }

    let value = if raw.is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    let overlay = segments.iter().rev().fold(value, |inner, segment| {
        let mut map = Mapping::new();
        map.insert(Value::String(segment.to_string()), inner);
        Value::Mapping(map)
    });

    Ok(merge_values(root, overlay))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid override: {0}")]
    Override(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
