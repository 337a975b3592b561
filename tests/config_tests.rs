// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use arguelauncher::config::{Config, ConfigError, LOCAL_CONFIG_FILE};
use arguelauncher::models::NlpPreset;
use std::fs;

#[test]
fn test_load_main_file_with_local_override() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("app.yaml");
    fs::write(
        &main,
        "nlp_config: SBERT\nretrieval:\n  limit: 20\n  fac: false\nevaluation:\n  individual_results: true\n",
    )
    .unwrap();
    fs::write(
        dir.path().join(LOCAL_CONFIG_FILE),
        "retrieval:\n  address: retrieval.internal:50200\npath:\n  requests: data/requests/custom\n",
    )
    .unwrap();

    let config = Config::load(Some(&main), &[]).unwrap();
    assert_eq!(config.nlp_config, NlpPreset::Sbert);

    let retrieval = config.retrieval.unwrap();
    assert_eq!(retrieval.limit, 20);
    assert!(!retrieval.fac);
    assert_eq!(retrieval.address, "retrieval.internal:50200");
    assert_eq!(
        config.path.requests.to_str(),
        Some("data/requests/custom")
    );
    assert_eq!(config.path.cases_pattern, "*.json");
    assert!(config.evaluation.individual_results);
}

#[test]
fn test_command_line_overrides_win() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("app.yaml");
    fs::write(&main, "retrieval:\n  mac: true\n").unwrap();
    fs::write(dir.path().join(LOCAL_CONFIG_FILE), "retrieval:\n  mac: true\n").unwrap();

    let overrides = vec![
        "retrieval.mac=false".to_string(),
        "adaptation=null".to_string(),
        "nlp_config=strf".to_string(),
    ];
    let config = Config::load(Some(&main), &overrides).unwrap();

    assert!(!config.retrieval.unwrap().mac);
    assert!(config.adaptation.is_none());
    assert_eq!(config.nlp_config, NlpPreset::Strf);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("missing.yaml")), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_invalid_yaml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("app.yaml");
    fs::write(&main, "retrieval: [unclosed\n").unwrap();

    let err = Config::load(Some(&main), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_unknown_enum_value_is_rejected() {
    let err = Config::from_yaml_str("graph2text: ALPHABETICAL\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_zero_concurrency_is_invalid() {
    let err = Config::from_yaml_str("adaptation:\n  max_concurrent_requests: 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_printed_config_loads_back() {
    let config = Config::from_yaml_str("retrieval:\n  limit: 3\nevaluation:\n  f_scores: [0.5]\n")
        .unwrap();
    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("limit: 3"));
    assert_eq!(Config::from_yaml_str(&yaml).unwrap(), config);
}
