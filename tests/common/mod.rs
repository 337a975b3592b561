// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use arguelauncher::config::{AdaptationConfig, Config, PathConfig, RetrievalConfig};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RETRIEVE_PATH: &str = "/arg_services.cbr.v1beta.RetrievalService/Retrieve";
pub const ADAPT_PATH: &str = "/arg_services.cbr.v1beta.AdaptationService/Adapt";

/// Case graph with a claim and one supporting premise.
#[allow(dead_code)]
pub fn case_graph(claim: &str, premise: &str) -> Value {
    json!({
        "nodes": {
            "c": {"atom": {"text": claim}},
            "p": {"atom": {"text": premise}},
            "s": {"scheme": {"support": "SUPPORT_DEFAULT"}}
        },
        "edges": {
            "e1": {"source": "p", "target": "s"},
            "e2": {"source": "s", "target": "c"}
        },
        "majorClaim": "c"
    })
}

/// Query graph whose benchmark ranks case `a` over case `b` and has one
/// generalization for case `a`.
#[allow(dead_code)]
pub fn query_graph() -> Value {
    json!({
        "nodes": {
            "q": {"atom": {"text": "Should we build more power plants?"}}
        },
        "userdata": {
            "cbrEvaluations": [{
                "ranking": {"microtexts/a": 1, "microtexts/b": 2},
                "generalizations": {
                    "microtexts/a": {"power/noun": "energy/noun"}
                }
            }]
        }
    })
}

/// Query graph with its own text and benchmark.
#[allow(dead_code)]
pub fn benchmark_query(text: &str, ranking: Value, generalizations: Value) -> Value {
    json!({
        "nodes": {
            "q": {"atom": {"text": text}}
        },
        "userdata": {
            "cbrEvaluations": [{
                "ranking": ranking,
                "generalizations": generalizations
            }]
        }
    })
}

/// A case base (`cases/microtexts/{a,b,c}.json`) and one request (`requests/q1.json`).
#[allow(dead_code)]
pub struct Fixture {
    pub dir: TempDir,
    pub cases: PathBuf,
    pub requests: PathBuf,
    pub output: PathBuf,
}

#[allow(dead_code)]
pub fn write_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cases = dir.path().join("cases/microtexts");
    let requests = dir.path().join("requests");
    fs::create_dir_all(&cases).unwrap();
    fs::create_dir_all(&requests).unwrap();

    for (name, claim, premise) in [
        ("a", "Power plants are needed.", "Demand is rising."),
        ("b", "Coal should be phased out.", "It pollutes the air."),
        ("c", "Wind farms are ugly.", "They change the landscape."),
    ] {
        write_json(&cases.join(format!("{}.json", name)), &case_graph(claim, premise));
    }
    write_json(&requests.join("q1.json"), &query_graph());

    let output = dir.path().join("outputs");
    Fixture {
        dir,
        cases,
        requests,
        output,
    }
}

#[allow(dead_code)]
pub fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Config pointing at the fixture and the given service addresses.
#[allow(dead_code)]
pub fn test_config(
    fixture: &Fixture,
    retrieval: Option<&str>,
    adaptation: Option<&str>,
) -> Config {
    let mut config = Config {
        path: PathConfig {
            cases: fixture.cases.clone(),
            cases_pattern: "*.json".to_string(),
            requests: fixture.requests.clone(),
            requests_pattern: "**/*.json".to_string(),
        },
        retrieval: retrieval.map(|address| RetrievalConfig {
            address: address.to_string(),
            limit: 4,
            timeout_secs: 5,
            ..Default::default()
        }),
        adaptation: adaptation.map(|address| AdaptationConfig {
            address: address.to_string(),
            predefined_rules_limit: 2,
            timeout_secs: 5,
            ..Default::default()
        }),
        ..Default::default()
    };
    config.evaluation.individual_results = true;
    config
}

/// Retrieval answer for one query: `a` before `b` in both rankings.
#[allow(dead_code)]
pub fn retrieve_response() -> Value {
    json!({
        "queryResponses": [{
            "semanticRanking": [
                {"id": "microtexts/a", "similarity": 0.9, "graph": {"text": "Power plants are needed."}},
                {"id": "microtexts/c", "similarity": 0.6},
                {"id": "microtexts/b", "similarity": 0.4}
            ],
            "structuralRanking": [
                {"id": "microtexts/a", "similarity": 0.8},
                {"id": "microtexts/b", "similarity": 0.5}
            ]
        }]
    })
}

/// Adaptation answer applying the benchmark rule to case `a`.
#[allow(dead_code)]
pub fn adapt_response() -> Value {
    json!({
        "cases": {
            "microtexts/a": {
                "case": {"text": "Energy plants are needed.", "graph": {"nodes": {}}},
                "appliedRules": [{
                    "source": {"lemma": "power", "pos": "POS_NOUN", "score": 0.7},
                    "target": {"lemma": "energy", "pos": "POS_NOUN"}
                }],
                "discardedRules": []
            },
            "microtexts/b": {
                "case": {"text": "Coal should be phased out."}
            }
        }
    })
}

#[allow(dead_code)]
pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
