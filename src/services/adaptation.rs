// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Adaptation service client.
//!
//! Each query gets its own `Adapt` call. Calls for different queries run
//! concurrently, bounded by `max_concurrent_requests`.

use futures_util::{stream, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::AdaptationConfig;
use crate::error::{AppError, Result};
use crate::models::graph::Graph;
use crate::models::rules::{parse_rules, AdaptationRules};
use crate::models::wire::{AdaptRequest, AdaptResponse, AdaptedCaseRequest, NlpConfig, QueryResponse};
use crate::services::connect::ConnectClient;
use crate::services::graph2text::Graph2TextAlgorithm;

pub const SERVICE: &str = "arg_services.cbr.v1beta.AdaptationService";
const METHOD: &str = "Adapt";

/// Client for the adaptation service.
#[derive(Clone)]
pub struct AdaptationClient {
    rpc: ConnectClient,
    max_concurrent_requests: usize,
}

impl AdaptationClient {
    pub fn new(config: &AdaptationConfig) -> Result<Self> {
        let rpc = ConnectClient::new(
            &config.address,
            SERVICE,
            "adaptation",
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            rpc,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        })
    }

    pub async fn adapt(&self, request: &AdaptRequest) -> Result<AdaptResponse> {
        tracing::debug!(cases = request.cases.len(), "Adapting cases");
        self.rpc.unary(METHOD, request).await
    }

    /// Run all requests, returning responses in request order.
    /// `None` requests are skipped and yield `None`.
    pub async fn adapt_all(
        &self,
        requests: &[Option<AdaptRequest>],
    ) -> Result<Vec<Option<AdaptResponse>>> {
        let pending = requests.iter().filter(|r| r.is_some()).count();
        tracing::info!(
            requests = pending,
            concurrency = self.max_concurrent_requests,
            url = self.rpc.base_url(),
            "Adapting queries"
        );

        stream::iter(requests)
            .map(|request| async move {
                match request {
                    Some(request) => self.adapt(request).await.map(Some),
                    None => Ok(None),
                }
            })
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await
    }
}

/// One case of an adapt request with at most `rules_limit` benchmark rules.
pub fn build_case_request(
    case_id: &str,
    cases: &BTreeMap<String, Graph>,
    rules_per_case: Option<&BTreeMap<String, AdaptationRules>>,
    rules_limit: usize,
    graph2text: Graph2TextAlgorithm,
) -> Result<AdaptedCaseRequest> {
    let case = cases
        .get(case_id)
        .ok_or_else(|| AppError::BadRequest(format!("unknown case '{}'", case_id)))?;

    let annotated = case
        .to_annotated_graph(graph2text)
        .map_err(|source| AppError::BadRequest(format!("case {}: {}", case_id, source)))?;

    let mut rules = match rules_per_case.and_then(|rules| rules.get(case_id)) {
        Some(case_rules) if rules_limit > 0 => parse_rules(case_rules)?,
        _ => Vec::new(),
    };
    rules.truncate(rules_limit);

    Ok(AdaptedCaseRequest {
        case: annotated,
        rules,
    })
}

/// Build the adapt request for one query.
///
/// With a retrieval ranking, exactly the ranked cases are adapted (structural
/// ranking preferred). Without one, every case the benchmark has rules for.
/// Returns `None` if there is nothing to adapt.
pub fn build_request(
    cases: &BTreeMap<String, Graph>,
    query: &Graph,
    retrieval: Option<&QueryResponse>,
    config: &AdaptationConfig,
    nlp_config: NlpConfig,
    graph2text: Graph2TextAlgorithm,
) -> Result<Option<AdaptRequest>> {
    let rules_per_case = query
        .benchmark()
        .and_then(|benchmark| benchmark.generalizations.as_ref());

    let case_ids: Vec<&str> = match retrieval.map(QueryResponse::final_ranking) {
        Some(ranking) if !ranking.is_empty() => ranking.iter().map(|c| c.id.as_str()).collect(),
        _ => rules_per_case
            .map(|rules| rules.keys().map(String::as_str).collect())
            .unwrap_or_default(),
    };

    if case_ids.is_empty() {
        return Ok(None);
    }

    let adapted_cases = case_ids
        .into_iter()
        .map(|id| {
            let request = build_case_request(
                id,
                cases,
                rules_per_case,
                config.predefined_rules_limit,
                graph2text,
            )?;
            Ok((id.to_string(), request))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let query = query
        .to_annotated_graph(graph2text)
        .map_err(|source| AppError::BadRequest(format!("query: {}", source)))?;

    Ok(Some(AdaptRequest {
        cases: adapted_cases,
        query,
        nlp_config,
        extras: config.extras.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::tests::sample_graph_json;
    use crate::models::wire::{NlpPreset, RetrievedCase};
    use serde_json::json;

    fn cases() -> BTreeMap<String, Graph> {
        BTreeMap::from([
            ("microtexts/a".to_string(), Graph::from_text("Power plants.")),
            ("microtexts/b".to_string(), Graph::from_text("Coal plants.")),
            ("microtexts/c".to_string(), Graph::from_text("Wind farms.")),
        ])
    }

    fn query() -> Graph {
        Graph::from_document(sample_graph_json()).unwrap()
    }

    fn ranking(ids: &[&str]) -> QueryResponse {
        QueryResponse {
            semantic_ranking: ids
                .iter()
                .map(|id| RetrievedCase {
                    id: id.to_string(),
                    similarity: 0.5,
                    ..Default::default()
                })
                .collect(),
            structural_ranking: Vec::new(),
        }
    }

    fn build(
        retrieval: Option<&QueryResponse>,
        config: &AdaptationConfig,
    ) -> Result<Option<AdaptRequest>> {
        build_request(
            &cases(),
            &query(),
            retrieval,
            config,
            NlpPreset::Default.to_nlp_config("en"),
            Graph2TextAlgorithm::NodeId,
        )
    }

    #[test]
    fn test_ranked_cases_are_adapted() {
        let config = AdaptationConfig {
            predefined_rules_limit: 5,
            ..Default::default()
        };
        let response = ranking(&["microtexts/c", "microtexts/a"]);
        let request = build(Some(&response), &config).unwrap().unwrap();

        assert_eq!(
            request.cases.keys().collect::<Vec<_>>(),
            vec!["microtexts/a", "microtexts/c"]
        );
        assert_eq!(request.cases["microtexts/a"].rules.len(), 1);
        assert!(request.cases["microtexts/c"].rules.is_empty());
    }

    #[test]
    fn test_without_ranking_benchmark_cases_are_adapted() {
        let config = AdaptationConfig {
            extras: json!({"type": "openai-chat-hybrid"})
                .as_object()
                .cloned()
                .unwrap(),
            ..Default::default()
        };
        let request = build(None, &config).unwrap().unwrap();
        assert_eq!(request.cases.keys().collect::<Vec<_>>(), vec!["microtexts/a"]);

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["extras"]["type"], "openai-chat-hybrid");
        assert!(wire["query"]["graph"].get("userdata").is_none());
    }

    #[test]
    fn test_zero_rules_limit_sends_no_rules() {
        let request = build(None, &AdaptationConfig::default()).unwrap().unwrap();
        assert!(request.cases["microtexts/a"].rules.is_empty());
    }

    #[test]
    fn test_nothing_to_adapt() {
        let cases = cases();
        let request = build_request(
            &cases,
            &Graph::from_text("Plain query."),
            None,
            &AdaptationConfig::default(),
            NlpPreset::Default.to_nlp_config("en"),
            Graph2TextAlgorithm::NodeId,
        )
        .unwrap();
        assert!(request.is_none());
    }

    #[test]
    fn test_unknown_ranked_case() {
        let response = ranking(&["microtexts/missing"]);
        let result = build(Some(&response), &AdaptationConfig::default());
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
