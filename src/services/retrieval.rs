// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retrieval service client.
//!
//! All cases and all queries go out in a single `Retrieve` call; the service
//! answers with one semantic (MAC) and/or structural (FAC) ranking per query.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::error::{AppError, Result};
use crate::models::graph::Graph;
use crate::models::wire::{NlpConfig, QueryResponse, RetrieveRequest, RetrieveResponse};
use crate::services::connect::ConnectClient;
use crate::services::graph2text::Graph2TextAlgorithm;

pub const SERVICE: &str = "arg_services.cbr.v1beta.RetrievalService";
const METHOD: &str = "Retrieve";

/// Client for the retrieval service.
#[derive(Clone)]
pub struct RetrievalClient {
    rpc: ConnectClient,
}

impl RetrievalClient {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let rpc = ConnectClient::new(
            &config.address,
            SERVICE,
            "retrieval",
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self { rpc })
    }

    /// Send the request and return one response per query, in query order.
    pub async fn retrieve(&self, request: &RetrieveRequest) -> Result<Vec<QueryResponse>> {
        tracing::info!(
            cases = request.cases.len(),
            queries = request.queries.len(),
            limit = request.limit,
            url = self.rpc.base_url(),
            "Retrieving cases"
        );

        let response: RetrieveResponse = self.rpc.unary(METHOD, request).await?;

        if response.query_responses.len() != request.queries.len() {
            return Err(AppError::Service {
                service: "retrieval",
                code: AppError::INVALID_RESPONSE.to_string(),
                message: format!(
                    "expected {} query responses, got {}",
                    request.queries.len(),
                    response.query_responses.len()
                ),
            });
        }

        Ok(response.query_responses)
    }
}

/// Build the `Retrieve` request for all cases and queries.
pub fn build_request<'a>(
    cases: &BTreeMap<String, Graph>,
    queries: impl IntoIterator<Item = &'a Graph>,
    config: &RetrievalConfig,
    nlp_config: NlpConfig,
    graph2text: Graph2TextAlgorithm,
) -> Result<RetrieveRequest> {
    let annotated_cases = cases
        .iter()
        .map(|(id, graph)| {
            let annotated = graph
                .to_annotated_graph(graph2text)
                .map_err(|source| AppError::BadRequest(format!("case {}: {}", id, source)))?;
            Ok((id.clone(), annotated))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let annotated_queries = queries
        .into_iter()
        .map(|graph| {
            graph
                .to_annotated_graph(graph2text)
                .map_err(|source| AppError::BadRequest(format!("query: {}", source)))
        })
        .collect::<Result<Vec<_>>>()?;

    let (mapping_algorithm, mapping_algorithm_variant) = config.mapping_algorithm.wire_parts();

    let mut extras = Map::new();
    extras.insert(
        "astar_queue_limit".to_string(),
        Value::from(config.astar_queue_limit),
    );

    Ok(RetrieveRequest {
        cases: annotated_cases,
        queries: annotated_queries,
        limit: config.limit,
        semantic_retrieval: config.mac,
        structural_retrieval: config.fac,
        nlp_config,
        scheme_handling: config.scheme_handling.wire_name(),
        mapping_algorithm,
        mapping_algorithm_variant,
        extras,
    })
}
