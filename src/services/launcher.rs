// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Experiment run orchestration.
//!
//! Handles the core workflow:
//! 1. Load the case base and the requests
//! 2. Retrieve cases for all requests in one call
//! 3. Adapt the retrieved (or benchmarked) cases per request
//! 4. Evaluate both stages against the request's benchmark
//! 5. Export individual and aggregated results

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::models::graph::Graph;
use crate::models::wire::{AdaptResponse, NlpConfig, QueryResponse};
use crate::services::adaptation::{self, AdaptationClient};
use crate::services::evaluation::{
    adaptation_results, retrieval_results, AdaptationEvaluation, RetrievalEvaluation,
};
use crate::services::exporter::{self, Aggregated, QueryResult};
use crate::services::loader::{self, Request};
use crate::services::retrieval::{self, RetrievalClient};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub queries: Vec<QueryResult>,
    pub aggregated: Aggregated,
    /// Time spent on the service calls and evaluation, without loading
    pub duration: Duration,
}

/// Runs an experiment described by a [`Config`].
pub struct Launcher {
    config: Config,
    nlp_config: NlpConfig,
    retrieval: Option<RetrievalClient>,
    adaptation: Option<AdaptationClient>,
}

impl Launcher {
    pub fn new(config: Config) -> Result<Self> {
        config.validate_all()?;

        let retrieval = config
            .retrieval
            .as_ref()
            .map(RetrievalClient::new)
            .transpose()?;
        let adaptation = config
            .adaptation
            .as_ref()
            .map(AdaptationClient::new)
            .transpose()?;
        let nlp_config = config.nlp_config.to_nlp_config(&config.language);

        Ok(Self {
            config,
            nlp_config,
            retrieval,
            adaptation,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the experiment, writing exports below `output`.
    pub async fn run(&self, output: &Path) -> Result<RunReport> {
        let cases = loader::load_cases(&self.config.path)?;
        let requests = loader::load_requests(&self.config.path)?;

        let started = Instant::now();

        let retrievals = self.retrieve(&cases, &requests).await?;
        let adaptations = self.adapt(&cases, &requests, &retrievals).await?;

        let mut queries = Vec::with_capacity(requests.len());
        for ((request, retrieved), adapted) in requests.iter().zip(&retrievals).zip(&adaptations) {
            let result = self.evaluate(request, retrieved.as_ref(), adapted.as_ref())?;

            if self.config.evaluation.individual_results {
                exporter::export_query(output, &result)?;
            }
            queries.push(result);
        }

        if self.config.evaluation.individual_results {
            tracing::info!(count = queries.len(), "Individual results were exported");
        }

        let duration = started.elapsed();
        let aggregated = exporter::aggregate(&queries);

        if self.config.evaluation.aggregated_results {
            exporter::export_aggregated(output, &aggregated, duration, &self.config)?;
        }

        tracing::info!(
            queries = queries.len(),
            duration_ms = duration.as_millis() as u64,
            "Run finished"
        );

        Ok(RunReport {
            queries,
            aggregated,
            duration,
        })
    }

    /// One retrieval response per request, or `None`s without retrieval.
    async fn retrieve(
        &self,
        cases: &BTreeMap<String, Graph>,
        requests: &[Request],
    ) -> Result<Vec<Option<QueryResponse>>> {
        let (Some(client), Some(config)) = (&self.retrieval, &self.config.retrieval) else {
            return Ok(vec![None; requests.len()]);
        };

        let request = retrieval::build_request(
            cases,
            requests.iter().map(|r| &r.graph),
            config,
            self.nlp_config.clone(),
            self.config.graph2text,
        )?;

        let responses = client.retrieve(&request).await?;
        Ok(responses.into_iter().map(Some).collect())
    }

    /// One adaptation response per request, or `None`s without adaptation.
    async fn adapt(
        &self,
        cases: &BTreeMap<String, Graph>,
        requests: &[Request],
        retrievals: &[Option<QueryResponse>],
    ) -> Result<Vec<Option<AdaptResponse>>> {
        let (Some(client), Some(config)) = (&self.adaptation, &self.config.adaptation) else {
            return Ok(vec![None; requests.len()]);
        };

        let adapt_requests = requests
            .iter()
            .zip(retrievals)
            .map(|(request, retrieved)| {
                adaptation::build_request(
                    cases,
                    &request.graph,
                    retrieved.as_ref(),
                    config,
                    self.nlp_config.clone(),
                    self.config.graph2text,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        client.adapt_all(&adapt_requests).await
    }

    /// Collect exports and metrics for one request.
    fn evaluate(
        &self,
        request: &Request,
        retrieved: Option<&QueryResponse>,
        adapted: Option<&AdaptResponse>,
    ) -> Result<QueryResult> {
        let evaluation_config = &self.config.evaluation;
        let export_graph = evaluation_config.export_graph;
        let has_benchmark = request.graph.benchmark().is_some();

        if !has_benchmark {
            tracing::warn!(request = %request.id, "Request has no benchmark, skipping evaluation");
        }

        let mut result = QueryResult {
            id: request.id.clone(),
            ..Default::default()
        };

        if let Some(retrieved) = retrieved {
            result.mac = exporter::ranking_rows(&retrieved.semantic_ranking);
            result.fac = exporter::ranking_rows(&retrieved.structural_ranking);

            let ranking = retrieved.final_ranking();
            result.retrieval = Some(retrieval_results(ranking, export_graph)?);

            if has_benchmark && !ranking.is_empty() {
                let limit = self.config.retrieval.as_ref().map(|r| r.limit as usize);
                let evaluation =
                    RetrievalEvaluation::new(&request.graph, ranking, limit, evaluation_config)?;
                result.evaluation.insert(
                    exporter::RETRIEVAL_STAGE.to_string(),
                    evaluation.compute_metrics(),
                );
            }
        }

        if let Some(adapted) = adapted {
            result.adaptation = Some(adaptation_results(&adapted.cases, export_graph)?);

            if has_benchmark {
                match AdaptationEvaluation::new(&request.graph, &adapted.cases, evaluation_config)
                {
                    Ok(evaluation) => {
                        tracing::debug!(
                            request = %request.id,
                            cases = evaluation.evaluated_cases(),
                            "Evaluated adaptations"
                        );
                        result.evaluation.insert(
                            exporter::ADAPTATION_STAGE.to_string(),
                            evaluation.compute_metrics(),
                        );
                    }
                    Err(e) if e.is_not_comparable() => {
                        tracing::warn!(
                            request = %request.id,
                            error = %e,
                            "Adaptations not evaluated"
                        );
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(result)
    }
}
