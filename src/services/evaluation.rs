// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Evaluation of retrieval and adaptation results against user benchmarks.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::EvaluationConfig;
use crate::models::graph::{CbrEvaluation, Graph};
use crate::models::rules::{parse_rules, RuleError};
use crate::models::wire::{AdaptedCaseResponse, RetrievedCase};
use crate::services::metrics::{self, Metric, Qrels, Run};

/// Metric name to value, e.g. `ndcg@5 → 0.81`.
pub type Metrics = BTreeMap<String, f64>;

/// Cutoff used when no retrieval limit applies.
pub const FULL_CUTOFF: usize = 1000;

/// Key of the single query in a retrieval evaluation.
const QUERY_KEY: &str = "query";

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Query has no benchmark")]
    MissingBenchmark,

    #[error("Benchmark has no generalizations")]
    MissingGeneralizations,

    #[error("Computed adaptations are not present in user benchmark")]
    NoOverlap,

    #[error("Invalid benchmark rule: {0}")]
    Rule(#[from] RuleError),

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl EvaluationError {
    /// True if the service answer cannot be compared with the benchmark,
    /// as opposed to the benchmark itself being broken.
    pub fn is_not_comparable(&self) -> bool {
        matches!(
            self,
            EvaluationError::MissingGeneralizations | EvaluationError::NoOverlap
        )
    }
}

/// Cutoffs `k` at which metrics are reported.
pub fn cutoffs(limit: Option<usize>) -> Vec<usize> {
    let Some(limit) = limit else {
        return vec![FULL_CUTOFF];
    };

    let mut values: Vec<usize> = Vec::new();
    for k in [limit / 4, limit / 2, FULL_CUTOFF] {
        if k > 0 && !values.contains(&k) {
            values.push(k);
        }
    }
    values
}

/// Graded relevance of a user rank: rank 1 is the most relevant.
pub fn user_relevance(rank: u32, max_rank: u32) -> u32 {
    if rank >= 1 && rank <= max_rank {
        max_rank + 1 - rank
    } else {
        0
    }
}

/// Benchmark ranks and system scores, plus the cutoffs they are compared at.
#[derive(Debug, Clone)]
struct RankingEvaluation {
    ranks: Qrels,
    qrels: Qrels,
    run: Run,
    cutoffs: Vec<usize>,
}

impl RankingEvaluation {
    fn new(ranks: Qrels, max_rank: impl Fn(&str) -> u32, run: Run, cutoffs: Vec<usize>) -> Self {
        let qrels = ranks
            .iter()
            .map(|(query, judgements)| {
                let max = max_rank(query);
                let graded = judgements
                    .iter()
                    .map(|(doc, rank)| (doc.clone(), user_relevance(*rank, max)))
                    .collect();
                (query.clone(), graded)
            })
            .collect();

        Self {
            ranks,
            qrels,
            run,
            cutoffs,
        }
    }

    fn compute_metrics(&self, f_scores: &[f64]) -> Metrics {
        let mut results = metrics::evaluate(
            &self.qrels,
            &self.run,
            &Metric::standard(f_scores),
            &self.cutoffs,
        );

        for &k in &self.cutoffs {
            if let Some((correctness, completeness)) = self.correctness_completeness(k) {
                results.insert(format!("correctness@{}", k), correctness);
                results.insert(format!("completeness@{}", k), completeness);
            }
        }

        results
    }

    /// Mean correctness and completeness over the shared queries.
    fn correctness_completeness(&self, k: usize) -> Option<(f64, f64)> {
        let scores: Vec<(f64, f64)> = metrics::shared_queries(&self.ranks, &self.run)
            .map(|query| pair_agreement(&self.ranks[query], &self.run[query], k))
            .collect();

        if scores.is_empty() {
            return None;
        }

        let n = scores.len() as f64;
        let correctness = scores.iter().map(|s| s.0).sum::<f64>() / n;
        let completeness = scores.iter().map(|s| s.1).sum::<f64>() / n;
        Some((correctness, completeness))
    }
}

/// Agreement between user ranks and the system's top `k` for one query.
///
/// Every ordered pair the user ranked differently is an order; it is
/// concordant if the system ranks both in the same order, discordant if in
/// the opposite one, and ignored if either is missing from the top `k`.
fn pair_agreement(
    user_ranks: &BTreeMap<String, u32>,
    scores: &BTreeMap<String, f64>,
    k: usize,
) -> (f64, f64) {
    let system_ranks: BTreeMap<&str, usize> = metrics::ranked_documents(scores)
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(i, doc)| (doc, i + 1))
        .collect();

    let mut orders = 0usize;
    let mut concordant = 0usize;
    let mut discordant = 0usize;

    for (doc_a, rank_a) in user_ranks {
        for (doc_b, rank_b) in user_ranks {
            if rank_a <= rank_b {
                continue;
            }
            orders += 1;

            if let (Some(system_a), Some(system_b)) = (
                system_ranks.get(doc_a.as_str()),
                system_ranks.get(doc_b.as_str()),
            ) {
                if system_a > system_b {
                    concordant += 1;
                } else if system_a < system_b {
                    discordant += 1;
                }
            }
        }
    }

    let comparable = concordant + discordant;
    let correctness = if comparable > 0 {
        (concordant as f64 - discordant as f64) / comparable as f64
    } else {
        1.0
    };
    let completeness = if orders > 0 {
        comparable as f64 / orders as f64
    } else {
        1.0
    };

    (correctness, completeness)
}

fn first_benchmark(query: &Graph) -> Result<&CbrEvaluation, EvaluationError> {
    query.benchmark().ok_or(EvaluationError::MissingBenchmark)
}

/// Evaluation of one query's retrieval ranking.
#[derive(Debug, Clone)]
pub struct RetrievalEvaluation {
    ranking: RankingEvaluation,
    retrieved: Vec<RetrievedCase>,
    f_scores: Vec<f64>,
}

impl RetrievalEvaluation {
    pub fn new(
        query: &Graph,
        retrieved: &[RetrievedCase],
        limit: Option<usize>,
        config: &EvaluationConfig,
    ) -> Result<Self, EvaluationError> {
        let benchmark = first_benchmark(query)?;

        let ranks = Qrels::from([(QUERY_KEY.to_string(), benchmark.ranking.clone())]);
        let scores = retrieved
            .iter()
            .map(|case| (case.id.clone(), case.similarity))
            .collect();
        let run = Run::from([(QUERY_KEY.to_string(), scores)]);
        let max_rank = config.max_user_rank;

        Ok(Self {
            ranking: RankingEvaluation::new(ranks, |_| max_rank, run, cutoffs(limit)),
            retrieved: retrieved.to_vec(),
            f_scores: config.f_scores.clone(),
        })
    }

    /// Ranking metrics plus `similarity@k`, the mean similarity of the
    /// first `k` retrieved cases.
    pub fn compute_metrics(&self) -> Metrics {
        let mut results = self.ranking.compute_metrics(&self.f_scores);

        if !self.retrieved.is_empty() {
            for &k in &self.ranking.cutoffs {
                let top = &self.retrieved[..self.retrieved.len().min(k)];
                let mean = top.iter().map(|case| case.similarity).sum::<f64>() / top.len() as f64;
                results.insert(format!("similarity@{}", k), mean);
            }
        }

        results
    }

    /// Retrieved cases as JSON, without their graphs unless `export_graph`.
    pub fn results(&self, export_graph: bool) -> Result<Value, EvaluationError> {
        retrieval_results(&self.retrieved, export_graph)
    }
}

/// Retrieved cases as JSON, also used for queries that are not evaluated.
pub fn retrieval_results(
    retrieved: &[RetrievedCase],
    export_graph: bool,
) -> Result<Value, EvaluationError> {
    let cases: Vec<RetrievedCase> = retrieved
        .iter()
        .cloned()
        .map(|mut case| {
            if !export_graph {
                if let Some(graph) = case.graph.as_mut() {
                    graph.clear_graph();
                }
            }
            case
        })
        .collect();

    Ok(serde_json::to_value(cases)?)
}

/// Evaluation of one query's adapted cases.
#[derive(Debug, Clone)]
pub struct AdaptationEvaluation {
    ranking: RankingEvaluation,
    response: BTreeMap<String, AdaptedCaseResponse>,
    f_scores: Vec<f64>,
}

impl AdaptationEvaluation {
    /// Compare the applied rules of every case with the user's generalizations.
    ///
    /// The user ranks rules by their order in the benchmark; every benchmark
    /// rule counts as relevant. Cases where the service applied no rule are
    /// not evaluated.
    pub fn new(
        query: &Graph,
        response: &BTreeMap<String, AdaptedCaseResponse>,
        config: &EvaluationConfig,
    ) -> Result<Self, EvaluationError> {
        let generalizations = first_benchmark(query)?
            .generalizations
            .as_ref()
            .ok_or(EvaluationError::MissingGeneralizations)?;

        let mut ranks = Qrels::new();
        for (case_id, rules) in generalizations {
            let user_rules = parse_rules(rules)?;
            let positions = user_rules
                .iter()
                .enumerate()
                .map(|(i, rule)| (rule.source.key(), (i + 1) as u32))
                .collect();
            ranks.insert(case_id.clone(), positions);
        }

        let run: Run = ranks
            .keys()
            .filter_map(|case_id| {
                let adapted = response.get(case_id)?;
                if adapted.applied_rules.is_empty() {
                    return None;
                }
                let scores = adapted
                    .applied_rules
                    .iter()
                    .map(|rule| (rule.source.key(), rule.source.score))
                    .collect();
                Some((case_id.clone(), scores))
            })
            .collect();

        if run.is_empty() {
            return Err(EvaluationError::NoOverlap);
        }

        let rule_counts: BTreeMap<String, u32> = ranks
            .iter()
            .map(|(case_id, rules)| (case_id.clone(), rules.len() as u32))
            .collect();
        let max_rank = |case_id: &str| rule_counts.get(case_id).copied().unwrap_or(0);

        Ok(Self {
            ranking: RankingEvaluation::new(ranks, max_rank, run, cutoffs(None)),
            response: response.clone(),
            f_scores: config.f_scores.clone(),
        })
    }

    pub fn compute_metrics(&self) -> Metrics {
        self.ranking.compute_metrics(&self.f_scores)
    }

    /// Number of cases whose applied rules were compared.
    pub fn evaluated_cases(&self) -> usize {
        self.ranking.run.len()
    }

    /// Adapted cases as JSON keyed by case id, without their graphs unless
    /// `export_graph`.
    pub fn results(&self, export_graph: bool) -> Result<Value, EvaluationError> {
        adaptation_results(&self.response, export_graph)
    }
}

/// Adapted cases as JSON, also used for queries that are not evaluated.
pub fn adaptation_results(
    response: &BTreeMap<String, AdaptedCaseResponse>,
    export_graph: bool,
) -> Result<Value, EvaluationError> {
    let cases: BTreeMap<&str, AdaptedCaseResponse> = response
        .iter()
        .map(|(id, adapted)| {
            let mut adapted = adapted.clone();
            if !export_graph {
                adapted.case.clear_graph();
            }
            (id.as_str(), adapted)
        })
        .collect();

    Ok(serde_json::to_value(cases)?)
}
