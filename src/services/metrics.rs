// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ranking metrics over relevance judgements (qrels) and system runs.
//!
//! Judgements are graded: a document is relevant iff its grade is at least 1.
//! Runs are sorted by descending score; ties are broken by document id.

use std::collections::BTreeMap;
use std::fmt;

/// Graded relevance per query and document.
pub type Qrels = BTreeMap<String, BTreeMap<String, u32>>;
/// System score per query and document.
pub type Run = BTreeMap<String, BTreeMap<String, f64>>;

/// Available ranking metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Precision,
    Recall,
    /// F-score with the given beta
    FScore(f64),
    Hits,
    HitRate,
    Mrr,
    Map,
    Ndcg,
}

impl Metric {
    /// Metrics computed for every evaluation, with F-scores for `betas`.
    pub fn standard(betas: &[f64]) -> Vec<Metric> {
        let mut metrics = vec![Metric::Precision, Metric::Recall];
        metrics.extend(betas.iter().map(|beta| Metric::FScore(*beta)));
        metrics.extend([
            Metric::Hits,
            Metric::HitRate,
            Metric::Mrr,
            Metric::Map,
            Metric::Ndcg,
        ]);
        metrics
    }

    /// Name with cutoff, e.g. `ndcg@5`.
    pub fn name_at(&self, k: usize) -> String {
        format!("{}@{}", self, k)
    }

    /// Score a single ranked list.
    fn score(&self, ranked: &[&str], judgements: &BTreeMap<String, u32>, k: usize) -> f64 {
        let relevance = |doc: &str| judgements.get(doc).copied().unwrap_or(0);
        let top: &[&str] = &ranked[..ranked.len().min(k)];
        let relevant_total = judgements.values().filter(|grade| **grade >= 1).count();
        let hits = top.iter().filter(|doc| relevance(doc) >= 1).count();

        match self {
            Metric::Hits => hits as f64,
            Metric::HitRate => {
                if hits > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Metric::Precision => hits as f64 / k as f64,
            Metric::Recall => ratio(hits, relevant_total),
            Metric::FScore(beta) => {
                let precision = hits as f64 / k as f64;
                let recall = ratio(hits, relevant_total);
                let beta2 = beta * beta;
                let denominator = beta2 * precision + recall;
                if denominator == 0.0 {
                    0.0
                } else {
                    (1.0 + beta2) * precision * recall / denominator
                }
            }
            Metric::Mrr => top
                .iter()
                .position(|doc| relevance(doc) >= 1)
                .map_or(0.0, |i| 1.0 / (i + 1) as f64),
            Metric::Map => {
                if relevant_total == 0 {
                    return 0.0;
                }
                let mut found = 0;
                let mut sum = 0.0;
                for (i, doc) in top.iter().enumerate() {
                    if relevance(doc) >= 1 {
                        found += 1;
                        sum += found as f64 / (i + 1) as f64;
                    }
                }
                sum / relevant_total as f64
            }
            Metric::Ndcg => {
                let dcg = discounted_gain(top.iter().map(|doc| relevance(doc)));
                let mut ideal: Vec<u32> = judgements.values().copied().collect();
                ideal.sort_unstable_by(|a, b| b.cmp(a));
                ideal.truncate(k);
                let idcg = discounted_gain(ideal.into_iter());
                if idcg == 0.0 {
                    0.0
                } else {
                    dcg / idcg
                }
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Precision => write!(f, "precision"),
            Metric::Recall => write!(f, "recall"),
            Metric::FScore(beta) => write!(f, "f{}", beta),
            Metric::Hits => write!(f, "hits"),
            Metric::HitRate => write!(f, "hit_rate"),
            Metric::Mrr => write!(f, "mrr"),
            Metric::Map => write!(f, "map"),
            Metric::Ndcg => write!(f, "ndcg"),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn discounted_gain(grades: impl Iterator<Item = u32>) -> f64 {
    grades
        .enumerate()
        .map(|(i, grade)| grade as f64 / ((i + 2) as f64).log2())
        .sum()
}

/// Document ids of a run entry, best first.
pub fn ranked_documents(scores: &BTreeMap<String, f64>) -> Vec<&str> {
    let mut docs: Vec<(&str, f64)> = scores.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    docs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    docs.into_iter().map(|(id, _)| id).collect()
}

/// Queries present in both qrels and run.
pub fn shared_queries<'a>(qrels: &'a Qrels, run: &'a Run) -> impl Iterator<Item = &'a str> {
    qrels
        .keys()
        .filter(move |query| run.contains_key(*query))
        .map(String::as_str)
}

/// Mean of every metric at every cutoff over the shared queries.
/// Returns an empty map if no query is shared.
pub fn evaluate(
    qrels: &Qrels,
    run: &Run,
    metrics: &[Metric],
    cutoffs: &[usize],
) -> BTreeMap<String, f64> {
    let queries: Vec<&str> = shared_queries(qrels, run).collect();
    let mut results = BTreeMap::new();
    if queries.is_empty() {
        return results;
    }

    for metric in metrics {
        for &k in cutoffs {
            let total: f64 = queries
                .iter()
                .map(|query| {
                    let ranked = ranked_documents(&run[*query]);
                    metric.score(&ranked, &qrels[*query], k)
                })
                .sum();
            results.insert(metric.name_at(k), total / queries.len() as f64);
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(judgements: &[(&str, u32)], scores: &[(&str, f64)]) -> (Qrels, Run) {
        let qrels = Qrels::from([(
            "q".to_string(),
            judgements.iter().map(|(d, g)| (d.to_string(), *g)).collect(),
        )]);
        let run = Run::from([(
            "q".to_string(),
            scores.iter().map(|(d, s)| (d.to_string(), *s)).collect(),
        )]);
        (qrels, run)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ranked_documents_breaks_ties_by_id() {
        let scores = BTreeMap::from([
            ("b".to_string(), 0.5),
            ("a".to_string(), 0.5),
            ("c".to_string(), 0.9),
        ]);
        assert_eq!(ranked_documents(&scores), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_precision_recall_hits() {
        let (qrels, run) = single(
            &[("a", 2), ("b", 1), ("x", 0)],
            &[("a", 0.9), ("x", 0.8), ("b", 0.7), ("c", 0.1)],
        );
        let results = evaluate(
            &qrels,
            &run,
            &[Metric::Precision, Metric::Recall, Metric::Hits, Metric::HitRate],
            &[2, 4],
        );
        assert!(approx(results["precision@2"], 0.5));
        assert!(approx(results["recall@2"], 0.5));
        assert!(approx(results["hits@2"], 1.0));
        assert!(approx(results["hit_rate@2"], 1.0));
        assert!(approx(results["precision@4"], 0.5));
        assert!(approx(results["recall@4"], 1.0));
    }

    #[test]
    fn test_f_scores() {
        let (qrels, run) = single(&[("a", 1), ("b", 1)], &[("a", 0.9), ("x", 0.5)]);
        // precision@2 = 0.5, recall@2 = 0.5
        let results = evaluate(&qrels, &run, &Metric::standard(&[1.0, 2.0]), &[2]);
        assert!(approx(results["f1@2"], 0.5));
        assert!(approx(results["f2@2"], 0.5));

        let (qrels, run) = single(&[("a", 1)], &[("a", 0.9), ("x", 0.5)]);
        // precision 0.5, recall 1.0
        let results = evaluate(&qrels, &run, &[Metric::FScore(2.0)], &[2]);
        assert!(approx(results["f2@2"], 5.0 * 0.5 / (4.0 * 0.5 + 1.0)));
    }

    #[test]
    fn test_mrr_and_map() {
        let (qrels, run) = single(
            &[("b", 1), ("d", 1)],
            &[("a", 0.9), ("b", 0.8), ("c", 0.7), ("d", 0.6)],
        );
        let results = evaluate(&qrels, &run, &[Metric::Mrr, Metric::Map], &[4, 1]);
        assert!(approx(results["mrr@4"], 0.5));
        assert!(approx(results["map@4"], (0.5 + 0.5) / 2.0));
        assert!(approx(results["mrr@1"], 0.0));
        assert!(approx(results["map@1"], 0.0));
    }

    #[test]
    fn test_ndcg() {
        let (qrels, run) = single(&[("a", 3), ("b", 1)], &[("b", 0.9), ("a", 0.8)]);
        let results = evaluate(&qrels, &run, &[Metric::Ndcg], &[2]);
        let dcg = 1.0 + 3.0 / 3f64.log2();
        let idcg = 3.0 + 1.0 / 3f64.log2();
        assert!(approx(results["ndcg@2"], dcg / idcg));

        let (qrels, run) = single(&[("a", 3), ("b", 1)], &[("a", 0.9), ("b", 0.8)]);
        let results = evaluate(&qrels, &run, &[Metric::Ndcg], &[2]);
        assert!(approx(results["ndcg@2"], 1.0));
    }

    #[test]
    fn test_no_relevant_documents() {
        let (qrels, run) = single(&[("a", 0)], &[("a", 0.9)]);
        let results = evaluate(&qrels, &run, &Metric::standard(&[1.0]), &[1]);
        assert!(results.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_mean_over_shared_queries_only() {
        let qrels = Qrels::from([
            ("q1".to_string(), BTreeMap::from([("a".to_string(), 1)])),
            ("q2".to_string(), BTreeMap::from([("b".to_string(), 1)])),
            ("q3".to_string(), BTreeMap::from([("c".to_string(), 1)])),
        ]);
        let run = Run::from([
            ("q1".to_string(), BTreeMap::from([("a".to_string(), 1.0)])),
            ("q2".to_string(), BTreeMap::from([("x".to_string(), 1.0)])),
        ]);
        let results = evaluate(&qrels, &run, &[Metric::HitRate], &[1]);
        assert!(approx(results["hit_rate@1"], 0.5));

        let empty = evaluate(&qrels, &Run::new(), &[Metric::HitRate], &[1]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::FScore(1.0).name_at(3), "f1@3");
        assert_eq!(Metric::FScore(0.5).name_at(3), "f0.5@3");
        assert_eq!(Metric::HitRate.name_at(1000), "hit_rate@1000");
    }
}
