// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! JSON messages exchanged with the retrieval and adaptation services.
//!
//! Field names and enum values follow the protobuf JSON mapping of the
//! `arg_services.cbr.v1beta` package: camelCase fields, enums by name.
//! Responses tolerate missing fields and keep unknown ones for export.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::rules::Rule;

/// A graph document together with its flattened text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedGraph {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub graph: Value,
    #[serde(default)]
    pub text: String,
}

impl AnnotatedGraph {
    /// Drop the embedded graph document, keeping the text.
    pub fn clear_graph(&mut self) {
        self.graph = Value::Null;
    }
}

// ─── NLP ─────────────────────────────────────────────────────

/// Named NLP configurations selectable with `nlp_config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NlpPreset {
    /// spaCy `en_core_web_lg` vectors, cosine similarity
    #[default]
    #[serde(alias = "default")]
    Default,
    /// Sentence transformer tuned for question answering
    #[serde(alias = "strf")]
    Strf,
    /// OpenAI embeddings
    #[serde(alias = "openai")]
    Openai,
    /// spaCy transformer pipeline
    #[serde(alias = "trf")]
    Trf,
    /// Sentence transformer tuned for semantic similarity
    #[serde(alias = "sbert")]
    Sbert,
}

impl NlpPreset {
    /// Build the wire configuration for this preset.
    pub fn to_nlp_config(self, language: &str) -> NlpConfig {
        let mut config = NlpConfig {
            language: language.to_string(),
            ..Default::default()
        };

        match self {
            NlpPreset::Default => {
                config.spacy_model = Some("en_core_web_lg".to_string());
                config.similarity_method = Some(SimilarityMethod::Cosine);
            }
            NlpPreset::Strf => {
                config.similarity_method = Some(SimilarityMethod::Cosine);
                config.embedding_models = vec![EmbeddingModel {
                    model_type: EmbeddingType::SentenceTransformers,
                    model_name: "multi-qa-MiniLM-L6-cos-v1".to_string(),
                    pooling_type: Pooling::Mean,
                }];
            }
            NlpPreset::Openai => {
                config.similarity_method = Some(SimilarityMethod::Cosine);
                config.embedding_models = vec![EmbeddingModel {
                    model_type: EmbeddingType::Openai,
                    model_name: "text-embedding-ada-002".to_string(),
                    pooling_type: Pooling::Mean,
                }];
            }
            NlpPreset::Trf => {
                config.spacy_model = Some("en_core_web_trf".to_string());
            }
            NlpPreset::Sbert => {
                config.embedding_models = vec![EmbeddingModel {
                    model_type: EmbeddingType::SentenceTransformers,
                    model_name: "stsb-mpnet-base-v2".to_string(),
                    pooling_type: Pooling::Mean,
                }];
            }
        }

        config
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NlpConfig {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacy_model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding_models: Vec<EmbeddingModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_method: Option<SimilarityMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingModel {
    pub model_type: EmbeddingType,
    pub model_name: String,
    pub pooling_type: Pooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingType {
    #[serde(rename = "EMBEDDING_TYPE_SENTENCE_TRANSFORMERS")]
    SentenceTransformers,
    #[serde(rename = "EMBEDDING_TYPE_OPENAI")]
    Openai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pooling {
    #[serde(rename = "POOLING_MEAN")]
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityMethod {
    #[serde(rename = "SIMILARITY_METHOD_COSINE")]
    Cosine,
}

// ─── Retrieval ───────────────────────────────────────────────

/// How argumentation schemes are compared during retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemeHandling {
    #[serde(alias = "unspecified")]
    Unspecified,
    #[default]
    #[serde(alias = "binary")]
    Binary,
    #[serde(alias = "taxonomy")]
    Taxonomy,
}

impl SchemeHandling {
    pub fn wire_name(self) -> &'static str {
        match self {
            SchemeHandling::Unspecified => "SCHEME_HANDLING_UNSPECIFIED",
            SchemeHandling::Binary => "SCHEME_HANDLING_BINARY",
            SchemeHandling::Taxonomy => "SCHEME_HANDLING_TAXONOMY",
        }
    }
}

/// Structural mapping algorithm with its variant number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingAlgorithm {
    #[default]
    #[serde(alias = "astar1")]
    Astar1,
    #[serde(alias = "astar2")]
    Astar2,
    #[serde(alias = "astar3")]
    Astar3,
    #[serde(alias = "greedy1")]
    Greedy1,
    #[serde(alias = "greedy2")]
    Greedy2,
    #[serde(alias = "isomorphism1")]
    Isomorphism1,
}

impl MappingAlgorithm {
    /// Wire enum name and variant.
    pub fn wire_parts(self) -> (&'static str, u32) {
        match self {
            MappingAlgorithm::Astar1 => ("MAPPING_ALGORITHM_ASTAR", 1),
            MappingAlgorithm::Astar2 => ("MAPPING_ALGORITHM_ASTAR", 2),
            MappingAlgorithm::Astar3 => ("MAPPING_ALGORITHM_ASTAR", 3),
            MappingAlgorithm::Greedy1 => ("MAPPING_ALGORITHM_GREEDY", 1),
            MappingAlgorithm::Greedy2 => ("MAPPING_ALGORITHM_GREEDY", 2),
            MappingAlgorithm::Isomorphism1 => ("MAPPING_ALGORITHM_ISOMORPHISM", 1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub cases: BTreeMap<String, AnnotatedGraph>,
    pub queries: Vec<AnnotatedGraph>,
    pub limit: u32,
    pub semantic_retrieval: bool,
    pub structural_retrieval: bool,
    pub nlp_config: NlpConfig,
    pub scheme_handling: &'static str,
    pub mapping_algorithm: &'static str,
    pub mapping_algorithm_variant: u32,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    #[serde(default)]
    pub query_responses: Vec<QueryResponse>,
}

/// Rankings computed for one query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub semantic_ranking: Vec<RetrievedCase>,
    #[serde(default)]
    pub structural_ranking: Vec<RetrievedCase>,
}

impl QueryResponse {
    /// The most refined ranking: structural if present, else semantic.
    pub fn final_ranking(&self) -> &[RetrievedCase] {
        if self.structural_ranking.is_empty() {
            &self.semantic_ranking
        } else {
            &self.structural_ranking
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedCase {
    pub id: String,
    #[serde(default)]
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<AnnotatedGraph>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─── Adaptation ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptRequest {
    pub cases: BTreeMap<String, AdaptedCaseRequest>,
    pub query: AnnotatedGraph,
    pub nlp_config: NlpConfig,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptedCaseRequest {
    pub case: AnnotatedGraph,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptResponse {
    #[serde(default)]
    pub cases: BTreeMap<String, AdaptedCaseResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptedCaseResponse {
    #[serde(default)]
    pub case: AnnotatedGraph,
    #[serde(default)]
    pub applied_rules: Vec<Rule>,
    #[serde(default)]
    pub discarded_rules: Vec<Rule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_preset_wire_format() {
        let config = NlpPreset::Default.to_nlp_config("de");
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "language": "de",
                "spacyModel": "en_core_web_lg",
                "similarityMethod": "SIMILARITY_METHOD_COSINE"
            })
        );
    }

    #[test]
    fn test_strf_preset_has_embedding_model() {
        let value = serde_json::to_value(NlpPreset::Strf.to_nlp_config("en")).unwrap();
        assert_eq!(
            value["embeddingModels"][0],
            json!({
                "modelType": "EMBEDDING_TYPE_SENTENCE_TRANSFORMERS",
                "modelName": "multi-qa-MiniLM-L6-cos-v1",
                "poolingType": "POOLING_MEAN"
            })
        );
    }

    #[test]
    fn test_mapping_algorithm_parts() {
        assert_eq!(
            MappingAlgorithm::Astar3.wire_parts(),
            ("MAPPING_ALGORITHM_ASTAR", 3)
        );
        assert_eq!(
            MappingAlgorithm::Isomorphism1.wire_parts(),
            ("MAPPING_ALGORITHM_ISOMORPHISM", 1)
        );
    }

    #[test]
    fn test_query_response_prefers_structural_ranking() {
        let response: QueryResponse = serde_json::from_value(json!({
            "semanticRanking": [{"id": "a", "similarity": 0.9}],
            "structuralRanking": [{"id": "b", "similarity": 0.5}]
        }))
        .unwrap();
        assert_eq!(response.final_ranking()[0].id, "b");

        let semantic_only: QueryResponse = serde_json::from_value(json!({
            "semanticRanking": [{"id": "a", "similarity": 0.9}]
        }))
        .unwrap();
        assert_eq!(semantic_only.final_ranking()[0].id, "a");
    }

    #[test]
    fn test_retrieved_case_keeps_unknown_fields() {
        let case: RetrievedCase = serde_json::from_value(json!({
            "id": "microtexts/a",
            "similarity": 0.42,
            "mapping": {"nodes": []}
        }))
        .unwrap();
        assert_eq!(case.extra["mapping"], json!({"nodes": []}));
        assert!(case.graph.is_none());
    }

    #[test]
    fn test_adapt_response_with_unspecified_pos() {
        let response: AdaptResponse = serde_json::from_value(json!({
            "cases": {
                "microtexts/a": {
                    "appliedRules": [{
                        "source": {"lemma": "power", "score": 0.7},
                        "target": {"lemma": "energy", "pos": "POS_NOUN"}
                    }]
                }
            }
        }))
        .unwrap();
        let rule = &response.cases["microtexts/a"].applied_rules[0];
        assert_eq!(rule.source.pos, crate::models::rules::Pos::Unspecified);
        assert_eq!(rule.target.pos, crate::models::rules::Pos::Noun);
    }

    #[test]
    fn test_empty_response_defaults() {
        let response: RetrieveResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.query_responses.is_empty());
    }
}
