// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Adaptation rules: concept pairs like `"argument/noun" -> "claim/noun"`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Part of speech of a concept.
///
/// Services omit the field for unspecified concepts, so it defaults to
/// [`Pos::Unspecified`]. Benchmark rules always name a real one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PosRepr")]
pub enum Pos {
    #[default]
    #[serde(rename = "POS_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "POS_NOUN")]
    Noun,
    #[serde(rename = "POS_VERB")]
    Verb,
    #[serde(rename = "POS_ADJECTIVE")]
    Adjective,
    #[serde(rename = "POS_ADVERB")]
    Adverb,
}

impl Pos {
    /// Parse the short form used in benchmark files (`noun`, `verb`, ...).
    pub fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "noun" => Some(Pos::Noun),
            "verb" => Some(Pos::Verb),
            "adjective" => Some(Pos::Adjective),
            "adverb" => Some(Pos::Adverb),
            _ => None,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Pos::Unspecified => "unspecified",
            Pos::Noun => "noun",
            Pos::Verb => "verb",
            Pos::Adjective => "adjective",
            Pos::Adverb => "adverb",
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Services may send enum names or their numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum PosRepr {
    Name(String),
    Number(i64),
}

impl TryFrom<PosRepr> for Pos {
    type Error = String;

    fn try_from(repr: PosRepr) -> Result<Self, Self::Error> {
        match repr {
            PosRepr::Name(name) => match name.as_str() {
                "POS_UNSPECIFIED" => Ok(Pos::Unspecified),
                "POS_NOUN" => Ok(Pos::Noun),
                "POS_VERB" => Ok(Pos::Verb),
                "POS_ADJECTIVE" => Ok(Pos::Adjective),
                "POS_ADVERB" => Ok(Pos::Adverb),
                other => Err(format!("unknown part of speech '{}'", other)),
            },
            PosRepr::Number(0) => Ok(Pos::Unspecified),
            PosRepr::Number(1) => Ok(Pos::Noun),
            PosRepr::Number(2) => Ok(Pos::Verb),
            PosRepr::Number(3) => Ok(Pos::Adjective),
            PosRepr::Number(4) => Ok(Pos::Adverb),
            PosRepr::Number(other) => Err(format!("unknown part of speech {}", other)),
        }
    }
}

/// A lemma with its part of speech; `score` is only set by the services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub lemma: String,
    #[serde(default)]
    pub pos: Pos,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub score: f64,
}

fn is_zero(score: &f64) -> bool {
    *score == 0.0
}

impl Concept {
    /// Parse `"lemma/pos"`, ignoring case and surrounding whitespace.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let normalized = text.trim().to_lowercase();
        let (lemma, pos) = normalized
            .split_once('/')
            .filter(|(lemma, pos)| !lemma.is_empty() && !pos.contains('/'))
            .ok_or_else(|| RuleError::Malformed(text.to_string()))?;

        let pos = Pos::from_short_name(pos).ok_or_else(|| RuleError::UnknownPos {
            concept: text.to_string(),
            pos: pos.to_string(),
        })?;

        Ok(Self {
            lemma: lemma.to_string(),
            pos,
            score: 0.0,
        })
    }

    /// Key used to match user and system concepts (`lemma/pos`).
    pub fn key(&self) -> String {
        format!("{}/{}", self.lemma, self.pos)
    }
}

/// Replace the `source` concept by the `target` concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub source: Concept,
    pub target: Concept,
}

/// Ordered benchmark rules as written by the user.
///
/// Accepts both `{"source": "target", ...}` and
/// `[{"source": ..., "target": ...}, ...]`; the order is the user's ranking.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RulesRepr")]
pub struct AdaptationRules(pub Vec<(String, String)>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RulesRepr {
    Map(Map<String, Value>),
    List(Vec<RulePair>),
}

#[derive(Deserialize)]
struct RulePair {
    source: String,
    target: String,
}

impl TryFrom<RulesRepr> for AdaptationRules {
    type Error = String;

    fn try_from(repr: RulesRepr) -> Result<Self, Self::Error> {
        match repr {
            RulesRepr::Map(map) => map
                .into_iter()
                .map(|(source, target)| match target {
                    Value::String(target) => Ok((source, target)),
                    other => Err(format!("rule target for '{}' must be a string, got {}", source, other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AdaptationRules),
            RulesRepr::List(pairs) => Ok(AdaptationRules(
                pairs.into_iter().map(|p| (p.source, p.target)).collect(),
            )),
        }
    }
}

impl AdaptationRules {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse benchmark rules in their original order.
pub fn parse_rules(rules: &AdaptationRules) -> Result<Vec<Rule>, RuleError> {
    rules
        .0
        .iter()
        .map(|(source, target)| {
            Ok(Rule {
                source: Concept::parse(source)?,
                target: Concept::parse(target)?,
            })
        })
        .collect()
}

/// Errors from rule parsing.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("expected 'lemma/pos', got '{0}'")]
    Malformed(String),

    #[error("unknown part of speech '{pos}' in '{concept}'")]
    UnknownPos { concept: String, pos: String },
}
