// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Export of individual and aggregated run results.
//!
//! Individual results go to one folder per request:
//! `mac.csv`, `fac.csv` (ranking rows), `retrieval.json`, `adaptation.json`
//! and `eval.csv` (`stage,metric,value`). Aggregated results go to
//! `evaluation.json` next to them.

use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::wire::RetrievedCase;
use crate::services::evaluation::Metrics;
use crate::time_utils::duration_secs;

pub const RETRIEVAL_STAGE: &str = "retrieval";
pub const ADAPTATION_STAGE: &str = "adaptation";

const RANKING_HEADER: [&str; 4] = ["name", "rank", "similarity", "text"];
const EVAL_HEADER: [&str; 3] = ["stage", "metric", "value"];

/// One line of a ranking export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub name: String,
    pub rank: usize,
    pub similarity: f64,
    pub text: String,
}

/// Everything produced for one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub id: String,
    pub mac: Vec<RankingRow>,
    pub fac: Vec<RankingRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptation: Option<Value>,
    /// Metrics per stage
    pub evaluation: BTreeMap<String, Metrics>,
}

/// Aggregated metrics per stage.
pub type Aggregated = BTreeMap<String, Metrics>;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AggregatedExport<'a> {
    results: &'a Aggregated,
    duration: f64,
    parameters: &'a Config,
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Rows for a ranking, best first.
pub fn ranking_rows(ranking: &[RetrievedCase]) -> Vec<RankingRow> {
    ranking
        .iter()
        .enumerate()
        .map(|(i, case)| RankingRow {
            name: case.id.clone(),
            rank: i + 1,
            similarity: round3(case.similarity),
            text: case
                .graph
                .as_ref()
                .map(|graph| graph.text.clone())
                .unwrap_or_default(),
        })
        .collect()
}

/// Quote a CSV field if it holds a delimiter, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Write a header and rows as CSV with `\r\n` line endings.
pub fn write_csv<W, R>(mut writer: W, header: &[&str], rows: R) -> io::Result<()>
where
    W: Write,
    R: IntoIterator<Item = Vec<String>>,
{
    let header: Vec<Cow<str>> = header.iter().map(|field| csv_field(field)).collect();
    write!(writer, "{}\r\n", header.join(","))?;

    for row in rows {
        let fields: Vec<Cow<str>> = row.iter().map(|field| csv_field(field)).collect();
        write!(writer, "{}\r\n", fields.join(","))?;
    }

    writer.flush()
}

fn write_csv_file<R>(path: &Path, header: &[&str], rows: R) -> Result<()>
where
    R: IntoIterator<Item = Vec<String>>,
{
    let file = fs::File::create(path)?;
    write_csv(io::BufWriter::new(file), header, rows)?;
    Ok(())
}

fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON serialization error: {}", e)))?;
    fs::write(path, json)?;
    Ok(())
}

/// Write the files of one request below `output/<request id>/`.
/// Empty rankings and missing stages produce no file.
pub fn export_query(output: &Path, result: &QueryResult) -> Result<PathBuf> {
    let folder = output.join(&result.id);
    fs::create_dir_all(&folder)?;

    for (name, rows) in [("mac.csv", &result.mac), ("fac.csv", &result.fac)] {
        if rows.is_empty() {
            continue;
        }
        write_csv_file(
            &folder.join(name),
            &RANKING_HEADER,
            rows.iter().map(|row| {
                vec![
                    row.name.clone(),
                    row.rank.to_string(),
                    row.similarity.to_string(),
                    row.text.clone(),
                ]
            }),
        )?;
    }

    if let Some(retrieval) = &result.retrieval {
        write_json_file(&folder.join("retrieval.json"), retrieval)?;
    }
    if let Some(adaptation) = &result.adaptation {
        write_json_file(&folder.join("adaptation.json"), adaptation)?;
    }

    if !result.evaluation.is_empty() {
        write_csv_file(
            &folder.join("eval.csv"),
            &EVAL_HEADER,
            result.evaluation.iter().flat_map(|(stage, metrics)| {
                metrics
                    .iter()
                    .map(move |(metric, value)| {
                        vec![stage.clone(), metric.clone(), value.to_string()]
                    })
            }),
        )?;
    }

    tracing::debug!(request = %result.id, path = %folder.display(), "Exported individual results");
    Ok(folder)
}

/// Mean of every metric per stage over the queries that reported it,
/// rounded to 3 decimals.
pub fn aggregate(results: &[QueryResult]) -> Aggregated {
    let mut sums: BTreeMap<&str, BTreeMap<&str, (f64, usize)>> = BTreeMap::new();

    for result in results {
        for (stage, metrics) in &result.evaluation {
            let stage_sums = sums.entry(stage.as_str()).or_default();
            for (metric, value) in metrics {
                let entry = stage_sums.entry(metric.as_str()).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(stage, metrics)| {
            let means = metrics
                .into_iter()
                .map(|(metric, (sum, count))| (metric.to_string(), round3(sum / count as f64)))
                .collect();
            (stage.to_string(), means)
        })
        .collect()
}

/// Write `evaluation.json` with the aggregated results, the run duration
/// and the resolved configuration.
pub fn export_aggregated(
    output: &Path,
    aggregated: &Aggregated,
    duration: Duration,
    parameters: &Config,
) -> Result<PathBuf> {
    fs::create_dir_all(output)?;
    let path = output.join("evaluation.json");

    write_json_file(
        &path,
        &AggregatedExport {
            results: aggregated,
            duration: duration_secs(duration),
            parameters,
        },
    )?;

    tracing::info!(path = %path.display(), "Exported aggregated results");
    Ok(path)
}
