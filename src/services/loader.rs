// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Case base and request discovery.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::PathConfig;
use crate::error::{AppError, Result};
use crate::models::graph::Graph;

/// A loaded request: its id (relative path without extension) and query graph.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: String,
    pub path: PathBuf,
    pub graph: Graph,
}

/// Load all cases. Ids are relative to the parent of the case folder and
/// have no extension (`microtexts/nodeset6362`), matching benchmark keys.
pub fn load_cases(paths: &PathConfig) -> Result<BTreeMap<String, Graph>> {
    let id_root = paths.cases.parent().unwrap_or_else(|| Path::new(""));
    let files = discover(&paths.cases, &paths.cases_pattern)?;

    let mut cases = BTreeMap::new();
    for file in files {
        let id = file_id(&file, id_root)?;
        let graph = Graph::load_from_file(&file).map_err(|source| AppError::Graph {
            path: file.clone(),
            source,
        })?;
        cases.insert(id, graph);
    }

    tracing::info!(
        count = cases.len(),
        path = %paths.cases.display(),
        "Loaded case base"
    );
    Ok(cases)
}

/// Load all requests, ordered by id.
pub fn load_requests(paths: &PathConfig) -> Result<Vec<Request>> {
    let files = discover(&paths.requests, &paths.requests_pattern)?;

    let requests = files
        .into_iter()
        .map(|file| {
            let id = file_id(&file, &paths.requests)?;
            let graph = Graph::load_from_file(&file).map_err(|source| AppError::Graph {
                path: file.clone(),
                source,
            })?;
            Ok(Request {
                id,
                path: file,
                graph,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if requests.is_empty() {
        return Err(AppError::BadRequest(format!(
            "no requests matching '{}' in {}",
            paths.requests_pattern,
            paths.requests.display()
        )));
    }

    tracing::info!(
        count = requests.len(),
        path = %paths.requests.display(),
        "Loaded requests"
    );
    Ok(requests)
}

/// Files below `root` whose relative path matches the glob `pattern`, sorted.
pub fn discover(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AppError::BadRequest(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let matcher = glob_to_regex(pattern)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| AppError::Internal(anyhow::anyhow!("Walk error: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_slash_path(entry.path(), root)?;
        if matcher.is_match(&relative) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Translate a glob (`*`, `?`, `**/`) to an anchored regex over `/`-separated paths.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex = String::from("^");
    let segments: Vec<&str> = pattern.split('/').collect();

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if *segment == "**" {
            regex.push_str(if last { ".*" } else { "(?:[^/]+/)*" });
            continue;
        }

        for c in segment.chars() {
            match c {
                '*' => regex.push_str("[^/]*"),
                '?' => regex.push_str("[^/]"),
                other => regex.push_str(&regex::escape(&other.to_string())),
            }
        }
        if !last {
            regex.push('/');
        }
    }
    regex.push('$');

    Regex::new(&regex)
        .map_err(|e| AppError::BadRequest(format!("invalid pattern '{}': {}", pattern, e)))
}

fn relative_slash_path(path: &Path, root: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("{} outside {}: {}", path.display(), root.display(), e))
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Relative path without extension, `/`-separated.
fn file_id(path: &Path, root: &Path) -> Result<String> {
    let relative = relative_slash_path(&path.with_extension(""), root)?;
    Ok(relative)
}
