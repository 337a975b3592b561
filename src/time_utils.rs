// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for run timestamps and durations.

use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output folder for a run started at `started`: `<root>/<YYYY-MM-DD>/<HH-MM-SS>`.
pub fn run_directory<Tz: TimeZone>(root: &Path, started: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    root.join(started.format("%Y-%m-%d").to_string())
        .join(started.format("%H-%M-%S").to_string())
}

/// Duration in seconds, rounded to milliseconds.
pub fn duration_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round() / 1000.0
}
