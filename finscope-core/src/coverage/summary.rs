//! Measured coverage from an Istanbul `coverage-summary.json`.
//!
//! The summary maps file paths (plus a `total` entry) to per-metric figures:
//!
//! ```json
//! {
//!   "total": { "lines": { "total": 10, "covered": 8, "skipped": 0, "pct": 80 }, ... },
//!   "/app/src/components/chapters/chapter1/Budget.tsx": { "lines": { ... }, ... }
//! }
//! ```

use crate::error::Result;
use crate::types::{CoverageMetrics, CoverageSource};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct SummaryMetric {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    covered: u64,
    /// A number, or the string "Unknown" when there is nothing to cover
    #[serde(default)]
    pct: serde_json::Value,
}

impl SummaryMetric {
    fn percentage(&self) -> f64 {
        if let Some(pct) = self.pct.as_f64() {
            return pct;
        }
        if self.total == 0 {
            100.0
        } else {
            self.covered as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryEntry {
    statements: SummaryMetric,
    branches: SummaryMetric,
    functions: SummaryMetric,
    lines: SummaryMetric,
}

/// Per-file coverage figures loaded from a summary.
#[derive(Debug, Clone, Default)]
pub struct CoverageSummary {
    files: BTreeMap<PathBuf, CoverageMetrics>,
}

impl CoverageSummary {
    /// Parse summary JSON text.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: HashMap<String, SummaryEntry> = serde_json::from_str(json)?;
        let files = raw
            .into_iter()
            .filter(|(key, _)| key != "total")
            .map(|(key, entry)| {
                let metrics = CoverageMetrics {
                    statements: entry.statements.percentage(),
                    branches: entry.branches.percentage(),
                    functions: entry.functions.percentage(),
                    lines: entry.lines.percentage(),
                    source: CoverageSource::External,
                };
                (PathBuf::from(key), metrics)
            })
            .collect();
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Coverage for `path`.
    ///
    /// Summary keys are usually absolute while scanned paths may be relative
    /// to the app root, so a key matches when either path ends with the other.
    /// Without an exact match the key sharing the most trailing components
    /// wins; ties go to the first key in sorted order.
    pub fn lookup(&self, path: &Path) -> Option<CoverageMetrics> {
        if let Some(metrics) = self.files.get(path) {
            return Some(*metrics);
        }

        let mut best: Option<(usize, &CoverageMetrics)> = None;
        for (key, metrics) in &self.files {
            let shared = if key.ends_with(path) {
                path.components().count()
            } else if path.ends_with(key) {
                key.components().count()
            } else {
                continue;
            };
            if best.map_or(true, |(len, _)| shared > len) {
                best = Some((shared, metrics));
            }
        }
        best.map(|(_, metrics)| *metrics)
    }
}
