//! Core domain types for finscope
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Subject** | The key metrics are recorded under (a calculator instance or a source component) |
//! | **Sample** | One recorded observation of a metric for a subject |
//! | **Snapshot** | Latest known value per metric kind for a subject |
//! | **Threshold** | Configurable ceiling or floor that classifies a value as a problem |
//! | **Critical path** | A component complex enough to warrant priority testing |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================
// Metrics
// ============================================

/// Kind of runtime metric recorded for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    CalculationTime,
    RenderTime,
    MemoryUsage,
    RecomputeCount,
    CacheHits,
    CacheMisses,
    Fps,
    InteractionDelay,
}

impl MetricKind {
    /// All metric kinds in display order.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::CalculationTime,
        MetricKind::RenderTime,
        MetricKind::MemoryUsage,
        MetricKind::RecomputeCount,
        MetricKind::CacheHits,
        MetricKind::CacheMisses,
        MetricKind::Fps,
        MetricKind::InteractionDelay,
    ];

    /// Wire name, as used in sample files and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CalculationTime => "calculationTime",
            MetricKind::RenderTime => "renderTime",
            MetricKind::MemoryUsage => "memoryUsage",
            MetricKind::RecomputeCount => "recomputeCount",
            MetricKind::CacheHits => "cacheHits",
            MetricKind::CacheMisses => "cacheMisses",
            MetricKind::Fps => "fps",
            MetricKind::InteractionDelay => "interactionDelay",
        }
    }

    /// How successive samples combine into the snapshot value.
    pub fn aggregation(&self) -> Aggregation {
        crate::metrics::registry::descriptor(*self).aggregation
    }

    /// Unit the value is expressed in.
    pub fn unit(&self) -> MetricUnit {
        crate::metrics::registry::descriptor(*self).unit
    }

    pub fn is_counter(&self) -> bool {
        self.aggregation() == Aggregation::Counter
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        MetricKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| crate::Error::Config(format!("unknown metric name: {}", s)))
    }
}

/// Aggregation rule for a metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Snapshot holds the most recently written value
    LastWrite,
    /// Snapshot holds a cumulative total
    Counter,
}

/// Unit of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Milliseconds,
    Bytes,
    Count,
    FramesPerSecond,
}

impl MetricUnit {
    /// Format a value in this unit for reports.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            MetricUnit::Milliseconds => format!("{:.2}ms", value),
            MetricUnit::Bytes => format!("{:.2}MB", value / BYTES_PER_MB),
            MetricUnit::Count => {
                if value.fract() == 0.0 {
                    format!("{}", value as i64)
                } else {
                    format!("{:.2}", value)
                }
            }
            MetricUnit::FramesPerSecond => format!("{:.1}fps", value),
        }
    }
}

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One recorded observation. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub subject_id: String,
    #[serde(rename = "metricName")]
    pub metric: MetricKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// How the store treats negative or non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePolicy {
    /// Refuse negative and non-finite values
    #[default]
    Reject,
    /// Clamp negatives to zero, refuse non-finite values
    Clamp,
    /// Store every value as given
    PassThrough,
}

// ============================================
// Performance thresholds
// ============================================

/// Effective performance thresholds for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub max_calculation_time_ms: f64,
    pub max_memory_bytes: f64,
    pub max_render_time_ms: f64,
    pub max_recompute_count: f64,
    /// Ratio in `0.0..=1.0`
    pub min_cache_hit_rate: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            max_calculation_time_ms: 100.0,
            max_memory_bytes: 50.0 * BYTES_PER_MB,
            max_render_time_ms: 16.0,
            max_recompute_count: 3.0,
            min_cache_hit_rate: 0.7,
        }
    }
}

impl ThresholdSet {
    /// Apply the fields present in `patch`, keeping all others.
    pub fn apply(&mut self, patch: &ThresholdPatch) {
        if let Some(v) = patch.max_calculation_time_ms {
            self.max_calculation_time_ms = v;
        }
        if let Some(v) = patch.max_memory_bytes {
            self.max_memory_bytes = v;
        }
        if let Some(v) = patch.max_render_time_ms {
            self.max_render_time_ms = v;
        }
        if let Some(v) = patch.max_recompute_count {
            self.max_recompute_count = v;
        }
        if let Some(v) = patch.min_cache_hit_rate {
            self.min_cache_hit_rate = v;
        }
    }

    pub fn merged(mut self, patch: &ThresholdPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// Partial threshold override for a single subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPatch {
    pub max_calculation_time_ms: Option<f64>,
    pub max_memory_bytes: Option<f64>,
    pub max_render_time_ms: Option<f64>,
    pub max_recompute_count: Option<f64>,
    pub min_cache_hit_rate: Option<f64>,
}

/// Issues and remediation advice computed for one subject.
///
/// Recomputed on every request, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.recommendations.is_empty()
    }
}

// ============================================
// Coverage
// ============================================

/// One of the four coverage dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMetric {
    Statements,
    Branches,
    Functions,
    Lines,
}

impl CoverageMetric {
    pub const ALL: [CoverageMetric; 4] = [
        CoverageMetric::Statements,
        CoverageMetric::Branches,
        CoverageMetric::Functions,
        CoverageMetric::Lines,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageMetric::Statements => "statements",
            CoverageMetric::Branches => "branches",
            CoverageMetric::Functions => "functions",
            CoverageMetric::Lines => "lines",
        }
    }
}

impl fmt::Display for CoverageMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a component's coverage figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageSource {
    /// Loaded from a coverage summary produced by the test runner
    External,
    /// Derived from test presence and complexity
    Estimated,
}

/// Coverage percentages (0-100) for one component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub statements: f64,
    pub branches: f64,
    pub functions: f64,
    pub lines: f64,
    pub source: CoverageSource,
}

impl CoverageMetrics {
    pub fn get(&self, metric: CoverageMetric) -> f64 {
        match metric {
            CoverageMetric::Statements => self.statements,
            CoverageMetric::Branches => self.branches,
            CoverageMetric::Functions => self.functions,
            CoverageMetric::Lines => self.lines,
        }
    }
}

/// Global coverage thresholds, percentages in `0.0..=100.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageThresholds {
    pub statements: f64,
    pub branches: f64,
    pub functions: f64,
    pub lines: f64,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            statements: 80.0,
            branches: 80.0,
            functions: 80.0,
            lines: 80.0,
        }
    }
}

impl CoverageThresholds {
    pub fn get(&self, metric: CoverageMetric) -> f64 {
        match metric {
            CoverageMetric::Statements => self.statements,
            CoverageMetric::Branches => self.branches,
            CoverageMetric::Functions => self.functions,
            CoverageMetric::Lines => self.lines,
        }
    }

    pub fn apply(&mut self, patch: &CoverageThresholdPatch) {
        if let Some(v) = patch.statements {
            self.statements = v;
        }
        if let Some(v) = patch.branches {
            self.branches = v;
        }
        if let Some(v) = patch.functions {
            self.functions = v;
        }
        if let Some(v) = patch.lines {
            self.lines = v;
        }
    }
}

/// Partial update for [`CoverageThresholds`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageThresholdPatch {
    pub statements: Option<f64>,
    pub branches: Option<f64>,
    pub functions: Option<f64>,
    pub lines: Option<f64>,
}

/// Static metrics for one source component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentCoverageRecord {
    /// File stem, e.g. `CompoundInterestCalculator`
    pub component_name: String,
    pub file_path: PathBuf,
    /// Estimated cyclomatic complexity, always >= 1
    pub complexity: u32,
    /// Non-blank, non-comment lines
    pub lines_of_code: usize,
    /// Whether a sibling `*.test.*` file exists
    pub has_test: bool,
    pub coverage: CoverageMetrics,
}

/// Aggregate analysis of one chapter's components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterCoverage {
    pub chapter_number: u32,
    pub components: Vec<ComponentCoverageRecord>,
    /// Chapter-relative paths of components whose complexity exceeds the
    /// critical ceiling, e.g. `charts/PieChart.tsx`
    pub critical_paths: Vec<String>,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Chapter-wide averages and totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateCoverage {
    pub statements: f64,
    pub branches: f64,
    pub functions: f64,
    pub lines: f64,
    pub total_lines_of_code: usize,
    pub average_complexity: f64,
    pub max_complexity: u32,
}

impl ChapterCoverage {
    /// Mean coverage per metric, total LOC and complexity figures.
    ///
    /// All values are zero for a chapter without components.
    pub fn aggregate(&self) -> AggregateCoverage {
        let n = self.components.len();
        if n == 0 {
            return AggregateCoverage {
                statements: 0.0,
                branches: 0.0,
                functions: 0.0,
                lines: 0.0,
                total_lines_of_code: 0,
                average_complexity: 0.0,
                max_complexity: 0,
            };
        }

        let mean = |metric: CoverageMetric| {
            self.components
                .iter()
                .map(|c| c.coverage.get(metric))
                .sum::<f64>()
                / n as f64
        };

        AggregateCoverage {
            statements: mean(CoverageMetric::Statements),
            branches: mean(CoverageMetric::Branches),
            functions: mean(CoverageMetric::Functions),
            lines: mean(CoverageMetric::Lines),
            total_lines_of_code: self.components.iter().map(|c| c.lines_of_code).sum(),
            average_complexity: self
                .components
                .iter()
                .map(|c| c.complexity as f64)
                .sum::<f64>()
                / n as f64,
            max_complexity: self
                .components
                .iter()
                .map(|c| c.complexity)
                .max()
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kind_round_trip_names() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
        assert!("latency".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_metric_kind_serde_uses_camel_case() {
        let json = serde_json::to_string(&MetricKind::CacheMisses).unwrap();
        assert_eq!(json, "\"cacheMisses\"");
        let kind: MetricKind = serde_json::from_str("\"interactionDelay\"").unwrap();
        assert_eq!(kind, MetricKind::InteractionDelay);
    }

    #[test]
    fn test_counter_kinds() {
        let counters: Vec<_> = MetricKind::ALL
            .iter()
            .filter(|k| k.is_counter())
            .copied()
            .collect();
        assert_eq!(
            counters,
            vec![
                MetricKind::RecomputeCount,
                MetricKind::CacheHits,
                MetricKind::CacheMisses
            ]
        );
    }

    #[test]
    fn test_threshold_patch_only_touches_given_fields() {
        let patched = ThresholdSet::default().merged(&ThresholdPatch {
            max_calculation_time_ms: Some(50.0),
            ..Default::default()
        });
        assert_eq!(patched.max_calculation_time_ms, 50.0);
        assert_eq!(patched.max_recompute_count, 3.0);
        assert_eq!(patched.min_cache_hit_rate, 0.7);
        assert_eq!(patched.max_memory_bytes, 50.0 * 1024.0 * 1024.0);
    }

    #[test]
    fn test_unit_formatting() {
        assert_eq!(MetricUnit::Milliseconds.format_value(150.0), "150.00ms");
        assert_eq!(
            MetricUnit::Bytes.format_value(75.0 * 1024.0 * 1024.0),
            "75.00MB"
        );
        assert_eq!(MetricUnit::Count.format_value(3.0), "3");
    }

    #[test]
    fn test_aggregate_of_empty_chapter_is_zero() {
        let chapter = ChapterCoverage {
            chapter_number: 4,
            components: vec![],
            critical_paths: vec![],
            recommendations: vec![],
            analyzed_at: Utc::now(),
        };
        let agg = chapter.aggregate();
        assert_eq!(agg.total_lines_of_code, 0);
        assert_eq!(agg.max_complexity, 0);
    }
}
