//! Threshold evaluation for both analyzers
//!
//! Performance rules compare a subject's latest [`MetricSnapshot`] against its
//! effective [`ThresholdSet`]. Every rule is checked independently, so one
//! evaluation reports all violations at once. Comparisons are strict: a value
//! equal to its ceiling (or floor) is not an issue.
//!
//! Coverage rules turn a [`ComponentCoverageRecord`] into recommendations
//! against the global [`CoverageThresholds`].

use crate::metrics::MetricSnapshot;
use crate::types::{
    AnalysisResult, ComponentCoverageRecord, CoverageMetric, CoverageThresholds, MetricKind,
    MetricUnit, ThresholdSet,
};

/// Observed value and the limit it crossed, both formatted for display.
struct Violation {
    observed: String,
    limit: String,
}

struct PerformanceRule {
    issue: &'static str,
    recommendation: &'static str,
    check: fn(&MetricSnapshot, &ThresholdSet) -> Option<Violation>,
}

fn exceeds(
    snapshot: &MetricSnapshot,
    kind: MetricKind,
    max: f64,
) -> Option<Violation> {
    let value = snapshot.get(kind)?;
    if value > max {
        let unit = kind.unit();
        Some(Violation {
            observed: unit.format_value(value),
            limit: unit.format_value(max),
        })
    } else {
        None
    }
}

const PERFORMANCE_RULES: &[PerformanceRule] = &[
    PerformanceRule {
        issue: "High calculation time",
        recommendation: "Optimize the calculation or memoize intermediate results",
        check: |s, t| exceeds(s, MetricKind::CalculationTime, t.max_calculation_time_ms),
    },
    PerformanceRule {
        issue: "High memory usage",
        recommendation: "Review retained references and large allocations",
        check: |s, t| exceeds(s, MetricKind::MemoryUsage, t.max_memory_bytes),
    },
    PerformanceRule {
        issue: "High recompute count",
        recommendation: "Add memoization and reduce dependency churn between inputs",
        check: |s, t| exceeds(s, MetricKind::RecomputeCount, t.max_recompute_count),
    },
    PerformanceRule {
        issue: "Low cache hit rate",
        recommendation: "Review the cache key strategy so equivalent inputs share entries",
        check: |s, t| {
            let rate = s.cache_hit_rate()?;
            if rate < t.min_cache_hit_rate {
                Some(Violation {
                    observed: format!("{:.0}%", rate * 100.0),
                    limit: format!("{:.0}%", t.min_cache_hit_rate * 100.0),
                })
            } else {
                None
            }
        },
    },
    PerformanceRule {
        issue: "High render time",
        recommendation: "Reduce render work per frame or defer non-visible updates",
        check: |s, t| exceeds(s, MetricKind::RenderTime, t.max_render_time_ms),
    },
];

/// Stateless evaluator shared by the performance and coverage analyzers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Check a snapshot against thresholds.
    ///
    /// A missing snapshot yields an empty result.
    pub fn evaluate_performance(
        &self,
        snapshot: Option<&MetricSnapshot>,
        thresholds: &ThresholdSet,
    ) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        let Some(snapshot) = snapshot else {
            return result;
        };

        for rule in PERFORMANCE_RULES {
            if let Some(v) = (rule.check)(snapshot, thresholds) {
                result
                    .issues
                    .push(format!("{}: {} (threshold {})", rule.issue, v.observed, v.limit));
                result.recommendations.push(rule.recommendation.to_string());
            }
        }

        result
    }

    /// Whether a component's complexity puts it on a critical path.
    pub fn is_critical(&self, record: &ComponentCoverageRecord, critical_complexity: u32) -> bool {
        record.complexity > critical_complexity
    }

    /// Recommendations for one component.
    ///
    /// One entry per coverage metric strictly below its threshold, followed by
    /// a complexity entry when the component is critical.
    pub fn evaluate_component(
        &self,
        record: &ComponentCoverageRecord,
        thresholds: &CoverageThresholds,
        critical_complexity: u32,
    ) -> Vec<String> {
        let mut recommendations: Vec<String> = CoverageMetric::ALL
            .iter()
            .filter(|m| record.coverage.get(**m) < thresholds.get(**m))
            .map(|m| {
                format!(
                    "Increase {} coverage of {} to meet {}% threshold",
                    m,
                    record.component_name,
                    MetricUnit::Count.format_value(thresholds.get(*m))
                )
            })
            .collect();

        if self.is_critical(record, critical_complexity) {
            recommendations.push(format!("Reduce complexity of {}", record.component_name));
        }

        recommendations
    }
}
