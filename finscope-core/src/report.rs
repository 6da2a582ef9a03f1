//! Text reports for both analyzers
//!
//! Reports are Markdown so they read well in a terminal and when written to
//! a file by the CLI scripts. Empty sections are spelled out ("No issues
//! detected") rather than omitted, so every section header is always present.

use crate::error::Result;
use crate::evaluate::ThresholdEvaluator;
use crate::metrics::MetricSnapshot;
use crate::types::{
    AnalysisResult, ChapterCoverage, CoverageMetric, CoverageThresholds, MetricKind, ThresholdSet,
};
use chrono::{DateTime, Utc};
use std::path::Path;

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn bullet_list(lines: &mut Vec<String>, items: &[String], empty: &str) {
    if items.is_empty() {
        lines.push(empty.to_string());
    } else {
        lines.extend(items.iter().map(|item| format!("- {}", item)));
    }
}

/// Performance report for one subject.
///
/// Always contains the "Performance Report", "Metrics:", "Issues:" and
/// "Recommendations:" sections.
pub fn performance_report(
    subject: &str,
    snapshot: Option<&MetricSnapshot>,
    thresholds: &ThresholdSet,
    analysis: &AnalysisResult,
) -> String {
    let mut lines = vec![
        format!("# Performance Report: {}", subject),
        String::new(),
        format!("Generated: {}", timestamp(Utc::now())),
        String::new(),
        "## Metrics:".to_string(),
        String::new(),
    ];

    match snapshot {
        Some(snapshot) if !snapshot.values.is_empty() => {
            for kind in MetricKind::ALL {
                if let Some(value) = snapshot.get(kind) {
                    lines.push(format!("- {}: {}", kind, kind.unit().format_value(value)));
                }
            }
            if let Some(rate) = snapshot.cache_hit_rate() {
                lines.push(format!("- cacheHitRate: {:.1}%", rate * 100.0));
            }
            lines.push(format!("- lastUpdated: {}", timestamp(snapshot.updated_at)));
        }
        _ => lines.push("No metrics recorded".to_string()),
    }

    lines.push(String::new());
    lines.push("## Thresholds".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- maxCalculationTime: {}",
        MetricKind::CalculationTime
            .unit()
            .format_value(thresholds.max_calculation_time_ms)
    ));
    lines.push(format!(
        "- maxRenderTime: {}",
        MetricKind::RenderTime
            .unit()
            .format_value(thresholds.max_render_time_ms)
    ));
    lines.push(format!(
        "- maxMemoryUsage: {}",
        MetricKind::MemoryUsage
            .unit()
            .format_value(thresholds.max_memory_bytes)
    ));
    lines.push(format!(
        "- maxRecomputeCount: {}",
        MetricKind::RecomputeCount
            .unit()
            .format_value(thresholds.max_recompute_count)
    ));
    lines.push(format!(
        "- minCacheHitRate: {:.0}%",
        thresholds.min_cache_hit_rate * 100.0
    ));

    lines.push(String::new());
    lines.push("## Issues:".to_string());
    lines.push(String::new());
    bullet_list(&mut lines, &analysis.issues, "No issues detected");

    lines.push(String::new());
    lines.push("## Recommendations:".to_string());
    lines.push(String::new());
    bullet_list(&mut lines, &analysis.recommendations, "No recommendations");

    lines.push(String::new());
    lines.join("\n")
}

/// Coverage report for one chapter.
///
/// `coverage` is `None` when the chapter was never analyzed; the report then
/// says "No coverage data available" instead of listing sections.
pub fn coverage_report(
    chapter: u32,
    coverage: Option<&ChapterCoverage>,
    thresholds: &CoverageThresholds,
    critical_complexity: u32,
) -> String {
    let mut lines = vec![
        format!("# Test Coverage Report for Chapter {}", chapter),
        String::new(),
    ];

    let Some(coverage) = coverage else {
        lines.push(format!(
            "No coverage data available for chapter {}. Run the chapter analysis first.",
            chapter
        ));
        lines.push(String::new());
        return lines.join("\n");
    };

    let aggregate = coverage.aggregate();
    lines.push(format!("Analyzed: {}", timestamp(coverage.analyzed_at)));
    lines.push(String::new());

    lines.push("## Aggregate Metrics".to_string());
    lines.push(String::new());
    lines.push("| Metric | Coverage | Threshold |".to_string());
    lines.push("|--------|----------|-----------|".to_string());
    for metric in CoverageMetric::ALL {
        let value = match metric {
            CoverageMetric::Statements => aggregate.statements,
            CoverageMetric::Branches => aggregate.branches,
            CoverageMetric::Functions => aggregate.functions,
            CoverageMetric::Lines => aggregate.lines,
        };
        lines.push(format!(
            "| {} | {:.1}% | {:.0}% |",
            metric,
            value,
            thresholds.get(metric)
        ));
    }
    lines.push(String::new());
    lines.push(format!("- Components: {}", coverage.components.len()));
    lines.push(format!("- Lines of code: {}", aggregate.total_lines_of_code));
    lines.push(format!(
        "- Average complexity: {:.1} (max {})",
        aggregate.average_complexity, aggregate.max_complexity
    ));

    lines.push(String::new());
    lines.push("## Critical Paths".to_string());
    lines.push(String::new());
    let evaluator = ThresholdEvaluator::new();
    let critical: Vec<String> = coverage
        .components
        .iter()
        .filter(|c| evaluator.is_critical(c, critical_complexity))
        .map(|c| {
            format!(
                "{} (complexity {}) in {}",
                c.component_name,
                c.complexity,
                c.file_path.display()
            )
        })
        .collect();
    bullet_list(
        &mut lines,
        &critical,
        &format!("No components above complexity {}", critical_complexity),
    );

    lines.push(String::new());
    lines.push("## Recommendations".to_string());
    lines.push(String::new());
    bullet_list(&mut lines, &coverage.recommendations, "No recommendations");

    lines.push(String::new());
    lines.push("## Component Details".to_string());
    lines.push(String::new());
    if coverage.components.is_empty() {
        lines.push("No components found".to_string());
    } else {
        lines.push(
            "| Component | File | Complexity | LOC | Statements | Branches | Functions | Lines | Tested |"
                .to_string(),
        );
        lines.push(
            "|-----------|------|------------|-----|------------|----------|-----------|-------|--------|"
                .to_string(),
        );
        for c in &coverage.components {
            lines.push(format!(
                "| {} | {} | {} | {} | {:.1}% | {:.1}% | {:.1}% | {:.1}% | {} |",
                c.component_name,
                c.file_path.display(),
                c.complexity,
                c.lines_of_code,
                c.coverage.statements,
                c.coverage.branches,
                c.coverage.functions,
                c.coverage.lines,
                if c.has_test { "yes" } else { "no" },
            ));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}

/// Write a generated report to `path`, creating parent directories.
pub fn write_report(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, text)?;
    tracing::info!(path = %path.display(), bytes = text.len(), "Wrote report");
    Ok(())
}
