//! finscope-perf - CLI tool to report on recorded calculator metrics
//!
//! Replays metric samples from a JSON Lines file into a performance analyzer
//! and prints (or writes) a report per subject.

use anyhow::{Context, Result};
use clap::Parser;
use finscope_core::metrics::list_metrics;
use finscope_core::report::write_report;
use finscope_core::{Config, MetricKind, PerformanceAnalyzer};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "finscope-perf")]
#[command(about = "Check calculator performance metrics against thresholds")]
#[command(version)]
struct Args {
    /// JSON Lines file of samples: {"subjectId", "metricName", "value"}
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Only report on this subject
    #[arg(short, long)]
    subject: Option<String>,

    /// List metric kinds without reading samples
    #[arg(long)]
    list_metrics: bool,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One line of the input file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleLine {
    subject_id: String,
    metric_name: MetricKind,
    value: f64,
    /// "increment" adds to a counter; anything else records the value
    #[serde(default)]
    op: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        finscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    if args.list_metrics {
        println!("Available metrics:");
        for descriptor in list_metrics() {
            println!(
                "  - {} ({:?}, {:?}): {}",
                descriptor.kind, descriptor.unit, descriptor.aggregation, descriptor.summary
            );
        }
        return Ok(());
    }

    let Some(input) = args.input.as_ref() else {
        anyhow::bail!("--input is required unless --list-metrics is given");
    };

    let analyzer = PerformanceAnalyzer::new(&config.performance);
    let replayed = replay(&analyzer, input)?;
    tracing::info!(samples = replayed, input = %input.display(), "Replayed samples");

    let subjects = match args.subject {
        Some(ref subject) => vec![subject.clone()],
        None => analyzer.subjects(),
    };

    if subjects.is_empty() {
        println!("No samples found in {}.", input.display());
        return Ok(());
    }

    let text = if args.format == "json" {
        json_report(&analyzer, &subjects)?
    } else {
        subjects
            .iter()
            .map(|s| analyzer.generate_performance_report(s))
            .collect::<Vec<_>>()
            .join("\n")
    };

    match args.output {
        Some(ref path) => {
            write_report(path, &text).context("failed to write report")?;
            println!("Report for {} subject(s) written to {}", subjects.len(), path.display());
        }
        None => println!("{}", text),
    }

    Ok(())
}

/// Feed every sample in `path` to `analyzer`, returning the sample count.
fn replay(analyzer: &PerformanceAnalyzer, path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut count = 0;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let sample: SampleLine = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid sample", path.display(), idx + 1))?;

        let result = if sample.op.as_deref() == Some("increment") {
            analyzer
                .increment_by(&sample.subject_id, sample.metric_name, sample.value)
                .map(|_| ())
        } else {
            analyzer.record_metric(&sample.subject_id, sample.metric_name, sample.value)
        };
        result.with_context(|| format!("{}:{}: sample rejected", path.display(), idx + 1))?;
        count += 1;
    }

    Ok(count)
}

fn json_report(analyzer: &PerformanceAnalyzer, subjects: &[String]) -> Result<String> {
    let output: Vec<_> = subjects
        .iter()
        .map(|subject| {
            let analysis = analyzer.analyze_performance(subject);
            serde_json::json!({
                "subject": subject,
                "metrics": analyzer.get_latest_metrics(subject),
                "thresholds": analyzer.effective_thresholds(subject),
                "issues": analysis.issues,
                "recommendations": analysis.recommendations,
            })
        })
        .collect();

    Ok(serde_json::to_string_pretty(&output)?)
}
