//! finscope-coverage - CLI tool to report on chapter test coverage
//!
//! Scans chapter component directories, estimates complexity and coverage,
//! and prints (or writes) a report per chapter.

use anyhow::{Context, Result};
use clap::Parser;
use finscope_core::report::write_report;
use finscope_core::{Config, CoverageAnalyzer, FsSourceProvider};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "finscope-coverage")]
#[command(about = "Analyze test coverage and complexity of chapter components")]
#[command(version)]
struct Args {
    /// Chapter number to analyze (repeatable)
    #[arg(short, long = "chapter", required = true)]
    chapters: Vec<u32>,

    /// Directory containing the chapter directories
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Istanbul coverage-summary.json with measured coverage
    #[arg(long)]
    coverage_summary: Option<PathBuf>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        finscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let mut coverage_config = config.coverage;
    if let Some(root) = args.root {
        coverage_config.components_root = root;
    }
    if let Some(summary) = args.coverage_summary {
        coverage_config.coverage_summary = Some(summary);
    }

    let analyzer = CoverageAnalyzer::new(Box::new(FsSourceProvider::new()), coverage_config);

    for &chapter in &args.chapters {
        analyzer
            .analyze_chapter(chapter)
            .with_context(|| format!("failed to analyze chapter {}", chapter))?;
    }

    let text = if args.format == "json" {
        let output: Vec<_> = args
            .chapters
            .iter()
            .filter_map(|&chapter| analyzer.get_chapter_coverage(chapter))
            .map(|coverage| {
                serde_json::json!({
                    "aggregate": coverage.aggregate(),
                    "chapter": coverage,
                })
            })
            .collect();
        serde_json::to_string_pretty(&output)?
    } else {
        args.chapters
            .iter()
            .map(|&chapter| analyzer.generate_coverage_report(chapter))
            .collect::<Vec<_>>()
            .join("\n")
    };

    match args.output {
        Some(ref path) => {
            write_report(path, &text).context("failed to write report")?;
            println!(
                "Report for {} chapter(s) written to {}",
                args.chapters.len(),
                path.display()
            );
        }
        None => println!("{}", text),
    }

    Ok(())
}
