//! # finscope-core
//!
//! Performance and test coverage monitoring for the calculators and lesson
//! components of a finance education app.
//!
//! This library provides:
//! - A keyed, in-memory metrics store with per-subject snapshots
//! - A performance analyzer with timed measurements and threshold checks
//! - A coverage analyzer that estimates complexity per chapter component
//! - Report formatting for both analyzers
//! - Configuration management and logging infrastructure
//!
//! ## Data flow
//!
//! Both analyzers follow the same pipeline: collect, evaluate, report.
//!
//! - **Performance:** `record_metric` / `start_measurement` / `end_measurement`
//!   append samples to the [`MetricsStore`]; `analyze_performance` checks the
//!   latest snapshot against the subject's [`ThresholdSet`].
//! - **Coverage:** `analyze_chapter` lists a chapter directory through a
//!   [`SourceProvider`], scores each component and caches a
//!   [`ChapterCoverage`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use finscope_core::{MetricKind, PerformanceAnalyzer};
//!
//! let analyzer = PerformanceAnalyzer::shared();
//! analyzer.start_measurement("calc-1", "compound-interest");
//! // ... run the calculation ...
//! analyzer.end_measurement("calc-1", "compound-interest").expect("measurement started");
//! analyzer.increment("calc-1", MetricKind::CacheHits).expect("counter metric");
//!
//! println!("{}", analyzer.generate_performance_report("calc-1"));
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use coverage::{
    ComplexityEstimator, CoverageAnalyzer, FsSourceProvider, HeuristicComplexity, SourceEntry,
    SourceProvider,
};
pub use error::{Error, Result};
pub use metrics::{MetricSnapshot, MetricsStore};
pub use performance::PerformanceAnalyzer;
pub use types::*;

// Public modules
pub mod config;
pub mod coverage;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod metrics;
pub mod performance;
pub mod report;
pub mod types;
