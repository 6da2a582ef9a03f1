//! Runtime performance monitoring
//!
//! Calculators report timings and counters to a [`PerformanceAnalyzer`],
//! either through bracketed measurements:
//!
//! ```rust
//! use finscope_core::PerformanceAnalyzer;
//! use finscope_core::config::PerformanceConfig;
//!
//! let analyzer = PerformanceAnalyzer::new(&PerformanceConfig::default());
//! analyzer.start_measurement("loan-calc", "amortization");
//! analyzer.end_measurement("loan-calc", "amortization").unwrap();
//! assert!(analyzer.get_latest_metrics("loan-calc").is_some());
//! ```
//!
//! or by writing values directly with `record_metric` / `increment`.

mod analyzer;

pub use analyzer::PerformanceAnalyzer;
