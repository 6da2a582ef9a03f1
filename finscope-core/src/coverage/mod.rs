//! Static coverage and complexity analysis of chapter components
//!
//! A chapter's components live in one directory (see
//! [`CoverageConfig::chapter_dir`](crate::config::CoverageConfig::chapter_dir)).
//! [`CoverageAnalyzer::analyze_chapter`] lists it through a [`SourceProvider`],
//! drops test files and non-source files, scores each remaining component with
//! a [`ComplexityEstimator`] and attaches measured or estimated coverage.

mod analyzer;
pub mod complexity;
pub mod source;
pub mod summary;

pub use analyzer::CoverageAnalyzer;
pub use complexity::{ComplexityEstimator, HeuristicComplexity, MalformedSource};
pub use source::{FsSourceProvider, SourceEntry, SourceProvider};
pub use summary::CoverageSummary;
