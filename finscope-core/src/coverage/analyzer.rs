//! Per-chapter coverage and complexity analysis.

use super::complexity::{lines_of_code, ComplexityEstimator, HeuristicComplexity, BASE_COMPLEXITY};
use super::source::{walk_files, FsSourceProvider, SourceProvider};
use super::summary::CoverageSummary;
use crate::config::CoverageConfig;
use crate::error::Result;
use crate::evaluate::ThresholdEvaluator;
use crate::report;
use crate::types::{
    ChapterCoverage, ComponentCoverageRecord, CoverageMetric, CoverageMetrics, CoverageSource,
    CoverageThresholdPatch, CoverageThresholds,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static SHARED: OnceLock<Arc<CoverageAnalyzer>> = OnceLock::new();

/// Marker separating a component stem from the rest of a test file name.
const TEST_INFIX: &str = ".test.";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Estimated coverage lost per decision point above the base, per metric.
fn estimate_penalty(metric: CoverageMetric) -> f64 {
    match metric {
        CoverageMetric::Statements => 4.0,
        CoverageMetric::Branches => 8.0,
        CoverageMetric::Functions => 3.0,
        CoverageMetric::Lines => 4.0,
    }
}

/// Coverage guess for a component without measured figures.
///
/// Untested components get zero. Tested ones start at full coverage and
/// lose a fixed amount per decision point.
fn estimate_coverage(complexity: u32, has_test: bool) -> CoverageMetrics {
    let estimate = |metric: CoverageMetric| {
        if !has_test {
            return 0.0;
        }
        let extra = complexity.saturating_sub(BASE_COMPLEXITY) as f64;
        (100.0 - estimate_penalty(metric) * extra).clamp(0.0, 100.0)
    };

    CoverageMetrics {
        statements: estimate(CoverageMetric::Statements),
        branches: estimate(CoverageMetric::Branches),
        functions: estimate(CoverageMetric::Functions),
        lines: estimate(CoverageMetric::Lines),
        source: CoverageSource::Estimated,
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// `path` relative to `dir`, `/`-separated.
fn relative_path(path: &Path, dir: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scans chapter component directories and caches the results.
pub struct CoverageAnalyzer {
    provider: Box<dyn SourceProvider>,
    estimator: Box<dyn ComplexityEstimator>,
    evaluator: ThresholdEvaluator,
    config: CoverageConfig,
    exclude: Vec<glob::Pattern>,
    thresholds: Mutex<CoverageThresholds>,
    chapters: Mutex<HashMap<u32, ChapterCoverage>>,
}

impl CoverageAnalyzer {
    /// Create an analyzer using the heuristic complexity estimator.
    pub fn new(provider: Box<dyn SourceProvider>, config: CoverageConfig) -> Self {
        Self::with_estimator(provider, Box::new(HeuristicComplexity::new()), config)
    }

    pub fn with_estimator(
        provider: Box<dyn SourceProvider>,
        estimator: Box<dyn ComplexityEstimator>,
        config: CoverageConfig,
    ) -> Self {
        let exclude = config
            .exclude_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            provider,
            estimator,
            evaluator: ThresholdEvaluator::new(),
            thresholds: Mutex::new(config.thresholds),
            exclude,
            config,
            chapters: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide analyzer, reading from the local filesystem with
    /// default configuration. Every call returns the same `Arc`.
    pub fn shared() -> Arc<CoverageAnalyzer> {
        SHARED
            .get_or_init(|| {
                tracing::debug!("Creating shared coverage analyzer");
                Arc::new(CoverageAnalyzer::new(
                    Box::new(FsSourceProvider::new()),
                    CoverageConfig::default(),
                ))
            })
            .clone()
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Coverage thresholds currently in effect.
    pub fn thresholds(&self) -> CoverageThresholds {
        *lock(&self.thresholds)
    }

    /// Update the global coverage thresholds.
    ///
    /// Applies to later `analyze_chapter` calls; cached chapters keep the
    /// recommendations they were computed with.
    pub fn set_thresholds(&self, patch: &CoverageThresholdPatch) {
        let mut thresholds = lock(&self.thresholds);
        thresholds.apply(patch);
        let current = *thresholds;
        tracing::info!(thresholds = ?current, "Updated coverage thresholds");
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(name))
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.config.source_extensions.iter().any(|s| s == ext))
            .unwrap_or(false)
    }

    fn load_summary(&self) -> Result<Option<CoverageSummary>> {
        match &self.config.coverage_summary {
            Some(path) => {
                let text = self.provider.read_file(path)?;
                Ok(Some(CoverageSummary::parse(&text)?))
            }
            None => Ok(None),
        }
    }

    /// Scan one chapter and cache the result.
    ///
    /// Any listing or read failure fails the whole call and leaves the cache
    /// untouched. Files the estimator cannot parse score the base complexity.
    pub fn analyze_chapter(&self, chapter: u32) -> Result<ChapterCoverage> {
        let dir = self.config.chapter_dir(chapter);
        tracing::info!(chapter, dir = %dir.display(), "Analyzing chapter");

        let summary = self.load_summary()?;
        let files = walk_files(self.provider.as_ref(), &dir)?;

        // (directory, stem) pairs that have a test file beside them
        let tested: HashSet<(PathBuf, String)> = files
            .iter()
            .filter_map(|p| {
                file_name(p)
                    .split_once(TEST_INFIX)
                    .map(|(stem, _)| (parent_dir(p), stem.to_string()))
            })
            .collect();

        let thresholds = self.thresholds();
        let critical_complexity = self.config.critical_complexity;
        let mut components = Vec::new();

        for path in files {
            if self.is_excluded(file_name(&path)) || !self.is_source(&path) {
                continue;
            }
            let source = self.provider.read_file(&path)?;
            components.push(self.score_component(&path, &source, &tested, summary.as_ref()));
        }

        let critical_paths = components
            .iter()
            .filter(|c| self.evaluator.is_critical(c, critical_complexity))
            .map(|c| relative_path(&c.file_path, &dir))
            .collect();
        let recommendations = components
            .iter()
            .flat_map(|c| {
                self.evaluator
                    .evaluate_component(c, &thresholds, critical_complexity)
            })
            .collect();

        let coverage = ChapterCoverage {
            chapter_number: chapter,
            components,
            critical_paths,
            recommendations,
            analyzed_at: Utc::now(),
        };

        tracing::info!(
            chapter,
            components = coverage.components.len(),
            critical = coverage.critical_paths.len(),
            "Chapter analysis complete"
        );

        lock(&self.chapters).insert(chapter, coverage.clone());
        Ok(coverage)
    }

    fn score_component(
        &self,
        path: &Path,
        source: &str,
        tested: &HashSet<(PathBuf, String)>,
        summary: Option<&CoverageSummary>,
    ) -> ComponentCoverageRecord {
        let component_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let complexity = match self.estimator.estimate(source) {
            Ok(score) => score.max(BASE_COMPLEXITY),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    estimator = self.estimator.name(),
                    error = %e,
                    "Could not scan source, using base complexity"
                );
                BASE_COMPLEXITY
            }
        };

        let has_test = tested.contains(&(parent_dir(path), component_name.clone()));
        let coverage = summary
            .and_then(|s| s.lookup(path))
            .unwrap_or_else(|| estimate_coverage(complexity, has_test));

        ComponentCoverageRecord {
            component_name,
            file_path: path.to_path_buf(),
            complexity,
            lines_of_code: lines_of_code(source),
            has_test,
            coverage,
        }
    }

    /// Previously computed result for `chapter`; never rescans.
    pub fn get_chapter_coverage(&self, chapter: u32) -> Option<ChapterCoverage> {
        lock(&self.chapters).get(&chapter).cloned()
    }

    /// Chapters with cached results, sorted.
    pub fn chapters(&self) -> Vec<u32> {
        let mut chapters: Vec<u32> = lock(&self.chapters).keys().copied().collect();
        chapters.sort_unstable();
        chapters
    }

    /// Render the cached result for `chapter` as text.
    ///
    /// Chapters that were never analyzed produce a "No coverage data
    /// available" report.
    pub fn generate_coverage_report(&self, chapter: u32) -> String {
        let coverage = self.get_chapter_coverage(chapter);
        report::coverage_report(
            chapter,
            coverage.as_ref(),
            &self.thresholds(),
            self.config.critical_complexity,
        )
    }

    /// Forget every cached chapter.
    pub fn clear_coverage_data(&self) {
        lock(&self.chapters).clear();
        tracing::debug!("Cleared coverage data");
    }

    /// Forget cached chapters and restore the configured thresholds.
    pub fn reset(&self) {
        self.clear_coverage_data();
        *lock(&self.thresholds) = self.config.thresholds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::source::SourceEntry;
    use crate::Error;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    /// In-memory file tree keyed by full path.
    #[derive(Default)]
    struct MemoryProvider {
        files: BTreeMap<PathBuf, String>,
    }

    impl MemoryProvider {
        fn with(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(PathBuf::from(path), contents.to_string());
            self
        }
    }

    impl SourceProvider for MemoryProvider {
        fn list_files(&self, path: &Path) -> Result<Vec<SourceEntry>> {
            let mut entries: Vec<SourceEntry> = Vec::new();
            for file in self.files.keys() {
                let Ok(rest) = file.strip_prefix(path) else {
                    continue;
                };
                let mut parts = rest.components();
                let Some(first) = parts.next() else {
                    continue;
                };
                let name = first.as_os_str().to_string_lossy().into_owned();
                let entry = if parts.next().is_some() {
                    SourceEntry::dir(&name)
                } else {
                    SourceEntry::file(&name)
                };
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
            if entries.is_empty() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                )));
            }
            Ok(entries)
        }

        fn read_file(&self, path: &Path) -> Result<String> {
            self.files.get(path).cloned().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            })
        }
    }

    const COMPLEX: &str = r#"
export function Amortization({ rate, years, extra }) {
  if (rate <= 0) { return null; } else if (years > 30) { warn(); }
  const label = extra ? "with extra" : "standard";
  for (let y = 0; y < years; y++) { schedule(y); }
  return label && render();
}
"#;

    const SIMPLE: &str = "export const Title = () => <h1>Budgeting</h1>;\n";

    fn config() -> CoverageConfig {
        CoverageConfig {
            components_root: PathBuf::from("/app/chapters"),
            ..Default::default()
        }
    }

    fn analyzer(provider: MemoryProvider) -> CoverageAnalyzer {
        CoverageAnalyzer::new(Box::new(provider), config())
    }

    fn chapter_one() -> MemoryProvider {
        MemoryProvider::default()
            .with("/app/chapters/chapter1/Amortization.tsx", COMPLEX)
            .with("/app/chapters/chapter1/Amortization.test.tsx", "it('works', () => {});")
            .with("/app/chapters/chapter1/Title.tsx", SIMPLE)
            .with("/app/chapters/chapter1/styles.css", ".title { color: red; }")
            .with("/app/chapters/chapter1/charts/Pie.jsx", "export default Pie;")
    }

    #[test]
    fn test_shared_instance_is_identity_stable() {
        assert!(Arc::ptr_eq(
            &CoverageAnalyzer::shared(),
            &CoverageAnalyzer::shared()
        ));
    }

    #[test]
    fn test_analyze_chapter_filters_and_scores() {
        let analyzer = analyzer(chapter_one());
        let coverage = analyzer.analyze_chapter(1).unwrap();

        let names: Vec<_> = coverage
            .components
            .iter()
            .map(|c| c.component_name.as_str())
            .collect();
        assert_eq!(names, vec!["Amortization", "Title", "Pie"]);

        let amort = &coverage.components[0];
        // if, else, if, ternary, for, &&
        assert_eq!(amort.complexity, 7);
        assert!(amort.has_test);
        assert_eq!(amort.coverage.source, CoverageSource::Estimated);
        assert_eq!(amort.coverage.branches, 100.0 - 8.0 * 6.0);

        let title = &coverage.components[1];
        assert_eq!(title.complexity, 1);
        assert!(!title.has_test);
        assert_eq!(title.coverage.lines, 0.0);

        assert_eq!(coverage.critical_paths, vec!["Amortization.tsx"]);
        assert!(coverage
            .recommendations
            .contains(&"Reduce complexity of Amortization".to_string()));
        assert!(coverage
            .recommendations
            .contains(&"Increase statements coverage of Title to meet 80% threshold".to_string()));
    }

    #[test]
    fn test_same_stem_in_subdirectory_is_a_separate_component() {
        let branchy = "if (a) {}\nif (b) {}\nif (c) {}\nif (d) {}\nif (e) {}\nif (f) {}\n";
        let provider = MemoryProvider::default()
            .with("/app/chapters/chapter4/index.tsx", branchy)
            .with("/app/chapters/chapter4/charts/index.tsx", SIMPLE)
            .with("/app/chapters/chapter4/charts/index.test.tsx", "it('draws', () => {});");
        let analyzer = analyzer(provider);
        let coverage = analyzer.analyze_chapter(4).unwrap();

        let root = coverage
            .components
            .iter()
            .find(|c| c.file_path == Path::new("/app/chapters/chapter4/index.tsx"))
            .unwrap();
        assert_eq!(root.complexity, 7);
        assert!(!root.has_test);
        assert_eq!(root.coverage.statements, 0.0);

        let chart = coverage
            .components
            .iter()
            .find(|c| c.file_path == Path::new("/app/chapters/chapter4/charts/index.tsx"))
            .unwrap();
        assert_eq!(chart.complexity, 1);
        assert!(chart.has_test);

        assert_eq!(coverage.critical_paths, vec!["index.tsx"]);

        let report = analyzer.generate_coverage_report(4);
        assert!(report.contains("- index (complexity 7)"));
        assert!(!report.contains("- index (complexity 1)"));
    }

    #[test]
    fn test_results_are_cached_until_cleared() {
        let analyzer = analyzer(chapter_one());
        assert!(analyzer.get_chapter_coverage(1).is_none());

        let computed = analyzer.analyze_chapter(1).unwrap();
        assert_eq!(analyzer.get_chapter_coverage(1), Some(computed));
        assert_eq!(analyzer.chapters(), vec![1]);

        analyzer.clear_coverage_data();
        assert!(analyzer.get_chapter_coverage(1).is_none());
    }

    #[test]
    fn test_missing_directory_fails_without_caching() {
        let analyzer = analyzer(chapter_one());
        let err = analyzer.analyze_chapter(9).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(analyzer.get_chapter_coverage(9).is_none());
    }

    #[test]
    fn test_malformed_file_degrades_to_base_complexity() {
        let provider = MemoryProvider::default()
            .with("/app/chapters/chapter2/Broken.tsx", "if (a) { /* oops")
            .with("/app/chapters/chapter2/Fine.tsx", "if (a) { b(); }");
        let analyzer = analyzer(provider);
        let coverage = analyzer.analyze_chapter(2).unwrap();

        assert_eq!(coverage.components.len(), 2);
        assert_eq!(coverage.components[0].complexity, 1);
        assert_eq!(coverage.components[1].complexity, 2);
    }

    #[test]
    fn test_set_thresholds_affects_later_analyses() {
        let analyzer = analyzer(chapter_one());
        analyzer.set_thresholds(&CoverageThresholdPatch {
            statements: Some(0.0),
            branches: Some(0.0),
            functions: Some(0.0),
            lines: Some(0.0),
        });
        let coverage = analyzer.analyze_chapter(1).unwrap();
        assert!(coverage
            .recommendations
            .iter()
            .all(|r| r.starts_with("Reduce complexity")));

        analyzer.reset();
        assert_eq!(analyzer.thresholds(), CoverageThresholds::default());
        assert!(analyzer.chapters().is_empty());
    }

    #[test]
    fn test_external_summary_takes_precedence() {
        let summary = r#"{
  "/app/chapters/chapter1/Title.tsx": {
    "lines": {"total": 1, "covered": 1, "pct": 100},
    "statements": {"total": 1, "covered": 1, "pct": 100},
    "functions": {"total": 1, "covered": 1, "pct": 100},
    "branches": {"total": 0, "covered": 0, "pct": 100}
  }
}"#;
        let provider = chapter_one().with("/app/coverage/coverage-summary.json", summary);
        let config = CoverageConfig {
            coverage_summary: Some(PathBuf::from("/app/coverage/coverage-summary.json")),
            ..config()
        };
        let analyzer = CoverageAnalyzer::new(Box::new(provider), config);
        let coverage = analyzer.analyze_chapter(1).unwrap();

        let title = &coverage.components[1];
        assert_eq!(title.coverage.source, CoverageSource::External);
        assert_eq!(title.coverage.statements, 100.0);
        assert!(!coverage
            .recommendations
            .iter()
            .any(|r| r.contains("of Title ")));
    }

    #[test]
    fn test_report_for_unknown_chapter() {
        let analyzer = analyzer(chapter_one());
        let report = analyzer.generate_coverage_report(42);
        assert!(report.contains("No coverage data available"));
    }

    #[test]
    fn test_estimate_coverage_clamps() {
        let metrics = estimate_coverage(40, true);
        assert_eq!(metrics.branches, 0.0);
        assert_eq!(estimate_coverage(1, true).lines, 100.0);
        assert_eq!(estimate_coverage(1, false).functions, 0.0);
    }
}
