//! Runtime performance analyzer for calculator subjects.

use crate::config::PerformanceConfig;
use crate::error::{Error, Result};
use crate::evaluate::ThresholdEvaluator;
use crate::metrics::{MetricSnapshot, MetricsStore};
use crate::report;
use crate::types::{AnalysisResult, MetricKind, ThresholdPatch, ThresholdSet};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

static SHARED: OnceLock<Arc<PerformanceAnalyzer>> = OnceLock::new();

/// Open measurements are keyed by subject and operation label.
type MeasurementKey = (String, String);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collects runtime metrics per subject and evaluates them against
/// thresholds.
///
/// Most callers use the process-wide instance from
/// [`PerformanceAnalyzer::shared`]. Tests and embedders that want isolated
/// state construct their own with [`PerformanceAnalyzer::new`] or
/// [`PerformanceAnalyzer::with_store`].
pub struct PerformanceAnalyzer {
    store: Arc<MetricsStore>,
    evaluator: ThresholdEvaluator,
    defaults: ThresholdSet,
    overrides: Mutex<HashMap<String, ThresholdSet>>,
    measurements: Mutex<HashMap<MeasurementKey, Instant>>,
}

impl PerformanceAnalyzer {
    /// Create an analyzer with its own store, configured from `config`.
    pub fn new(config: &PerformanceConfig) -> Self {
        let store = MetricsStore::with_policy(config.value_policy, config.max_samples_per_subject);
        Self::with_store(Arc::new(store), config.thresholds())
    }

    /// Create an analyzer over an existing store.
    pub fn with_store(store: Arc<MetricsStore>, defaults: ThresholdSet) -> Self {
        Self {
            store,
            evaluator: ThresholdEvaluator::new(),
            defaults,
            overrides: Mutex::new(HashMap::new()),
            measurements: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide analyzer.
    ///
    /// Created with default configuration on first access; every call returns
    /// the same `Arc`.
    pub fn shared() -> Arc<PerformanceAnalyzer> {
        SHARED
            .get_or_init(|| {
                tracing::debug!("Creating shared performance analyzer");
                Arc::new(PerformanceAnalyzer::new(&PerformanceConfig::default()))
            })
            .clone()
    }

    /// Underlying metrics store.
    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    // ============================================
    // Ingestion
    // ============================================

    /// Begin timing `label` for `subject`.
    ///
    /// Different labels on the same subject are tracked independently.
    /// Starting a label that is already open restarts its timer.
    pub fn start_measurement(&self, subject: &str, label: &str) {
        let key = (subject.to_string(), label.to_string());
        if lock(&self.measurements).insert(key, Instant::now()).is_some() {
            tracing::warn!(subject, label, "Measurement restarted before it was ended");
        }
    }

    /// Finish timing `label` and record the elapsed time as
    /// [`MetricKind::CalculationTime`].
    ///
    /// Returns [`Error::MeasurementProtocol`] when no matching
    /// `start_measurement` is open.
    pub fn end_measurement(&self, subject: &str, label: &str) -> Result<Duration> {
        let started = lock(&self.measurements)
            .remove(&(subject.to_string(), label.to_string()))
            .ok_or_else(|| Error::MeasurementProtocol {
                subject: subject.to_string(),
                label: label.to_string(),
            })?;

        let elapsed = started.elapsed();
        let millis = elapsed.as_secs_f64() * 1000.0;
        self.store
            .record(subject, MetricKind::CalculationTime, millis)?;

        tracing::debug!(subject, label, elapsed_ms = millis, "Measurement complete");
        Ok(elapsed)
    }

    /// Time `f` as one measurement of `label`.
    pub fn measure<T>(&self, subject: &str, label: &str, f: impl FnOnce() -> T) -> Result<T> {
        self.start_measurement(subject, label);
        let value = f();
        self.end_measurement(subject, label)?;
        Ok(value)
    }

    /// Whether a measurement for `(subject, label)` is open.
    pub fn is_measuring(&self, subject: &str, label: &str) -> bool {
        lock(&self.measurements).contains_key(&(subject.to_string(), label.to_string()))
    }

    /// Write a metric value directly.
    ///
    /// For counter kinds `value` is the new cumulative total; prefer
    /// [`PerformanceAnalyzer::increment`] when counting events.
    pub fn record_metric(&self, subject: &str, kind: MetricKind, value: f64) -> Result<()> {
        self.store.record(subject, kind, value)
    }

    /// Add one to a counter metric, returning the new total.
    pub fn increment(&self, subject: &str, kind: MetricKind) -> Result<f64> {
        self.increment_by(subject, kind, 1.0)
    }

    pub fn increment_by(&self, subject: &str, kind: MetricKind, delta: f64) -> Result<f64> {
        self.store.increment(subject, kind, delta)
    }

    // ============================================
    // Thresholds
    // ============================================

    /// Merge `patch` onto the subject's current thresholds.
    ///
    /// Other subjects keep their own thresholds.
    pub fn update_thresholds(&self, subject: &str, patch: &ThresholdPatch) {
        let mut overrides = lock(&self.overrides);
        let current = overrides
            .entry(subject.to_string())
            .or_insert(self.defaults);
        current.apply(patch);
        let updated = *current;
        tracing::info!(subject, thresholds = ?updated, "Updated thresholds");
    }

    /// Thresholds in effect for `subject`.
    pub fn effective_thresholds(&self, subject: &str) -> ThresholdSet {
        lock(&self.overrides)
            .get(subject)
            .copied()
            .unwrap_or(self.defaults)
    }

    pub fn default_thresholds(&self) -> ThresholdSet {
        self.defaults
    }

    // ============================================
    // Queries and reports
    // ============================================

    /// Latest snapshot for `subject`, `None` if nothing was recorded.
    pub fn get_latest_metrics(&self, subject: &str) -> Option<MetricSnapshot> {
        self.store.latest(subject)
    }

    /// Subjects with recorded metrics, sorted.
    pub fn subjects(&self) -> Vec<String> {
        self.store.subjects()
    }

    /// Evaluate the subject's latest metrics against its thresholds.
    ///
    /// Unknown subjects produce an empty result.
    pub fn analyze_performance(&self, subject: &str) -> AnalysisResult {
        let snapshot = self.store.latest(subject);
        let result = self
            .evaluator
            .evaluate_performance(snapshot.as_ref(), &self.effective_thresholds(subject));
        if !result.issues.is_empty() {
            tracing::info!(subject, issues = result.issues.len(), "Performance issues found");
        }
        result
    }

    /// Render the subject's metrics, issues and recommendations as text.
    pub fn generate_performance_report(&self, subject: &str) -> String {
        let snapshot = self.store.latest(subject);
        let thresholds = self.effective_thresholds(subject);
        let analysis = self
            .evaluator
            .evaluate_performance(snapshot.as_ref(), &thresholds);
        report::performance_report(subject, snapshot.as_ref(), &thresholds, &analysis)
    }

    // ============================================
    // Lifecycle
    // ============================================

    /// Drop all recorded metrics and open measurements.
    ///
    /// Threshold overrides are kept; use [`PerformanceAnalyzer::reset`] to
    /// drop them as well.
    pub fn clear_metrics(&self) {
        self.store.clear();
        lock(&self.measurements).clear();
    }

    /// Return to the freshly constructed state.
    pub fn reset(&self) {
        self.clear_metrics();
        lock(&self.overrides).clear();
    }
}
