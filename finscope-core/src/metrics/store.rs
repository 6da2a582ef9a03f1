//! In-memory, append-only sample storage keyed by subject.

use crate::error::{Error, Result};
use crate::types::{MetricKind, MetricSample, ValuePolicy};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Latest known value per metric kind for one subject.
///
/// Counter kinds hold their cumulative total, all other kinds hold the most
/// recently written value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub subject_id: String,
    pub values: BTreeMap<MetricKind, f64>,
    pub updated_at: DateTime<Utc>,
}

impl MetricSnapshot {
    fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            values: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    /// `hits / (hits + misses)`, or `None` before any cache lookups.
    pub fn cache_hit_rate(&self) -> Option<f64> {
        let hits = self.get(MetricKind::CacheHits).unwrap_or(0.0);
        let misses = self.get(MetricKind::CacheMisses).unwrap_or(0.0);
        let total = hits + misses;
        if total > 0.0 {
            Some(hits / total)
        } else {
            None
        }
    }
}

struct SubjectSeries {
    samples: VecDeque<MetricSample>,
    snapshot: MetricSnapshot,
}

impl SubjectSeries {
    fn new(subject_id: &str) -> Self {
        Self {
            samples: VecDeque::new(),
            snapshot: MetricSnapshot::new(subject_id),
        }
    }

    fn push(&mut self, sample: MetricSample, max_samples: Option<usize>) {
        self.snapshot.values.insert(sample.metric, sample.value);
        self.snapshot.updated_at = sample.timestamp;
        self.samples.push_back(sample);

        if let Some(max) = max_samples {
            while self.samples.len() > max {
                self.samples.pop_front();
            }
        }
    }
}

/// Append-only metric storage shared by every caller of an analyzer.
///
/// A single lock guards the whole map, so read-modify-write sequences such
/// as [`MetricsStore::increment`] are atomic per store.
pub struct MetricsStore {
    subjects: Mutex<HashMap<String, SubjectSeries>>,
    policy: ValuePolicy,
    max_samples_per_subject: Option<usize>,
}

impl MetricsStore {
    /// Create a store with the default (rejecting) value policy and
    /// unbounded history.
    pub fn new() -> Self {
        Self::with_policy(ValuePolicy::default(), None)
    }

    pub fn with_policy(policy: ValuePolicy, max_samples_per_subject: Option<usize>) -> Self {
        Self {
            subjects: Mutex::new(HashMap::new()),
            policy,
            max_samples_per_subject,
        }
    }

    pub fn policy(&self) -> ValuePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SubjectSeries>> {
        self.subjects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the value policy, returning the value to store.
    fn validate(&self, subject: &str, kind: MetricKind, value: f64) -> Result<f64> {
        let invalid = |reason: &str| Error::InvalidMetric {
            subject: subject.to_string(),
            metric: kind,
            value,
            reason: reason.to_string(),
        };

        match self.policy {
            ValuePolicy::PassThrough => Ok(value),
            ValuePolicy::Reject => {
                if !value.is_finite() {
                    Err(invalid("value is not finite"))
                } else if value < 0.0 {
                    Err(invalid("value is negative"))
                } else {
                    Ok(value)
                }
            }
            ValuePolicy::Clamp => {
                if !value.is_finite() {
                    Err(invalid("value is not finite"))
                } else {
                    Ok(value.max(0.0))
                }
            }
        }
    }

    /// Append a sample for `subject`.
    ///
    /// Counter kinds are written as given: the value is taken to be the new
    /// cumulative total. Use [`MetricsStore::increment`] to add to it instead.
    pub fn record(&self, subject: &str, kind: MetricKind, value: f64) -> Result<()> {
        let value = self.validate(subject, kind, value)?;
        let sample = MetricSample {
            subject_id: subject.to_string(),
            metric: kind,
            value,
            timestamp: Utc::now(),
        };

        let mut subjects = self.lock();
        subjects
            .entry(subject.to_string())
            .or_insert_with(|| SubjectSeries::new(subject))
            .push(sample, self.max_samples_per_subject);

        tracing::debug!(subject, metric = %kind, value, "Recorded metric");
        Ok(())
    }

    /// Add `delta` to a counter metric and return the new total.
    ///
    /// The read and the write happen under one lock acquisition, so
    /// concurrent increments for the same subject never lose updates.
    pub fn increment(&self, subject: &str, kind: MetricKind, delta: f64) -> Result<f64> {
        if !kind.is_counter() {
            return Err(Error::InvalidMetric {
                subject: subject.to_string(),
                metric: kind,
                value: delta,
                reason: "only counter metrics can be incremented".to_string(),
            });
        }
        let delta = self.validate(subject, kind, delta)?;

        let mut subjects = self.lock();
        let series = subjects
            .entry(subject.to_string())
            .or_insert_with(|| SubjectSeries::new(subject));
        let total = series.snapshot.get(kind).unwrap_or(0.0) + delta;
        series.push(
            MetricSample {
                subject_id: subject.to_string(),
                metric: kind,
                value: total,
                timestamp: Utc::now(),
            },
            self.max_samples_per_subject,
        );

        tracing::debug!(subject, metric = %kind, total, "Incremented counter");
        Ok(total)
    }

    /// Latest snapshot for `subject`, or `None` if nothing was recorded.
    pub fn latest(&self, subject: &str) -> Option<MetricSnapshot> {
        self.lock().get(subject).map(|s| s.snapshot.clone())
    }

    /// Retained samples of one kind for `subject`, oldest first.
    pub fn history(&self, subject: &str, kind: MetricKind) -> Vec<MetricSample> {
        self.lock()
            .get(subject)
            .map(|s| {
                s.samples
                    .iter()
                    .filter(|sample| sample.metric == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of retained samples for `subject`.
    pub fn sample_count(&self, subject: &str) -> usize {
        self.lock().get(subject).map_or(0, |s| s.samples.len())
    }

    /// Known subjects, sorted.
    pub fn subjects(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every subject's samples and snapshot.
    pub fn clear(&self) {
        let mut subjects = self.lock();
        let dropped = subjects.len();
        subjects.clear();
        tracing::debug!(subjects = dropped, "Cleared metrics store");
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_unknown_subject_has_no_snapshot() {
        let store = MetricsStore::new();
        assert!(store.latest("nobody").is_none());
        assert!(store.history("nobody", MetricKind::Fps).is_empty());
    }

    #[test]
    fn test_snapshot_keeps_latest_value_per_kind() {
        let store = MetricsStore::new();
        store.record("calc-1", MetricKind::CalculationTime, 10.0).unwrap();
        store.record("calc-1", MetricKind::CalculationTime, 42.0).unwrap();
        store.record("calc-1", MetricKind::Fps, 58.0).unwrap();

        let snapshot = store.latest("calc-1").unwrap();
        assert_eq!(snapshot.get(MetricKind::CalculationTime), Some(42.0));
        assert_eq!(snapshot.get(MetricKind::Fps), Some(58.0));
        assert_eq!(snapshot.get(MetricKind::MemoryUsage), None);
        assert_eq!(store.history("calc-1", MetricKind::CalculationTime).len(), 2);
    }

    #[test]
    fn test_clear_forgets_all_subjects() {
        let store = MetricsStore::new();
        store.record("a", MetricKind::RenderTime, 3.0).unwrap();
        store.record("b", MetricKind::RenderTime, 4.0).unwrap();
        store.clear();
        assert!(store.latest("a").is_none());
        assert!(store.latest("b").is_none());
        assert!(store.subjects().is_empty());
    }

    #[test]
    fn test_reject_policy_refuses_negative_and_nan() {
        let store = MetricsStore::new();
        let err = store
            .record("calc-1", MetricKind::MemoryUsage, -1.0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMetric { .. }));
        assert!(store.record("calc-1", MetricKind::Fps, f64::NAN).is_err());
        assert!(store.latest("calc-1").is_none());
    }

    #[test]
    fn test_clamp_policy_zeroes_negatives() {
        let store = MetricsStore::with_policy(ValuePolicy::Clamp, None);
        store.record("calc-1", MetricKind::RenderTime, -5.0).unwrap();
        assert_eq!(
            store.latest("calc-1").unwrap().get(MetricKind::RenderTime),
            Some(0.0)
        );
        assert!(store
            .record("calc-1", MetricKind::RenderTime, f64::INFINITY)
            .is_err());
    }

    #[test]
    fn test_pass_through_policy_stores_as_is() {
        let store = MetricsStore::with_policy(ValuePolicy::PassThrough, None);
        store.record("calc-1", MetricKind::RenderTime, -5.0).unwrap();
        assert_eq!(
            store.latest("calc-1").unwrap().get(MetricKind::RenderTime),
            Some(-5.0)
        );
    }

    #[test]
    fn test_increment_accumulates_counters() {
        let store = MetricsStore::new();
        assert_eq!(store.increment("calc-1", MetricKind::CacheHits, 1.0).unwrap(), 1.0);
        assert_eq!(store.increment("calc-1", MetricKind::CacheHits, 2.0).unwrap(), 3.0);
        store.record("calc-1", MetricKind::CacheHits, 10.0).unwrap();
        assert_eq!(store.increment("calc-1", MetricKind::CacheHits, 1.0).unwrap(), 11.0);
    }

    #[test]
    fn test_increment_rejects_last_write_kinds() {
        let store = MetricsStore::new();
        assert!(store
            .increment("calc-1", MetricKind::CalculationTime, 1.0)
            .is_err());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MetricsStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .increment("calc-1", MetricKind::RecomputeCount, 1.0)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.latest("calc-1").unwrap();
        assert_eq!(snapshot.get(MetricKind::RecomputeCount), Some(800.0));
    }

    #[test]
    fn test_retention_drops_oldest_but_keeps_snapshot() {
        let store = MetricsStore::with_policy(ValuePolicy::Reject, Some(2));
        store.record("calc-1", MetricKind::MemoryUsage, 1.0).unwrap();
        store.record("calc-1", MetricKind::Fps, 60.0).unwrap();
        store.record("calc-1", MetricKind::Fps, 30.0).unwrap();

        assert_eq!(store.sample_count("calc-1"), 2);
        assert!(store.history("calc-1", MetricKind::MemoryUsage).is_empty());
        let snapshot = store.latest("calc-1").unwrap();
        assert_eq!(snapshot.get(MetricKind::MemoryUsage), Some(1.0));
        assert_eq!(snapshot.get(MetricKind::Fps), Some(30.0));
    }

    #[test]
    fn test_cache_hit_rate() {
        let store = MetricsStore::new();
        store.record("calc-1", MetricKind::Fps, 60.0).unwrap();
        assert_eq!(store.latest("calc-1").unwrap().cache_hit_rate(), None);

        store.record("calc-1", MetricKind::CacheHits, 2.0).unwrap();
        store.record("calc-1", MetricKind::CacheMisses, 8.0).unwrap();
        let rate = store.latest("calc-1").unwrap().cache_hit_rate().unwrap();
        assert!((rate - 0.2).abs() < 1e-9);
    }
}
