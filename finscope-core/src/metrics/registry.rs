//! Metric registry for discovery and documentation.

use crate::types::{Aggregation, MetricKind, MetricUnit};

/// Descriptor for a metric kind accepted by the store.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub kind: MetricKind,
    pub unit: MetricUnit,
    pub aggregation: Aggregation,
    pub summary: &'static str,
    pub description: &'static str,
}

const RUNTIME_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor {
        kind: MetricKind::CalculationTime,
        unit: MetricUnit::Milliseconds,
        aggregation: Aggregation::LastWrite,
        summary: "Duration of the latest calculation.",
        description: "Wall-clock time between start_measurement and end_measurement.",
    },
    MetricDescriptor {
        kind: MetricKind::RenderTime,
        unit: MetricUnit::Milliseconds,
        aggregation: Aggregation::LastWrite,
        summary: "Duration of the latest render.",
        description: "Time spent rendering the calculator output; 16ms is one frame at 60fps.",
    },
    MetricDescriptor {
        kind: MetricKind::MemoryUsage,
        unit: MetricUnit::Bytes,
        aggregation: Aggregation::LastWrite,
        summary: "Memory delta attributed to the subject.",
        description: "Heap growth observed around the subject's latest calculation.",
    },
    MetricDescriptor {
        kind: MetricKind::RecomputeCount,
        unit: MetricUnit::Count,
        aggregation: Aggregation::Counter,
        summary: "Number of recomputations.",
        description: "Cumulative count of derived values recomputed for the subject.",
    },
    MetricDescriptor {
        kind: MetricKind::CacheHits,
        unit: MetricUnit::Count,
        aggregation: Aggregation::Counter,
        summary: "Memoization cache hits.",
        description: "Cumulative count of results served from the subject's cache.",
    },
    MetricDescriptor {
        kind: MetricKind::CacheMisses,
        unit: MetricUnit::Count,
        aggregation: Aggregation::Counter,
        summary: "Memoization cache misses.",
        description: "Cumulative count of results that had to be computed.",
    },
    MetricDescriptor {
        kind: MetricKind::Fps,
        unit: MetricUnit::FramesPerSecond,
        aggregation: Aggregation::LastWrite,
        summary: "Frame rate while interacting.",
        description: "Frames per second sampled during the latest interaction.",
    },
    MetricDescriptor {
        kind: MetricKind::InteractionDelay,
        unit: MetricUnit::Milliseconds,
        aggregation: Aggregation::LastWrite,
        summary: "Input-to-update latency.",
        description: "Delay between a user input event and the visible update.",
    },
];

/// Look up the descriptor for a metric kind.
pub fn descriptor(kind: MetricKind) -> &'static MetricDescriptor {
    // RUNTIME_METRICS is ordered like MetricKind::ALL
    &RUNTIME_METRICS[kind as usize]
}

/// List all registered metrics.
pub fn list_metrics() -> Vec<MetricDescriptor> {
    RUNTIME_METRICS.to_vec()
}

/// List metrics with the given aggregation rule.
pub fn list_metrics_by_aggregation(aggregation: Aggregation) -> Vec<MetricDescriptor> {
    RUNTIME_METRICS
        .iter()
        .filter(|m| m.aggregation == aggregation)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_kind_in_order() {
        assert_eq!(list_metrics().len(), MetricKind::ALL.len());
        for kind in MetricKind::ALL {
            assert_eq!(descriptor(kind).kind, kind);
        }
    }

    #[test]
    fn test_list_counters() {
        let counters = list_metrics_by_aggregation(Aggregation::Counter);
        assert_eq!(counters.len(), 3);
        assert!(counters.iter().all(|m| m.unit == MetricUnit::Count));
    }
}
