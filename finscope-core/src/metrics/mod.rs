//! Metrics storage and the metric registry
//!
//! - [`store`]: append-only samples keyed by subject, with O(1) snapshots
//! - [`registry`]: unit and aggregation rule for every [`MetricKind`](crate::MetricKind)

pub mod registry;
pub mod store;

pub use registry::{list_metrics, MetricDescriptor};
pub use store::{MetricSnapshot, MetricsStore};
