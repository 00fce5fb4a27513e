//! In-process bridge metrics (dependency-free, Prometheus text exposition).

pub mod metrics;

pub use metrics::BridgeMetrics;
