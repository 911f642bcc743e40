//! Prometheus metrics collection.
//!
//! Provides comprehensive metrics for:
//! - HTTP request latency and counts
//! - Blob/object store operations
//! - Business metrics (repos, users, orgs, LFS objects)

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::sync::Arc;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path pattern
    pub path: String,
    /// Response status code
    pub status: u16,
}

/// Storage operation labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StorageLabels {
    /// Operation type (read, write, delete)
    pub operation: String,
    /// Object type (blob, tree, commit)
    pub object_type: String,
}

/// Global metrics state.
pub static METRICS: Lazy<MetricsState> = Lazy::new(MetricsState::new);

/// Metrics state container.
#[derive(Clone)]
pub struct MetricsState {
    /// Prometheus registry.
    pub registry: Arc<RwLock<Registry>>,
    /// HTTP request counter.
    pub http_requests_total: Family<HttpLabels, Counter>,
    /// HTTP request duration histogram (seconds).
    pub http_request_duration_seconds: Family<HttpLabels, Histogram>,
    /// HTTP active connections gauge.
    pub http_active_connections: Gauge,
    /// Storage objects gauge by type.
    pub storage_objects_total: Family<StorageLabels, Gauge>,
    /// Storage operation duration histogram.
    pub storage_operation_duration_seconds: Family<StorageLabels, Histogram>,
    /// Total repositories gauge.
    pub repositories_total: Gauge,
    /// Total users.
    pub users_total: Gauge,
    /// Total organizations.
    pub organizations_total: Gauge,
    /// Total LFS objects stored.
    pub lfs_objects_total: Gauge,
    /// Total bytes stored across the blob store.
    pub lfs_bytes_total: Gauge,
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // HTTP metrics
        let http_requests_total = Family::<HttpLabels, Counter>::default();
        registry.register(
            "kohakuhub_http_requests",
            "Total HTTP requests",
            http_requests_total.clone(),
        );

        let http_request_duration_seconds =
            Family::<HttpLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.001, 2.0, 16))
            });
        registry.register(
            "kohakuhub_http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_request_duration_seconds.clone(),
        );

        let http_active_connections = Gauge::default();
        registry.register(
            "kohakuhub_http_active_connections",
            "Number of active HTTP connections",
            http_active_connections.clone(),
        );

        // Storage metrics
        let storage_objects_total = Family::<StorageLabels, Gauge>::default();
        registry.register(
            "kohakuhub_storage_objects",
            "Total storage objects by type",
            storage_objects_total.clone(),
        );

        let storage_operation_duration_seconds =
            Family::<StorageLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.0001, 2.0, 16))
            });
        registry.register(
            "kohakuhub_storage_operation_duration_seconds",
            "Storage operation duration in seconds",
            storage_operation_duration_seconds.clone(),
        );

        // Business metrics
        let repositories_total = Gauge::default();
        registry.register(
            "kohakuhub_repositories",
            "Total number of repositories",
            repositories_total.clone(),
        );

        let users_total = Gauge::default();
        registry.register(
            "kohakuhub_users",
            "Total number of users",
            users_total.clone(),
        );

        let organizations_total = Gauge::default();
        registry.register(
            "kohakuhub_organizations",
            "Total number of organizations",
            organizations_total.clone(),
        );

        let lfs_objects_total = Gauge::default();
        registry.register(
            "kohakuhub_lfs_objects",
            "Total number of distinct LFS objects stored",
            lfs_objects_total.clone(),
        );

        let lfs_bytes_total = Gauge::default();
        registry.register(
            "kohakuhub_lfs_bytes",
            "Total bytes stored in the blob store",
            lfs_bytes_total.clone(),
        );

        Self {
            registry: Arc::new(RwLock::new(registry)),
            http_requests_total,
            http_request_duration_seconds,
            http_active_connections,
            storage_objects_total,
            storage_operation_duration_seconds,
            repositories_total,
            users_total,
            organizations_total,
            lfs_objects_total,
            lfs_bytes_total,
        }
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: normalize_path(path),
            status,
        };

        self.http_requests_total.get_or_create(&labels).inc();
        self.http_request_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Encode metrics for Prometheus scraping.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        prometheus_client::encoding::text::encode(&mut buffer, &registry)
            .expect("Failed to encode metrics");
        buffer
    }
}

/// Normalize path for metrics (replace dynamic segments).
fn normalize_path(path: &str) -> String {
    // Replace common dynamic path segments with placeholders
    let parts: Vec<&str> = path.split('/').collect();
    let normalized: Vec<&str> = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            // Skip empty parts and keep static paths
            if part.is_empty() {
                return *part;
            }
            // Detect dynamic segments (UUIDs, numbers, owner/repo patterns)
            if is_dynamic_segment(part, i, &parts) {
                ":param"
            } else {
                *part
            }
        })
        .collect();
    normalized.join("/")
}

/// Check if a path segment is dynamic.
fn is_dynamic_segment(segment: &str, index: usize, parts: &[&str]) -> bool {
    // UUID pattern
    if segment.len() == 36 && segment.contains('-') {
        return true;
    }
    // Pure numeric
    if segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    // After a repo-type segment, the next two segments are namespace/name.
    const REPO_TYPE_SEGMENTS: &[&str] = &["models", "datasets", "spaces"];
    if index >= 2 {
        if let Some(parent) = parts.get(index - 2) {
            if REPO_TYPE_SEGMENTS.contains(parent) {
                return true;
            }
        }
    }
    if index >= 1 {
        if let Some(parent) = parts.get(index - 1) {
            if REPO_TYPE_SEGMENTS.contains(parent) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/api/models"), "/api/models");
        assert_eq!(
            normalize_path("/api/models/alice/myrepo"),
            "/api/models/:param/:param"
        );
        assert_eq!(normalize_path("/health/42"), "/health/:param");
    }

    #[test]
    fn test_metrics_state_creation() {
        let metrics = MetricsState::new();
        metrics.record_http_request("GET", "/health", 200, 0.001);
        let encoded = metrics.encode();
        assert!(encoded.contains("kohakuhub_http_requests"));
    }
}
