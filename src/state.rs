//! # Application State Management
//!
//! Every Actix worker gets a clone of [`AppState`] through `web::Data`.
//! It carries the collaborators the handlers need, so nothing is read from
//! process globals at request time:
//!
//! - the loaded configuration and resolved storage paths
//! - the recordings and alerts stores (which share one identifier generator)
//! - request and storage metrics
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - Cloning an `AppState` only bumps reference counts; all workers see the same stores and metrics
//!
//! ### RwLock (Reader-Writer Lock)
//! - Metrics are written by every request and read by `/metrics` and `/health`
//! - A poisoned lock still holds usable counters, so we recover the guard instead of panicking

use crate::config::AppConfig;
use crate::storage::{AlertStore, IdGenerator, MonotonicMillis, RecordingStore, StoragePaths};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// The application state shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configuration as loaded at startup (read-only afterwards)
    pub config: Arc<AppConfig>,

    /// Storage directories resolved from `config`
    pub paths: Arc<StoragePaths>,

    pub recordings: RecordingStore,

    pub alerts: AlertStore,

    /// Counters updated by middleware and handlers
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started (never changes, so no lock needed)
    pub start_time: Instant,
}

/// Counters collected since the server started.
///
/// ## What they track:
/// - **request_count / error_count**: every HTTP request, and those ending in 4xx/5xx
/// - **recordings_stored / recording_bytes**: successful uploads and their total size
/// - **upload_failures**: upload requests that did not end with a stored recording
/// - **alerts_stored / alert_failures**: Quick Shield alerts written or lost
/// - **endpoint_metrics**: per "METHOD /path" statistics
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub recordings_stored: u64,
    pub recording_bytes: u64,
    pub upload_failures: u64,
    pub alerts_stored: u64,
    pub alert_failures: u64,
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,

    /// Cumulative processing time in milliseconds
    pub total_duration_ms: u64,

    pub error_count: u64,
}

impl AppState {
    /// Build the state with the default millisecond identifier generator.
    pub fn new(config: AppConfig) -> Self {
        Self::with_id_generator(config, Arc::new(MonotonicMillis::new()))
    }

    /// Build the state around a caller-provided identifier generator.
    ///
    /// Both stores share `ids`, so a recording and an alert created in the
    /// same millisecond still get distinct numbers.
    pub fn with_id_generator(config: AppConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let paths = StoragePaths::from_config(&config);
        let recordings = RecordingStore::new(
            paths.recordings.clone(),
            Arc::clone(&ids),
            config.uploads.allowed_extensions.clone(),
        );
        let alerts = AlertStore::new(paths.alerts.clone(), ids);

        Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
            recordings,
            alerts,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    fn metrics_read(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_write(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one finished HTTP request (called by the metrics middleware).
    ///
    /// ## Parameters:
    /// - **endpoint**: e.g. "POST /upload"
    /// - **duration_ms**: how long the request took
    /// - **is_error**: whether it ended with a 4xx/5xx status
    pub fn record_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_write();
        metrics.request_count += 1;
        if is_error {
            metrics.error_count += 1;
        }

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn record_recording_stored(&self, bytes: u64) {
        let mut metrics = self.metrics_write();
        metrics.recordings_stored += 1;
        metrics.recording_bytes += bytes;
    }

    pub fn record_upload_failure(&self) {
        self.metrics_write().upload_failures += 1;
    }

    pub fn record_alert_stored(&self) {
        self.metrics_write().alerts_stored += 1;
    }

    pub fn record_alert_failure(&self) {
        self.metrics_write().alert_failures += 1;
    }

    /// Copy the metrics out so the lock is not held while building a response.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_read().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time: total duration ÷ number of requests.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of requests that failed, from 0.0 to 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
