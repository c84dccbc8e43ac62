//! Request and prediction statistics for the portal.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all handlers
pub struct PortalMetrics {
    /// Total requests handled
    pub requests_handled: AtomicU64,
    /// Requests answered with a server error
    pub server_errors: AtomicU64,
    /// Requests by route
    requests_by_route: RwLock<HashMap<String, u64>>,
    /// Prediction latencies per model (in microseconds)
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Failed predictions per model
    model_failures: RwLock<HashMap<String, u64>>,
    /// Start time for uptime and rate calculation
    start_time: Instant,
}

impl PortalMetrics {
    pub fn new() -> Self {
        Self {
            requests_handled: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            requests_by_route: RwLock::new(HashMap::new()),
            model_times: RwLock::new(HashMap::new()),
            model_failures: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a handled request
    pub fn record_request(&self, route: &str) {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_route) = self.requests_by_route.write() {
            *by_route.entry(route.to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a prediction and how long it took
    pub fn record_prediction(&self, model_name: &str, duration: Duration, succeeded: bool) {
        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model_name.to_string()).or_default();
            model_times.push(duration.as_micros() as u64);
            // Keep only last 1000 per model
            if model_times.len() > 1000 {
                model_times.drain(0..500);
            }
        }

        if !succeeded {
            if let Ok(mut failures) = self.model_failures.write() {
                *failures.entry(model_name.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Get prediction statistics per model
    pub fn get_model_stats(&self) -> BTreeMap<String, ModelStats> {
        let mut stats = BTreeMap::new();
        let Ok(times) = self.model_times.read() else {
            return stats;
        };
        let failures = self
            .model_failures
            .read()
            .map(|f| f.clone())
            .unwrap_or_default();

        for (model, model_times) in times.iter() {
            if model_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = model_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();
            let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

            stats.insert(
                model.clone(),
                ModelStats {
                    calls: count as u64,
                    failures: failures.get(model).copied().unwrap_or(0),
                    mean_us: sum / count as u64,
                    p50_us: percentile(0.5),
                    p95_us: percentile(0.95),
                    p99_us: percentile(0.99),
                },
            );
        }

        stats
    }

    /// Get requests by route
    pub fn get_requests_by_route(&self) -> BTreeMap<String, u64> {
        self.requests_by_route
            .read()
            .map(|r| r.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Requests per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_handled.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests_handled.load(Ordering::Relaxed);
        let errors = self.server_errors.load(Ordering::Relaxed);

        info!(
            requests,
            server_errors = errors,
            throughput = format!("{:.2} req/s", self.get_throughput()),
            uptime_secs = self.uptime().as_secs(),
            "Portal metrics summary"
        );

        for (route, count) in self.get_requests_by_route() {
            info!(route = %route, count, "Requests by route");
        }

        for (model, stats) in self.get_model_stats() {
            info!(
                model = %model,
                calls = stats.calls,
                failures = stats.failures,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p95_us = stats.p95_us,
                p99_us = stats.p99_us,
                "Prediction latency"
            );
        }
    }
}

impl Default for PortalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model-specific statistics
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub calls: u64,
    pub failures: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

/// Periodic summary logger
pub struct MetricsReporter {
    metrics: Arc<PortalMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PortalMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately; skip it so the first summary
        // lands one interval after startup.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
