//! Observability infrastructure for the optimizer
//!
//! Provides:
//! - Prometheus metrics (cycle latency, pricing latency, account progress, totals)
//! - Structured JSON logging with tracing

use crate::aggregator::Totals;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle and fetch latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OptimizerMetricsInner> = OnceLock::new();

struct OptimizerMetricsInner {
    cycle_latency_seconds: Histogram,
    pricing_latency_seconds: Histogram,
    cycles_total: IntCounter,
    accounts_total: IntGauge,
    accounts_completed: IntGauge,
    instances_processed: IntGauge,
    sample_query_errors: IntCounter,
    pricing_errors: IntCounter,
    optimized_cost: Gauge,
    non_optimized_cost: Gauge,
    saving: Gauge,
}

impl OptimizerMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "cloud_optimize_cycle_latency_seconds",
                "Time spent on a full fetch cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            pricing_latency_seconds: register_histogram!(
                "cloud_optimize_pricing_latency_seconds",
                "Time spent fetching regional pricing",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pricing_latency_seconds"),

            cycles_total: register_int_counter!(
                "cloud_optimize_cycles_total",
                "Total number of fetch cycles started"
            )
            .expect("Failed to register cycles_total"),

            accounts_total: register_int_gauge!(
                "cloud_optimize_accounts",
                "Number of accounts in the current cycle"
            )
            .expect("Failed to register accounts"),

            accounts_completed: register_int_gauge!(
                "cloud_optimize_accounts_completed",
                "Number of accounts completed in the current cycle"
            )
            .expect("Failed to register accounts_completed"),

            instances_processed: register_int_gauge!(
                "cloud_optimize_instances",
                "Number of instance records in the current view"
            )
            .expect("Failed to register instances"),

            sample_query_errors: register_int_counter!(
                "cloud_optimize_sample_query_errors_total",
                "Total number of per-account telemetry query failures"
            )
            .expect("Failed to register sample_query_errors"),

            pricing_errors: register_int_counter!(
                "cloud_optimize_pricing_errors_total",
                "Total number of pricing fetch failures"
            )
            .expect("Failed to register pricing_errors"),

            optimized_cost: register_gauge!(
                "cloud_optimize_optimized_monthly_cost",
                "Monthly cost with every recommendation applied"
            )
            .expect("Failed to register optimized_cost"),

            non_optimized_cost: register_gauge!(
                "cloud_optimize_non_optimized_monthly_cost",
                "Monthly cost as currently provisioned"
            )
            .expect("Failed to register non_optimized_cost"),

            saving: register_gauge!(
                "cloud_optimize_monthly_saving",
                "Potential monthly saving"
            )
            .expect("Failed to register saving"),
        }
    }
}

/// Optimizer metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct OptimizerMetrics {
    _private: (),
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OptimizerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn observe_pricing_latency(&self, duration_secs: f64) {
        self.inner().pricing_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cycles(&self) {
        self.inner().cycles_total.inc();
    }

    /// Update per-cycle account progress
    pub fn set_account_progress(&self, completed: usize, total: usize) {
        self.inner().accounts_completed.set(completed as i64);
        self.inner().accounts_total.set(total as i64);
    }

    pub fn inc_sample_query_errors(&self) {
        self.inner().sample_query_errors.inc();
    }

    pub fn inc_pricing_errors(&self) {
        self.inner().pricing_errors.inc();
    }

    /// Mirror the current global totals
    pub fn set_totals(&self, totals: &Totals) {
        let inner = self.inner();
        inner.instances_processed.set(totals.instance_count as i64);
        inner.optimized_cost.set(totals.optimized_cost);
        inner.non_optimized_cost.set(totals.non_optimized_cost);
        inner.saving.set(totals.saving);
    }
}

/// Structured logger for optimizer events
///
/// Provides consistent JSON-formatted logging for cycles, account
/// completions and config changes.
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Log the start of a fetch cycle
    pub fn log_cycle_started(&self, generation: u64) {
        info!(
            event = "cycle_started",
            component = %self.component,
            generation = generation,
            "Fetch cycle started"
        );
    }

    /// Log one account's completion
    pub fn log_account_completed(
        &self,
        generation: u64,
        account_id: i64,
        account_name: &str,
        instances: usize,
        completed: usize,
        total: usize,
    ) {
        info!(
            event = "account_completed",
            component = %self.component,
            generation = generation,
            account_id = account_id,
            account_name = %account_name,
            instances = instances,
            completed_accounts = completed,
            total_accounts = total,
            "Account samples merged"
        );
    }

    /// Log a per-account failure; the cycle continues
    pub fn log_account_failed(&self, generation: u64, account_id: i64, error: &str) {
        warn!(
            event = "account_failed",
            component = %self.component,
            generation = generation,
            account_id = account_id,
            error = %error,
            "Account sample query failed, skipping account"
        );
    }

    /// Log the end of a fetch cycle
    pub fn log_cycle_complete(&self, generation: u64, totals: &Totals, elapsed_ms: u128) {
        info!(
            event = "cycle_complete",
            component = %self.component,
            generation = generation,
            instances = totals.instance_count,
            optimized_count = totals.optimized_count,
            non_optimized_count = totals.non_optimized_count,
            stale_count = totals.stale_count,
            non_optimized_cost = totals.non_optimized_cost,
            optimized_cost = totals.optimized_cost,
            saving = totals.saving,
            elapsed_ms = elapsed_ms,
            "Fetch cycle complete"
        );
    }

    /// Log an aborted cycle
    pub fn log_cycle_aborted(&self, generation: u64, reason: &str) {
        warn!(
            event = "cycle_aborted",
            component = %self.component,
            generation = generation,
            reason = %reason,
            "Fetch cycle aborted"
        );
    }

    /// Log a config change
    pub fn log_config_updated(&self, trigger: &str, persisted: bool) {
        if persisted {
            info!(
                event = "config_updated",
                component = %self.component,
                trigger = %trigger,
                "Config updated"
            );
        } else {
            warn!(
                event = "config_updated",
                component = %self.component,
                trigger = %trigger,
                persisted = false,
                "Config updated but could not be persisted"
            );
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "optimizer_started",
            component = %self.component,
            version = %version,
            "Cloud optimizer started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "optimizer_shutdown",
            component = %self.component,
            reason = %reason,
            "Cloud optimizer shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_metrics_creation() {
        // Metrics live in the global Prometheus registry, so repeated handles
        // must share one registration.
        let metrics = OptimizerMetrics::new();
        let again = OptimizerMetrics::new();

        metrics.observe_cycle_latency(0.5);
        metrics.observe_pricing_latency(0.1);
        metrics.inc_cycles();
        again.set_account_progress(1, 2);
        again.inc_sample_query_errors();
        again.inc_pricing_errors();
        metrics.set_totals(&Totals::default());
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("controller");
        assert_eq!(logger.component, "controller");
    }
}
