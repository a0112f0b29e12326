//! Fetch-cycle orchestration
//!
//! A cycle moves through `Idle → FetchingAccounts → FetchingPricing →
//! FetchingSamples → Aggregated → Idle`. Sample queries fan out as one task
//! per account; each task sends a [`PartialResult`] back over a channel and
//! the controller, as the only writer, merges it into the
//! [`AccumulationState`] and republishes the aggregated view. The view
//! therefore updates as accounts complete, in whatever order they finish.
//!
//! Sample tasks derive records from a read-only config and catalog snapshot.
//! Every snapshot carries a basis revision; when a recalculating config
//! update or a region change lands mid-cycle, later merges are re-derived
//! from their samples so the view never mixes two configs. Config mutations
//! are serialized, so concurrent updates never overwrite each other.

mod state;


pub use state::{AccumulationState, MergeOutcome, PartialResult};

use crate::aggregator::{aggregate, Group, Totals};
use crate::config::{Config, ConfigUpdate, Trigger};
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::models::Snapshot;
use crate::observability::{OptimizerMetrics, StructuredLogger};
use crate::pricing::PricingCatalog;
use crate::sources::{
    AccountSource, ConfigStore, PricingProvider, SampleQuery, SnapshotSource, TelemetrySource,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Stage of the current fetch cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    FetchingAccounts,
    FetchingPricing,
    FetchingSamples,
    Aggregated,
}

/// How a fetch cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { accounts: usize, instances: usize },
    /// Account discovery returned nothing
    NoAccounts,
    AccountQueryFailed,
    /// Pricing fetch failed before any sample was requested
    PricingFailed,
    /// A newer cycle started before this one reached sample fetch
    Superseded,
}

/// Read contract for the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationView {
    pub sorted_groups: Vec<Group>,
    pub totals: Totals,
    pub completed_accounts: usize,
    pub total_accounts: usize,
    pub instance_count: usize,
    pub generation: u64,
    pub phase: Phase,
}

/// External collaborators used by the controller
#[derive(Clone)]
pub struct Collaborators {
    pub config_store: Arc<dyn ConfigStore>,
    pub accounts: Arc<dyn AccountSource>,
    pub telemetry: Arc<dyn TelemetrySource>,
    pub pricing: Arc<dyn PricingProvider>,
    pub snapshots: Arc<dyn SnapshotSource>,
}

struct ControllerState {
    config: Config,
    catalog: Option<Arc<PricingCatalog>>,
    accumulation: AccumulationState,
    /// Revision of the config and catalog the records were derived under
    basis: u64,
    basis_config: Arc<Config>,
    total_accounts: usize,
    phase: Phase,
    /// Newest cycle started
    generation: u64,
}

/// Orchestrates fetch cycles and owns the accumulated pipeline state
pub struct OptimizationController {
    collaborators: Collaborators,
    state: RwLock<ControllerState>,
    /// Held across read, persist and apply of every config mutation
    config_lock: Mutex<()>,
    next_generation: AtomicU64,
    view_tx: watch::Sender<OptimizationView>,
    health: HealthRegistry,
    metrics: OptimizerMetrics,
    logger: StructuredLogger,
}

impl OptimizationController {
    pub fn new(collaborators: Collaborators) -> Self {
        let (view_tx, _) = watch::channel(OptimizationView::default());

        Self {
            collaborators,
            state: RwLock::new(ControllerState {
                config: Config::default(),
                catalog: None,
                accumulation: AccumulationState::default(),
                basis: 0,
                basis_config: Arc::new(Config::default()),
                total_accounts: 0,
                phase: Phase::Idle,
                generation: 0,
            }),
            config_lock: Mutex::new(()),
            next_generation: AtomicU64::new(0),
            view_tx,
            health: HealthRegistry::new(),
            metrics: OptimizerMetrics::new(),
            logger: StructuredLogger::new("controller"),
        }
    }

    /// Report collaborator health into a shared registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Latest published view
    pub fn view(&self) -> OptimizationView {
        self.view_tx.borrow().clone()
    }

    /// Receive every republished view
    pub fn subscribe(&self) -> watch::Receiver<OptimizationView> {
        self.view_tx.subscribe()
    }

    pub async fn config(&self) -> Config {
        self.state.read().await.config.clone()
    }

    /// Region of the pricing catalog in use, if one has been fetched
    pub async fn pricing_region(&self) -> Option<String> {
        self.state
            .read()
            .await
            .catalog
            .as_ref()
            .map(|c| c.region().to_string())
    }

    /// Load the stored config, writing and adopting defaults when absent
    /// or unreadable
    pub async fn init_config(&self) -> Config {
        let _guard = self.config_lock.lock().await;
        let loaded = self.collaborators.config_store.load_config().await;
        self.health.observe(components::CONFIG_STORE, &loaded).await;

        let config = match loaded {
            Ok(Some(config)) => {
                debug!("Loaded existing config");
                config
            }
            Ok(None) => {
                info!("No stored config, writing defaults");
                self.persist_defaults().await
            }
            Err(e) => {
                warn!(error = %e, "Failed to load config, writing defaults");
                self.persist_defaults().await
            }
        };

        self.state.write().await.config = config.clone();
        config
    }

    async fn persist_defaults(&self) -> Config {
        let config = Config::default();
        let saved = self.collaborators.config_store.save_config(&config).await;
        if let Err(e) = &saved {
            warn!(error = %e, "Failed to write default config");
        }
        self.health.observe(components::CONFIG_STORE, &saved).await;
        config
    }

    /// Run one fetch cycle to completion
    pub async fn run_cycle(&self) -> CycleOutcome {
        let started = Instant::now();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.inc_cycles();
        self.logger.log_cycle_started(generation);

        {
            let mut state = self.state.write().await;
            if generation > state.generation {
                state.generation = generation;
            }
        }
        if !self.set_phase(generation, Phase::FetchingAccounts).await {
            return CycleOutcome::Superseded;
        }

        let listed = self.collaborators.accounts.list_accounts().await;
        self.health.observe(components::ACCOUNTS, &listed).await;

        let accounts = match listed {
            Ok(accounts) if accounts.is_empty() => {
                self.logger.log_cycle_aborted(generation, "no accounts");
                self.reset_empty(generation).await;
                return CycleOutcome::NoAccounts;
            }
            Ok(accounts) => accounts,
            Err(e) => {
                self.logger
                    .log_cycle_aborted(generation, &format!("account query failed: {}", e));
                self.reset_empty(generation).await;
                return CycleOutcome::AccountQueryFailed;
            }
        };

        if !self.set_phase(generation, Phase::FetchingPricing).await {
            return CycleOutcome::Superseded;
        }

        let config = self.config().await;
        let region = config.pricing_region().to_string();
        let catalog = match self.fetch_pricing(&region).await {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                self.logger
                    .log_cycle_aborted(generation, &format!("pricing fetch failed: {}", e));
                self.set_phase(generation, Phase::Idle).await;
                return CycleOutcome::PricingFailed;
            }
        };

        let (config, catalog, basis) = {
            let mut state = self.state.write().await;
            if state.generation != generation {
                return CycleOutcome::Superseded;
            }
            // A region change during the pricing fetch already installed
            // the catalog for the active region
            let active = state.config.pricing_region().to_string();
            let catalog = match &state.catalog {
                Some(current) if catalog.region() != active && current.region() == active => {
                    Arc::clone(current)
                }
                _ => catalog,
            };
            state.catalog = Some(Arc::clone(&catalog));
            state.basis += 1;
            state.basis_config = Arc::new(state.config.clone());
            state.accumulation = AccumulationState::new(generation);
            state.total_accounts = accounts.len();
            state.phase = Phase::FetchingSamples;
            self.publish(&state);
            (Arc::clone(&state.basis_config), catalog, state.basis)
        };

        let total = accounts.len();
        let query = SampleQuery::from_config(&config);
        let (tx, mut rx) = mpsc::channel(total);

        for account in accounts {
            let tx = tx.clone();
            let telemetry = Arc::clone(&self.collaborators.telemetry);
            let config = Arc::clone(&config);
            let catalog = Arc::clone(&catalog);

            tokio::spawn(async move {
                let partial = match telemetry.query_instance_samples(&account, query).await {
                    Ok(samples) => {
                        PartialResult::processed(generation, account, samples, &config, &catalog)
                            .with_basis(basis)
                    }
                    Err(e) => PartialResult::failed(generation, account, e).with_basis(basis),
                };
                // Receiver outlives every sender unless the controller is gone
                let _ = tx.send(partial).await;
            });
        }
        drop(tx);

        let mut failures = 0usize;
        while let Some(partial) = rx.recv().await {
            if self.merge(partial).await == MergeOutcome::Failed {
                failures += 1;
            }
        }

        if failures == 0 {
            self.health.set_healthy(components::TELEMETRY).await;
        } else {
            self.health
                .set_degraded(
                    components::TELEMETRY,
                    format!("{} of {} account queries failed", failures, total),
                )
                .await;
        }

        self.finish_cycle(generation, started).await
    }

    async fn finish_cycle(&self, generation: u64, started: Instant) -> CycleOutcome {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return CycleOutcome::Superseded;
        }

        state.phase = Phase::Aggregated;
        self.publish(&state);

        let view = self.view();
        let elapsed = started.elapsed();
        self.metrics.observe_cycle_latency(elapsed.as_secs_f64());
        self.logger
            .log_cycle_complete(generation, &view.totals, elapsed.as_millis());

        state.phase = Phase::Idle;
        self.publish(&state);
        drop(state);

        self.health.set_ready(true).await;

        CycleOutcome::Completed {
            accounts: view.completed_accounts,
            instances: view.instance_count,
        }
    }

    async fn fetch_pricing(&self, region: &str) -> Result<PricingCatalog> {
        let started = Instant::now();
        let fetched = self.collaborators.pricing.fetch_region_pricing(region).await;
        self.metrics
            .observe_pricing_latency(started.elapsed().as_secs_f64());
        self.health.observe(components::PRICING, &fetched).await;

        if let Err(e) = &fetched {
            self.metrics.inc_pricing_errors();
            warn!(region = %region, error = %e, "Pricing fetch failed, keeping previous catalog");
        }
        fetched
    }

    /// Apply one account's result and republish
    async fn merge(&self, mut partial: PartialResult) -> MergeOutcome {
        let generation = partial.generation;
        let account_id = partial.account.id;
        let account_name = partial.account.name.clone();
        let error = partial.error.as_ref().map(|e| e.to_string());

        let mut state = self.state.write().await;
        if partial.basis != state.basis && partial.generation == state.accumulation.generation() {
            if let Some(catalog) = state.catalog.clone() {
                debug!(
                    account_id = account_id,
                    basis = partial.basis,
                    current_basis = state.basis,
                    "Re-deriving result under the updated config"
                );
                let config = Arc::clone(&state.basis_config);
                partial.rederive(state.basis, &config, &catalog);
            }
        }
        let instances = partial.records.len();
        let outcome = state.accumulation.merge(partial);
        let completed = state.accumulation.completed_accounts();
        let total = state.total_accounts;

        match outcome {
            MergeOutcome::Superseded => {
                debug!(
                    generation = generation,
                    current_generation = state.accumulation.generation(),
                    account_id = account_id,
                    "Dropping result from superseded cycle"
                );
                return outcome;
            }
            MergeOutcome::Failed => {
                self.metrics.inc_sample_query_errors();
                self.logger.log_account_failed(
                    generation,
                    account_id,
                    error.as_deref().unwrap_or_default(),
                );
            }
            MergeOutcome::Merged => {
                self.logger.log_account_completed(
                    generation,
                    account_id,
                    &account_name,
                    instances,
                    completed,
                    total,
                );
            }
        }

        self.metrics.set_account_progress(completed, total);
        self.publish(&state);
        outcome
    }

    /// Regroup and resort the accumulated records under the current config
    pub async fn regroup(&self) {
        let state = self.state.read().await;
        self.publish(&state);
    }

    /// Recompute records from retained samples, then regroup
    pub async fn recalculate(&self) {
        let mut state = self.state.write().await;
        Self::recompute(&mut state);
        self.publish(&state);
    }

    /// Re-derive under the active config and catalog, starting a new basis
    fn recompute(state: &mut ControllerState) {
        if let Some(catalog) = state.catalog.clone() {
            let config = Arc::new(state.config.clone());
            state.accumulation.recompute(&config, &catalog);
            state.basis += 1;
            state.basis_config = config;
        }
    }

    /// Apply a partial config update, persist it and act on the trigger.
    ///
    /// Only already-accumulated data is used; nothing is re-fetched.
    pub async fn update_config(&self, update: ConfigUpdate, trigger: Trigger) -> Config {
        let _guard = self.config_lock.lock().await;
        let next = update.apply(&self.config().await);

        let saved = self.collaborators.config_store.save_config(&next).await;
        if let Err(e) = &saved {
            warn!(error = %e, "Failed to persist config update");
        }
        self.health.observe(components::CONFIG_STORE, &saved).await;
        self.logger.log_config_updated(trigger.as_str(), saved.is_ok());

        let mut state = self.state.write().await;
        state.config = next.clone();
        match trigger {
            Trigger::None => {}
            Trigger::GroupAndSort => self.publish(&state),
            Trigger::GroupAndSortRecalc => {
                Self::recompute(&mut state);
                self.publish(&state);
            }
        }

        next
    }

    /// Switch the pricing region: fetch its catalog, persist the region and
    /// recompute retained samples. On failure the previous catalog stays.
    pub async fn change_region(&self, region: &str) -> Result<()> {
        let catalog = self.fetch_pricing(region).await?;

        let _guard = self.config_lock.lock().await;
        let next = {
            let mut state = self.state.write().await;
            state.catalog = Some(Arc::new(catalog));
            state.config.aws_pricing_region = region.to_string();
            Self::recompute(&mut state);
            self.publish(&state);
            state.config.clone()
        };

        let saved = self.collaborators.config_store.save_config(&next).await;
        if let Err(e) = &saved {
            warn!(error = %e, "Failed to persist pricing region");
        }
        self.health.observe(components::CONFIG_STORE, &saved).await;

        info!(region = %region, "Pricing region changed");
        Ok(())
    }

    /// Stored snapshots, newest first
    pub async fn list_snapshots(&self) -> Vec<Snapshot> {
        match self.collaborators.snapshots.list_snapshots().await {
            Ok(mut snapshots) => {
                snapshots.reverse();
                snapshots
            }
            Err(e) => {
                warn!(error = %e, "Failed to list snapshots");
                Vec::new()
            }
        }
    }

    /// Run fetch cycles on an interval until shutdown
    pub async fn run_periodic(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(interval_secs = period.as_secs(), "Starting fetch cycle loop");
        let mut ticker = interval(period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.run_cycle().await;
                    debug!(outcome = ?outcome, "Fetch cycle finished");
                }
                _ = shutdown.recv() => {
                    info!("Shutting down fetch cycle loop");
                    break;
                }
            }
        }
    }

    async fn set_phase(&self, generation: u64, phase: Phase) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }
        state.phase = phase;
        self.publish(&state);
        true
    }

    /// Empty view for a cycle that ended before sample fetch
    async fn reset_empty(&self, generation: u64) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return;
        }
        state.accumulation = AccumulationState::new(generation);
        state.total_accounts = 0;
        state.phase = Phase::Idle;
        self.publish(&state);
    }

    fn publish(&self, state: &ControllerState) {
        let view = aggregate(
            state.accumulation.records(),
            state.config.group_by,
            state.config.sort_by,
            state.config.sort,
        );
        self.metrics.set_totals(&view.totals);

        self.view_tx.send_replace(OptimizationView {
            sorted_groups: view.groups,
            totals: view.totals,
            completed_accounts: state.accumulation.completed_accounts(),
            total_accounts: state.total_accounts,
            instance_count: state.accumulation.instance_count(),
            generation: state.generation,
            phase: state.phase,
        });
    }
}
