//! Accumulated results of an in-flight fetch cycle

use crate::config::Config;
use crate::error::OptimizeError;
use crate::models::{Account, AccountSamples, InstanceRecord};
use crate::pricing::PricingCatalog;
use crate::processor::process_sample;

/// Outcome of one account's sample fetch
#[derive(Debug)]
pub struct PartialResult {
    /// Cycle that issued the fetch
    pub generation: u64,
    /// Revision of the config and catalog `records` were derived under
    pub basis: u64,
    pub account: Account,
    pub samples: AccountSamples,
    pub records: Vec<InstanceRecord>,
    pub error: Option<OptimizeError>,
}

impl PartialResult {
    /// Derive records for an account's samples
    pub fn processed(
        generation: u64,
        account: Account,
        samples: AccountSamples,
        config: &Config,
        catalog: &PricingCatalog,
    ) -> Self {
        let records = derive_records(&account, &samples, config, catalog);
        Self {
            generation,
            basis: 0,
            account,
            samples,
            records,
            error: None,
        }
    }

    pub fn failed(generation: u64, account: Account, error: OptimizeError) -> Self {
        Self {
            generation,
            basis: 0,
            account,
            samples: AccountSamples::default(),
            records: Vec::new(),
            error: Some(error),
        }
    }

    pub fn with_basis(mut self, basis: u64) -> Self {
        self.basis = basis;
        self
    }

    /// Re-derive the records from the carried samples
    pub fn rederive(&mut self, basis: u64, config: &Config, catalog: &PricingCatalog) {
        self.records = derive_records(&self.account, &self.samples, config, catalog);
        self.basis = basis;
    }
}

/// How a partial result was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Records appended
    Merged,
    /// Account failed; only the completion counter moved
    Failed,
    /// Result belongs to a superseded cycle and was dropped
    Superseded,
}

/// Raw samples retained per account so records can be recomputed
#[derive(Debug, Clone)]
struct AccountBatch {
    account: Account,
    samples: AccountSamples,
}

/// Records collected so far in a fetch cycle
#[derive(Debug, Clone, Default)]
pub struct AccumulationState {
    generation: u64,
    batches: Vec<AccountBatch>,
    records: Vec<InstanceRecord>,
    completed_accounts: usize,
}

impl AccumulationState {
    /// Empty state for a cycle
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn completed_accounts(&self) -> usize {
        self.completed_accounts
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn instance_count(&self) -> usize {
        self.records.len()
    }

    /// Apply one account's result. Each call is a complete update: the
    /// records and the completion counter move together.
    pub fn merge(&mut self, partial: PartialResult) -> MergeOutcome {
        if partial.generation != self.generation {
            return MergeOutcome::Superseded;
        }

        self.completed_accounts += 1;

        if partial.error.is_some() {
            return MergeOutcome::Failed;
        }

        self.records.extend(partial.records);
        self.batches.push(AccountBatch {
            account: partial.account,
            samples: partial.samples,
        });
        MergeOutcome::Merged
    }

    /// Re-derive every record from the retained samples
    pub fn recompute(&mut self, config: &Config, catalog: &PricingCatalog) {
        self.records = self
            .batches
            .iter()
            .flat_map(|batch| derive_records(&batch.account, &batch.samples, config, catalog))
            .collect();
    }
}

fn derive_records(
    account: &Account,
    samples: &AccountSamples,
    config: &Config,
    catalog: &PricingCatalog,
) -> Vec<InstanceRecord> {
    samples
        .system_samples
        .iter()
        .map(|sample| process_sample(account, sample, config, &samples.network_samples, catalog))
        .collect()
}
