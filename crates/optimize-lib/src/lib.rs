//! Cloud cost optimization library
//!
//! This crate provides the core functionality for:
//! - Per-instance cost derivation and right-sizing recommendations
//! - Grouping, totals and ordering of instance records
//! - Incremental fetch-cycle orchestration across accounts
//! - Regional on-demand pricing and file-backed collaborators
//! - Health checks and observability

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod processor;
pub mod sources;

pub use aggregator::{aggregate, AggregateView, Group, Totals, UNGROUPED};
pub use config::{Config, ConfigUpdate, GroupBy, SortBy, SortDirection, Trigger};
pub use controller::{
    Collaborators, CycleOutcome, OptimizationController, OptimizationView, Phase,
};
pub use error::{OptimizeError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{OptimizerMetrics, StructuredLogger};
pub use pricing::{PriceEntry, PricingCatalog};
pub use processor::{process_sample, HOURS_PER_MONTH};
