//! Per-sample cost and optimization derivation
//!
//! Turns one raw telemetry sample into an [`InstanceRecord`]. Processing is a
//! pure function of its inputs and never fails: unknown instance types simply
//! yield a zero-cost, non-optimized record.

use crate::config::Config;
use crate::models::{
    Account, Classification, InstanceRecord, NetworkSample, RawSample, Recommendation,
};
use crate::pricing::{instance_family, PriceEntry, PricingCatalog};

/// Hours in the monthly cost basis
pub const HOURS_PER_MONTH: f64 = 720.0;

/// Converts hourly prices into period and monthly figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBasis {
    discount_multiplier: f64,
    period_hours: f64,
}

impl CostBasis {
    pub fn from_config(config: &Config) -> Self {
        Self {
            discount_multiplier: config.discount_multiplier,
            period_hours: f64::from(config.last_report_period),
        }
    }

    /// Discounted hourly cost
    pub fn hourly(&self, list_price: f64) -> f64 {
        list_price * self.discount_multiplier
    }

    /// Discounted cost over the telemetry window
    pub fn period(&self, list_price: f64) -> f64 {
        self.hourly(list_price) * self.period_hours
    }

    /// Discounted monthly cost
    pub fn monthly(&self, list_price: f64) -> f64 {
        self.hourly(list_price) * HOURS_PER_MONTH
    }
}

/// Derive an instance record from a raw sample
pub fn process_sample(
    account: &Account,
    sample: &RawSample,
    config: &Config,
    network_samples: &[NetworkSample],
    catalog: &PricingCatalog,
) -> InstanceRecord {
    let (receive, transmit) = network_samples
        .iter()
        .find(|n| n.instance_id == sample.instance_id)
        .map(|n| (n.receive_bytes_per_second, n.transmit_bytes_per_second))
        .unwrap_or((0.0, 0.0));

    let basis = CostBasis::from_config(config);
    let current = catalog.lookup(&sample.instance_type, &sample.region);
    let list_price = current.map(|e| e.hourly_price);
    let current_list = list_price.unwrap_or(0.0);

    let stale = is_stale(sample, receive, transmit, config);

    let recommendation = match current {
        Some(entry) if !stale && wants_right_size(sample, config) => {
            find_smaller_type(entry, current_shape(entry, sample), config, catalog)
        }
        _ => None,
    };

    let classification = if stale {
        Classification::Stale
    } else if recommendation.is_some() {
        Classification::Optimized
    } else {
        Classification::NonOptimized
    };

    let optimized_list = recommendation
        .as_ref()
        .map(|r| r.hourly_price)
        .unwrap_or(current_list);

    InstanceRecord {
        account_id: account.id,
        account_name: account.name.clone(),
        instance_id: sample.instance_id.clone(),
        instance_type: sample.instance_type.clone(),
        instance_family: instance_family(&sample.instance_type).to_string(),
        region: sample.region.clone(),
        hostname: sample.hostname.clone(),
        cpu_percent: sample.cpu_percent,
        memory_percent: sample.memory_percent,
        receive_bytes_per_second: receive,
        transmit_bytes_per_second: transmit,
        list_price_hourly: list_price,
        current_hourly_cost: basis.hourly(current_list),
        current_cost: basis.monthly(current_list),
        period_cost: basis.period(current_list),
        recommendation,
        optimized_hourly_cost: basis.hourly(optimized_list),
        optimized_cost: basis.monthly(optimized_list),
        classification,
    }
}

/// Idle on CPU, memory and both network directions
fn is_stale(sample: &RawSample, receive: f64, transmit: f64, config: &Config) -> bool {
    sample.cpu_percent < config.stale_instance_cpu
        && sample.memory_percent < config.stale_instance_mem
        && receive <= config.stale_receive_bytes_per_second
        && transmit <= config.stale_transmit_bytes_per_second
}

fn wants_right_size(sample: &RawSample, config: &Config) -> bool {
    sample.cpu_percent / 100.0 < config.right_size_cpu
        && sample.memory_percent / 100.0 < config.right_size_mem
}

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// vCPU count and memory of the running instance. The catalog is preferred;
/// the sample's reported shape fills attributes the price list left blank.
fn current_shape(entry: &PriceEntry, sample: &RawSample) -> (f64, f64) {
    let vcpu = match (entry.vcpu, sample.num_cpu) {
        (0, Some(reported)) => reported,
        (listed, _) => listed,
    };
    let memory_gib = match sample.memory_total_bytes {
        Some(bytes) if entry.memory_gib <= 0.0 => bytes as f64 / BYTES_PER_GIB,
        _ => entry.memory_gib,
    };
    (f64::from(vcpu), memory_gib)
}

/// Cheapest cheaper type of the same family that still covers the scaled-down shape
fn find_smaller_type(
    current: &PriceEntry,
    (vcpu, memory_gib): (f64, f64),
    config: &Config,
    catalog: &PricingCatalog,
) -> Option<Recommendation> {
    let min_vcpu = vcpu * config.right_size_cpu;
    let min_memory = memory_gib * config.right_size_mem;
    let allowed = config.allowed_instance_options();

    catalog
        .family_entries(current.family(), &current.region)
        .into_iter()
        .filter(|candidate| candidate.instance_type != current.instance_type)
        .filter(|candidate| candidate.hourly_price < current.hourly_price)
        .filter(|candidate| f64::from(candidate.vcpu) >= min_vcpu)
        .filter(|candidate| candidate.memory_gib >= min_memory)
        .find(|candidate| is_allowed(allowed, candidate))
        .map(|candidate| Recommendation {
            instance_type: candidate.instance_type.clone(),
            hourly_price: candidate.hourly_price,
            vcpu: candidate.vcpu,
            memory_gib: candidate.memory_gib,
        })
}

/// An empty list allows everything; entries match a full type or a family
fn is_allowed(allowed: &[String], candidate: &PriceEntry) -> bool {
    allowed.is_empty()
        || allowed
            .iter()
            .any(|option| option == &candidate.instance_type || option == candidate.family())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(instance_type: &str, price: f64, vcpu: u32, mem: f64) -> PriceEntry {
        PriceEntry {
            instance_type: instance_type.to_string(),
            region: "us-east-1".to_string(),
            hourly_price: price,
            vcpu,
            memory_gib: mem,
        }
    }

    fn catalog() -> PricingCatalog {
        PricingCatalog::from_entries(
            "us-east-1",
            vec![
                entry("m5.large", 0.02, 2, 8.0),
                entry("m5.xlarge", 0.04, 4, 16.0),
                entry("m5.2xlarge", 0.08, 8, 32.0),
                entry("t3.micro", 0.01, 2, 1.0),
            ],
        )
    }

    fn sample(instance_type: &str, cpu: f64, mem: f64) -> RawSample {
        RawSample {
            instance_id: "i-0001".to_string(),
            instance_type: instance_type.to_string(),
            region: "us-east-1".to_string(),
            cpu_percent: cpu,
            memory_percent: mem,
            ..Default::default()
        }
    }

    fn account() -> Account {
        Account::new(1, "production")
    }

    #[test]
    fn test_stale_instance() {
        let config = Config::default();
        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 3.0, 4.0),
            &config,
            &[],
            &catalog(),
        );

        assert_eq!(record.classification, Classification::Stale);
        assert!(record.recommendation.is_none());
        assert_eq!(record.optimized_cost, record.current_cost);
    }

    #[test]
    fn test_network_activity_prevents_staleness() {
        let config = Config::default();
        let network = vec![NetworkSample {
            instance_id: "i-0001".to_string(),
            receive_bytes_per_second: 2048.0,
            transmit_bytes_per_second: 0.0,
        }];

        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 3.0, 4.0),
            &config,
            &network,
            &catalog(),
        );

        assert_ne!(record.classification, Classification::Stale);
        assert_eq!(record.receive_bytes_per_second, 2048.0);
    }

    #[test]
    fn test_network_sample_for_other_instance_is_ignored() {
        let network = vec![NetworkSample {
            instance_id: "i-other".to_string(),
            receive_bytes_per_second: 1e6,
            transmit_bytes_per_second: 1e6,
        }];

        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 3.0, 4.0),
            &Config::default(),
            &network,
            &catalog(),
        );

        assert_eq!(record.classification, Classification::Stale);
        assert_eq!(record.transmit_bytes_per_second, 0.0);
    }

    #[test]
    fn test_right_size_to_smaller_type() {
        let config = Config::default();
        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 30.0, 20.0),
            &config,
            &[],
            &catalog(),
        );

        assert_eq!(record.classification, Classification::Optimized);
        let recommendation = record.recommendation.as_ref().unwrap();
        assert_eq!(recommendation.instance_type, "m5.large");
        assert!((record.optimized_cost - 0.02 * HOURS_PER_MONTH).abs() < 1e-9);
        assert!((record.current_cost - 0.04 * HOURS_PER_MONTH).abs() < 1e-9);
        assert!(record.optimized_cost <= record.current_cost);
    }

    #[test]
    fn test_busy_instance_is_not_right_sized() {
        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 80.0, 20.0),
            &Config::default(),
            &[],
            &catalog(),
        );

        assert_eq!(record.classification, Classification::NonOptimized);
        assert_eq!(record.optimized_cost, record.current_cost);
    }

    #[test]
    fn test_no_smaller_type_available() {
        let record = process_sample(
            &account(),
            &sample("m5.large", 10.0, 10.0),
            &Config::default(),
            &[],
            &catalog(),
        );

        // m5.large is the smallest of its family and t3 is another family
        assert_eq!(record.classification, Classification::NonOptimized);
        assert!(record.recommendation.is_none());
        assert_eq!(record.optimized_cost, record.current_cost);
    }

    #[test]
    fn test_substitution_list_restricts_candidates() {
        let config = Config {
            instance_options_current: vec!["m5.2xlarge".to_string()],
            ..Default::default()
        };
        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 30.0, 20.0),
            &config,
            &[],
            &catalog(),
        );
        assert_eq!(record.classification, Classification::NonOptimized);

        let config = Config {
            instance_options: vec!["m5".to_string()],
            ..Default::default()
        };
        let record = process_sample(
            &account(),
            &sample("m5.xlarge", 30.0, 20.0),
            &config,
            &[],
            &catalog(),
        );
        assert_eq!(record.classification, Classification::Optimized);
    }

    #[test]
    fn test_unmapped_instance_type() {
        let record = process_sample(
            &account(),
            &sample("z9.mega", 30.0, 20.0),
            &Config::default(),
            &[],
            &catalog(),
        );

        assert_eq!(record.classification, Classification::NonOptimized);
        assert_eq!(record.list_price_hourly, None);
        assert_eq!(record.current_cost, 0.0);
        assert_eq!(record.optimized_cost, 0.0);
        assert_eq!(record.instance_family, "z9");
    }

    #[test]
    fn test_discount_and_period_costs() {
        let config = Config {
            discount_multiplier: 0.5,
            last_report_period: 168,
            ..Default::default()
        };
        let record = process_sample(
            &account(),
            &sample("m5.2xlarge", 90.0, 90.0),
            &config,
            &[],
            &catalog(),
        );

        assert!((record.current_hourly_cost - 0.04).abs() < 1e-12);
        assert!((record.period_cost - 0.04 * 168.0).abs() < 1e-9);
        assert!((record.current_cost - 0.04 * HOURS_PER_MONTH).abs() < 1e-9);
    }

    #[test]
    fn test_reported_shape_fills_blank_catalog_attributes() {
        let catalog = PricingCatalog::from_entries(
            "us-east-1",
            vec![
                entry("m5.large", 0.02, 2, 8.0),
                entry("m5.2xlarge", 0.08, 8, 32.0),
                entry("m5.4xlarge", 0.16, 0, 0.0),
            ],
        );
        let raw = RawSample {
            num_cpu: Some(16),
            memory_total_bytes: Some(64 * 1024 * 1024 * 1024),
            ..sample("m5.4xlarge", 30.0, 20.0)
        };

        let record = process_sample(&account(), &raw, &Config::default(), &[], &catalog);

        assert_eq!(record.classification, Classification::Optimized);
        assert_eq!(
            record.recommendation.as_ref().unwrap().instance_type,
            "m5.2xlarge"
        );
    }

    #[test]
    fn test_processing_is_pure() {
        let config = Config::default();
        let catalog = catalog();
        let raw = sample("m5.xlarge", 30.0, 20.0);

        let first = process_sample(&account(), &raw, &config, &[], &catalog);
        let second = process_sample(&account(), &raw, &config, &[], &catalog);
        assert_eq!(first, second);
    }
}
