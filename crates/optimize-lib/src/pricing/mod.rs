//! On-demand pricing catalog
//!
//! The catalog maps `(instance type, region)` to an hourly on-demand price
//! together with the instance shape used for right-sizing. It is built once
//! per region fetch and is read-only during a processing pass.

mod parser;
mod provider;

pub use parser::parse_region_pricing;
pub use provider::{HttpPricingProvider, PricingProviderConfig, DEFAULT_PRICING_BASE_URL};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Price and shape of one instance type in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub instance_type: String,
    pub region: String,
    pub hourly_price: f64,
    pub vcpu: u32,
    pub memory_gib: f64,
}

impl PriceEntry {
    pub fn family(&self) -> &str {
        instance_family(&self.instance_type)
    }
}

/// Family portion of an instance type (`m5.large` -> `m5`)
pub fn instance_family(instance_type: &str) -> &str {
    instance_type
        .rsplit_once('.')
        .map(|(family, _)| family)
        .unwrap_or(instance_type)
}

/// Lookup of on-demand hourly prices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingCatalog {
    region: String,
    entries: HashMap<(String, String), PriceEntry>,
}

impl PricingCatalog {
    /// Create an empty catalog for a region
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            entries: HashMap::new(),
        }
    }

    /// Build a catalog from a list of entries; later duplicates win
    pub fn from_entries(region: impl Into<String>, entries: Vec<PriceEntry>) -> Self {
        let mut catalog = Self::new(region);
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    pub fn insert(&mut self, entry: PriceEntry) {
        self.entries.insert(
            (entry.instance_type.clone(), entry.region.clone()),
            entry,
        );
    }

    /// Region the catalog was fetched for
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, instance_type: &str, region: &str) -> Option<&PriceEntry> {
        self.entries
            .get(&(instance_type.to_string(), region.to_string()))
    }

    /// Entry for a type in `region`, falling back to the catalog's own region
    /// when that region is not priced
    pub fn lookup(&self, instance_type: &str, region: &str) -> Option<&PriceEntry> {
        self.entry(instance_type, region)
            .or_else(|| self.entry(instance_type, &self.region))
    }

    /// All entries of a family in a region, cheapest first, ties by type name
    pub fn family_entries(&self, family: &str, region: &str) -> Vec<&PriceEntry> {
        let mut entries: Vec<&PriceEntry> = self
            .entries
            .values()
            .filter(|e| e.region == region && e.family() == family)
            .collect();

        entries.sort_by(|a, b| {
            a.hourly_price
                .total_cmp(&b.hourly_price)
                .then_with(|| a.instance_type.cmp(&b.instance_type))
        });
        entries
    }
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

    #[test]
    fn test_instance_family() {
        assert_eq!(instance_family("m5.large"), "m5");
        assert_eq!(instance_family("m5d.2xlarge"), "m5d");
        assert_eq!(instance_family("custom"), "custom");
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = PricingCatalog::from_entries(
            "us-east-1",
            vec![entry("m5.large", 0.096, 2, 8.0)],
        );

        assert_eq!(
            catalog.entry("m5.large", "us-east-1").map(|e| e.hourly_price),
            Some(0.096)
        );
        assert!(catalog.entry("m5.large", "eu-west-1").is_none());
        assert!(catalog.entry("t3.nano", "us-east-1").is_none());
        assert_eq!(catalog.region(), "us-east-1");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_lookup_falls_back_to_catalog_region() {
        let catalog = PricingCatalog::from_entries(
            "us-east-1",
            vec![entry("m5.large", 0.096, 2, 8.0)],
        );

        let found = catalog.lookup("m5.large", "ap-south-1").unwrap();
        assert_eq!(found.region, "us-east-1");
        assert!(catalog.lookup("t3.nano", "ap-south-1").is_none());
    }

    #[test]
    fn test_family_entries_sorted_by_price() {
        let catalog = PricingCatalog::from_entries(
            "us-east-1",
            vec![
                entry("m5.xlarge", 0.192, 4, 16.0),
                entry("m5.large", 0.096, 2, 8.0),
                entry("c5.large", 0.085, 2, 4.0),
                entry("m5.2xlarge", 0.384, 8, 32.0),
            ],
        );

        let types: Vec<&str> = catalog
            .family_entries("m5", "us-east-1")
            .iter()
            .map(|e| e.instance_type.as_str())
            .collect();
        assert_eq!(types, vec!["m5.large", "m5.xlarge", "m5.2xlarge"]);
    }
}
