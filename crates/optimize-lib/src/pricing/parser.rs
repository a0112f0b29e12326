//! Parser for the regional EC2 on-demand pricing document
//!
//! The document is a list of `prices`, each carrying a USD price string and
//! an `attributes` map keyed by `aws:ec2:*` names.

use super::{PriceEntry, PricingCatalog};
use crate::error::{OptimizeError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const ATTR_INSTANCE_TYPE: &str = "aws:ec2:instanceType";
const ATTR_VCPU: &str = "aws:ec2:vcpu";
const ATTR_MEMORY: &str = "aws:ec2:memory";
const ATTR_REGION: &str = "aws:region";

#[derive(Debug, Deserialize)]
struct PricingDocument {
    prices: Vec<PriceItem>,
}

#[derive(Debug, Deserialize)]
struct PriceItem {
    #[serde(default)]
    price: HashMap<String, String>,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

/// Parse a pricing document fetched for `region` into a catalog.
///
/// Items missing a type or a parsable USD price are skipped. A document
/// without a `prices` array is rejected as a whole.
pub fn parse_region_pricing(region: &str, body: &[u8]) -> Result<PricingCatalog> {
    let document: PricingDocument = serde_json::from_slice(body)
        .map_err(|e| OptimizeError::PricingParse(e.to_string()))?;

    let mut catalog = PricingCatalog::new(region);
    let mut skipped = 0usize;

    for item in document.prices {
        match parse_item(region, &item) {
            Some(entry) => catalog.insert(entry),
            None => skipped += 1,
        }
    }

    debug!(
        region = %region,
        entries = catalog.len(),
        skipped = skipped,
        "Parsed pricing document"
    );

    Ok(catalog)
}

fn parse_item(region: &str, item: &PriceItem) -> Option<PriceEntry> {
    let instance_type = item.attributes.get(ATTR_INSTANCE_TYPE)?.trim();
    if instance_type.is_empty() {
        return None;
    }

    let hourly_price = item.price.get("USD")?.trim().parse::<f64>().ok()?;

    let vcpu = item
        .attributes
        .get(ATTR_VCPU)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0);

    let memory_gib = item
        .attributes
        .get(ATTR_MEMORY)
        .and_then(|m| parse_memory_gib(m))
        .unwrap_or(0.0);

    let entry_region = item
        .attributes
        .get(ATTR_REGION)
        .map(|r| r.as_str())
        .unwrap_or(region);

    Some(PriceEntry {
        instance_type: instance_type.to_string(),
        region: entry_region.to_string(),
        hourly_price,
        vcpu,
        memory_gib,
    })
}

/// Parse memory strings like `"8 GiB"` or `"0.5 GiB"`
fn parse_memory_gib(value: &str) -> Option<f64> {
    let number = value
        .trim()
        .trim_end_matches("GiB")
        .trim()
        .replace(',', "");
    number.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "manifest": {"serviceId": "ec2"},
        "prices": [
            {
                "price": {"USD": "0.0960000000", "unit": "Hrs"},
                "attributes": {
                    "aws:ec2:instanceType": "m5.large",
                    "aws:ec2:vcpu": "2",
                    "aws:ec2:memory": "8 GiB",
                    "aws:region": "us-east-1"
                }
            },
            {
                "price": {"USD": "0.0052000000"},
                "attributes": {
                    "aws:ec2:instanceType": "t3.nano",
                    "aws:ec2:vcpu": "2",
                    "aws:ec2:memory": "0.5 GiB"
                }
            },
            {
                "price": {"USD": "n/a"},
                "attributes": {"aws:ec2:instanceType": "x1.32xlarge"}
            },
            {
                "price": {"USD": "1.0"},
                "attributes": {}
            }
        ]
    }"#;

    #[test]
    fn test_parse_region_pricing() {
        let catalog = parse_region_pricing("us-east-1", DOCUMENT.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 2);
        let m5 = catalog.entry("m5.large", "us-east-1").unwrap();
        assert_eq!(m5.hourly_price, 0.096);
        assert_eq!(m5.vcpu, 2);
        assert_eq!(m5.memory_gib, 8.0);

        // Region attribute missing falls back to the requested region
        let nano = catalog.entry("t3.nano", "us-east-1").unwrap();
        assert_eq!(nano.memory_gib, 0.5);
    }

    #[test]
    fn test_parse_rejects_malformed_document() {
        let result = parse_region_pricing("us-east-1", br#"{"regions": {}}"#);
        assert!(matches!(result, Err(OptimizeError::PricingParse(_))));

        let result = parse_region_pricing("us-east-1", b"<html>relay error</html>");
        assert!(matches!(result, Err(OptimizeError::PricingParse(_))));
    }

    #[test]
    fn test_parse_memory_gib() {
        assert_eq!(parse_memory_gib("16 GiB"), Some(16.0));
        assert_eq!(parse_memory_gib("1,952 GiB"), Some(1952.0));
        assert_eq!(parse_memory_gib("NA"), None);
    }
}
