//! HTTP pricing provider
//!
//! Fetches the public regional on-demand pricing document, optionally through
//! a CORS relay that takes the target address in its `url` query parameter.

use super::{parse_region_pricing, PricingCatalog};
use crate::error::{OptimizeError, Result};
use crate::sources::PricingProvider;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Public pricing host
pub const DEFAULT_PRICING_BASE_URL: &str = "https://a0.p.awsstatic.com";

/// Configuration for the HTTP pricing provider
#[derive(Debug, Clone)]
pub struct PricingProviderConfig {
    /// Base address of the pricing host
    pub base_url: String,
    /// Optional relay endpoint wrapping the pricing address
    pub relay_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for PricingProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRICING_BASE_URL.to_string(),
            relay_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Pricing provider backed by an HTTP JSON fetch
pub struct HttpPricingProvider {
    client: Client,
    base_url: Url,
    relay_url: Option<Url>,
}

impl HttpPricingProvider {
    pub fn new(config: PricingProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OptimizeError::PricingFetch {
                region: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| OptimizeError::PricingParse(format!("Invalid pricing URL: {}", e)))?;

        let relay_url = config
            .relay_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| OptimizeError::PricingParse(format!("Invalid relay URL: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            relay_url,
        })
    }

    /// Address of the pricing document for a region
    pub fn document_url(&self, region: &str) -> Result<Url> {
        let path = format!("pricing/1.0/ec2/region/{}/ondemand/linux/index.json", region);
        let target = self
            .base_url
            .join(&path)
            .map_err(|e| OptimizeError::PricingParse(format!("Invalid region path: {}", e)))?;

        match &self.relay_url {
            Some(relay) => {
                let mut wrapped = relay.clone();
                wrapped
                    .query_pairs_mut()
                    .append_pair("url", target.as_str());
                Ok(wrapped)
            }
            None => Ok(target),
        }
    }
}

#[async_trait]
impl PricingProvider for HttpPricingProvider {
    async fn fetch_region_pricing(&self, region: &str) -> Result<PricingCatalog> {
        let url = self.document_url(region)?;
        debug!(region = %region, url = %url, "Fetching region pricing");

        let fetch_error = |message: String| OptimizeError::PricingFetch {
            region: region.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(format!("Pricing API error ({}): {}", status, body)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(format!("Failed to read response: {}", e)))?;

        let catalog = parse_region_pricing(region, &body)?;
        info!(region = %region, entries = catalog.len(), "Fetched region pricing");

        Ok(catalog)
    }
}
