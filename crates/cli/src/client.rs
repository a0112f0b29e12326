//! API client for communicating with the optimizer daemon

use anyhow::{Context, Result};
use optimize_lib::{
    Config, ConfigUpdate, HealthResponse, OptimizationView, ReadinessResponse, Snapshot, Trigger,
};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the optimizer daemon
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.context("Failed to send request")
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, error_message(&body));
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Self::parse(response).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        Self::parse(response).await
    }

    /// GET a probe endpoint, which answers 503 with a body when not ready
    async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse response");
        }
        Self::parse(response).await
    }

    pub async fn view(&self) -> Result<OptimizationView> {
        self.get("api/v1/view").await
    }

    pub async fn config(&self) -> Result<Config> {
        self.get("api/v1/config").await
    }

    pub async fn update_config(&self, update: ConfigUpdate, trigger: Trigger) -> Result<Config> {
        self.put("api/v1/config", &ConfigUpdateRequest { update, trigger })
            .await
    }

    pub async fn change_region(&self, region: &str) -> Result<Config> {
        self.put(
            "api/v1/region",
            &RegionRequest {
                region: region.to_string(),
            },
        )
        .await
    }

    /// Ask the daemon to start a fetch cycle
    pub async fn refresh(&self) -> Result<()> {
        let response = self.send::<()>(Method::POST, "api/v1/refresh", None).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, error_message(&body));
        }
        Ok(())
    }

    pub async fn snapshots(&self) -> Result<Vec<Snapshot>> {
        self.get("api/v1/snapshots").await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.probe("healthz").await
    }

    pub async fn readiness(&self) -> Result<ReadinessResponse> {
        self.probe("readyz").await
    }
}

/// Prefer the `error` field of a JSON error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdateRequest {
    pub update: ConfigUpdate,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRequest {
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
