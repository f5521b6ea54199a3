//! Reverse geocoding: turn a coordinate pair into a postal-style address.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding provider key is not configured")]
    Unavailable,

    #[error("geocoding request failed: {0}")]
    Failed(String),

    #[error("no address found for coordinates")]
    NoResults,
}

#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Best-match formatted address for (latitude, longitude) in decimal degrees.
    /// One attempt, no retries.
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    formatted: String,
}

/// OpenCage `geocode/v1/json` client.
pub struct OpenCageResolver {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl OpenCageResolver {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(base_url)?.join("/geocode/v1/json")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("foodlink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint, api_key })
    }

    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        Self::new(&config.opencage_base_url, config.opencage_api_key.clone(), config.http_timeout)
    }
}

#[async_trait]
impl AddressResolver for OpenCageResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let key = self.api_key.as_deref().ok_or(GeocodeError::Unavailable)?;
        tracing::info!(latitude, longitude, "reverse geocoding request");

        let query = format!("{latitude},{longitude}");
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("q", query.as_str()), ("key", key), ("no_annotations", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::Failed(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            return Err(GeocodeError::Failed(format!("provider responded {}", resp.status())));
        }

        let body: OpenCageResponse = resp
            .json()
            .await
            .map_err(|e| GeocodeError::Failed(e.without_url().to_string()))?;

        first_address(body)
    }
}

fn first_address(body: OpenCageResponse) -> Result<String, GeocodeError> {
    body.results
        .into_iter()
        .map(|r| r.formatted)
        .find(|a| !a.trim().is_empty())
        .ok_or(GeocodeError::NoResults)
}
