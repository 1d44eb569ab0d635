//! HTTP client for the npm registry and downloads APIs

use std::time::Duration;

use miner_core::error::MinerError;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::debug;

use crate::api::{DownloadsResponse, PackageDocument};
use crate::RegistryResult;

/// Endpoints and transport settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Package metadata API base URL
    pub registry_url: String,
    /// Download statistics API base URL
    pub downloads_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("npm-miner/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client for both npm APIs, sharing one connection pool.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct NpmClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Registry base URL, without trailing slash
    registry_url: String,
    /// Downloads API base URL, without trailing slash
    downloads_url: String,
}

impl NpmClient {
    /// Create client for the public npm endpoints
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create client with custom endpoints and transport settings
    pub fn with_config(config: ClientConfig) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .gzip(true)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| MinerError::network("Failed to create HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            registry_url: config.registry_url.trim_end_matches('/').to_string(),
            downloads_url: config.downloads_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full registry document of a package.
    ///
    /// `Ok(None)` when the registry does not know the package.
    pub async fn get_package(&self, name: &str) -> RegistryResult<Option<PackageDocument>> {
        let url = format!("{}/{}", self.registry_url, encode_package_name(name));
        debug!(package = name, "Fetching package document");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| MinerError::network(format!("Failed to fetch package {}", name), e))?;

        match response.status() {
            StatusCode::OK => {
                let document = response.json::<PackageDocument>().await.map_err(|e| {
                    MinerError::network(format!("Failed to parse package document for {}", name), e)
                })?;
                Ok(Some(document))
            },
            StatusCode::NOT_FOUND => {
                debug!(package = name, "Package not in registry");
                Ok(None)
            },
            status => Err(MinerError::Network {
                message: format!("Registry returned status {} for {}", status, name),
                source: None,
            }),
        }
    }

    /// Fetch the download count of a package over `period`
    /// (`YYYY-MM-DD:YYYY-MM-DD`).
    ///
    /// An `error` body is returned as [`DownloadsResponse::Missing`] whatever
    /// the status code; other unsuccessful responses are errors.
    pub async fn get_downloads(&self, name: &str, period: &str) -> RegistryResult<DownloadsResponse> {
        let url = format!("{}/downloads/point/{}/{}", self.downloads_url, period, name);
        debug!(package = name, period, "Fetching download count");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MinerError::network(format!("Failed to fetch downloads for {}", name), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MinerError::network(format!("Failed to read downloads for {}", name), e))?;

        match serde_json::from_str::<DownloadsResponse>(&body) {
            Ok(missing @ DownloadsResponse::Missing { .. }) => Ok(missing),
            _ if !status.is_success() => Err(MinerError::Network {
                message: format!("Downloads API returned status {} for {}", status, name),
                source: None,
            }),
            Ok(point) => Ok(point),
            Err(e) => Err(MinerError::JsonParse {
                what: format!("downloads for {}", name),
                message: e.to_string(),
            }),
        }
    }
}

/// Encode package name for URL (handle scoped packages)
fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        // Scoped package: @org/pkg -> @org%2fpkg
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests;
