//! Geolocation of player addresses.
//!
//! The ingestion core only depends on the [`GeoEnricher`] contract:
//! `lookup(ip) -> country`. [`IpApiClient`] implements it against the
//! ip-api.com JSON endpoint over `reqwest`, and [`MemoizedGeo`] wraps any
//! enricher so a resolved address is not looked up again.
//!
//! Retry and backoff are not part of the contract; a failed lookup is
//! reported to the caller, which records it as a line-level error.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::GeoError;

/// Resolves an IP address to a country name.
pub trait GeoEnricher: Send + Sync {
    /// Look up the country of `ip`.
    fn lookup(&self, ip: &str) -> impl Future<Output = Result<String, GeoError>> + Send;
}

// ---------------------------------------------------------------------------
// ip-api.com client
// ---------------------------------------------------------------------------

/// Fields requested from ip-api.com.
const IP_API_FIELDS: &str = "status,message,country";

/// Response body of `GET /json/{ip}`.
#[derive(Debug, serde::Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Geolocation backed by the ip-api.com JSON API.
///
/// Sends `GET {base_url}/json/{ip}?fields=status,message,country`.
#[derive(Debug, Clone)]
pub struct IpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiClient {
    /// Create a client for the given base URL (e.g. `http://ip-api.com`).
    ///
    /// `timeout` bounds each lookup round trip.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Request`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeoError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    async fn fetch(&self, ip: &str) -> Result<String, GeoError> {
        let url = format!("{}/json/{ip}", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("fields", IP_API_FIELDS)])
            .send()
            .await
            .map_err(|e| GeoError::Request(format!("failed to perform request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Decode(e.to_string()))?;

        country_from_response(body)
    }
}

impl GeoEnricher for IpApiClient {
    async fn lookup(&self, ip: &str) -> Result<String, GeoError> {
        self.fetch(ip).await
    }
}

/// Extract the country from an ip-api.com response body.
fn country_from_response(body: IpApiResponse) -> Result<String, GeoError> {
    if body.status != "success" {
        return Err(GeoError::Lookup(
            body.message.unwrap_or_else(|| format!("status {}", body.status)),
        ));
    }
    match body.country {
        Some(country) if !country.is_empty() => Ok(country),
        _ => Err(GeoError::Decode(String::from("response missing country"))),
    }
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

/// Caches successful lookups of an inner [`GeoEnricher`] by address.
///
/// Failures are not cached, so a transient error is retried the next time
/// the address shows up. Two files racing on the same unseen address may
/// both reach the inner enricher; the later answer wins.
#[derive(Debug)]
pub struct MemoizedGeo<G> {
    inner: G,
    resolved: RwLock<HashMap<String, String>>,
}

impl<G> MemoizedGeo<G> {
    /// Wrap an enricher with an empty cache.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Number of addresses currently cached.
    pub async fn cached(&self) -> usize {
        self.resolved.read().await.len()
    }
}

impl<G: GeoEnricher> GeoEnricher for MemoizedGeo<G> {
    async fn lookup(&self, ip: &str) -> Result<String, GeoError> {
        if let Some(country) = self.resolved.read().await.get(ip) {
            debug!(ip, country, "geolocation cache hit");
            return Ok(country.clone());
        }
        let country = self.inner.lookup(ip).await?;
        self.resolved
            .write()
            .await
            .insert(ip.to_owned(), country.clone());
        Ok(country)
    }
}
