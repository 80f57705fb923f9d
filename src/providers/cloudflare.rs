//! Cloudflare API v4 client (global API key authentication).

use super::{DnsApi, DnsRecord, RecordUpdate};
use crate::config::{Credentials, RecordType};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com";

/// Upper bound on any single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare DNS client.
pub struct CloudflareClient {
    client: reqwest::Client,
    credentials: Credentials,
    base_url: String,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CloudflareError>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

impl<T> CloudflareResponse<T> {
    /// Unwrap the envelope, turning `success: false` into a message.
    fn into_result(self) -> std::result::Result<Option<T>, String> {
        if self.success {
            return Ok(self.result);
        }

        Err(self
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string()))
    }
}

impl CloudflareClient {
    /// Create a new Cloudflare client.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(credentials: Credentials, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DdnsError::Fetch(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/client/v4{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Auth-Email", &self.credentials.email)
            .header("X-Auth-Key", &self.credentials.api_key)
    }

    /// Send a request and unwrap the Cloudflare envelope.
    async fn send<T: DeserializeOwned + Send>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Option<T>, String> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        let body: CloudflareResponse<T> = response
            .json()
            .await
            .map_err(|e| format!("HTTP {}: failed to parse response: {}", status, e))?;

        body.into_result()
    }
}

#[async_trait]
impl DnsApi for CloudflareClient {
    async fn zone_id_by_name(&self, domain: &str) -> Result<String> {
        let lookup_failed = |message: String| DdnsError::ZoneLookup {
            domain: domain.to_string(),
            message,
        };

        let request = self.client.get(self.url("/zones")).query(&[("name", domain)]);
        let zones: Vec<Zone> = self
            .send(request)
            .await
            .map_err(lookup_failed)?
            .unwrap_or_default();

        match zones.as_slice() {
            [zone] => Ok(zone.id.clone()),
            [] => Err(lookup_failed("zone could not be found".to_string())),
            _ => Err(lookup_failed(format!(
                "ambiguous zone name, {} zones matched",
                zones.len()
            ))),
        }
    }

    async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>> {
        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .query(&[("name", name), ("type", record_type.as_str())]);

        let records: Option<Vec<DnsRecord>> = self.send(request).await.map_err(|message| {
            DdnsError::RecordLookup {
                name: name.to_string(),
                record_type: record_type.to_string(),
                message,
            }
        })?;

        Ok(records.unwrap_or_default())
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id)))
            .json(update);

        self.send::<serde_json::Value>(request)
            .await
            .map_err(|message| DdnsError::RecordUpdate {
                record_id: record_id.to_string(),
                message,
            })?;

        Ok(())
    }
}
