//! Public address discovery over family-pinned HTTP connections.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Whole-request timeout for discovery endpoints (connect + read).
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Something that can ask a "what is my IP" endpoint for our address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressFetcher: Send + Sync {
    /// Fetch `url` over a connection restricted to `family` and return the
    /// trimmed response body.
    async fn fetch(&self, url: &str, family: IpFamily) -> Result<String>;
}

/// Fetcher backed by one reqwest client per address family.
///
/// Each client binds its sockets to the unspecified address of its family,
/// which makes the connector dial only addresses of that family. A host that
/// only resolves to the other family fails instead of falling back.
pub struct HttpFetcher {
    v4: reqwest::Client,
    v6: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default 15 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom whole-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            v4: pinned_client(IpAddr::V4(Ipv4Addr::UNSPECIFIED), timeout)?,
            v6: pinned_client(IpAddr::V6(Ipv6Addr::UNSPECIFIED), timeout)?,
        })
    }

    fn client(&self, family: IpFamily) -> &reqwest::Client {
        match family {
            IpFamily::V4 => &self.v4,
            IpFamily::V6 => &self.v6,
        }
    }
}

fn pinned_client(local: IpAddr, timeout: Duration) -> Result<reqwest::Client> {
    // A proxy would make the family of the final hop unobservable.
    reqwest::Client::builder()
        .local_address(local)
        .timeout(timeout)
        .no_proxy()
        .build()
        .map_err(|e| DdnsError::Fetch(format!("cannot build HTTP client: {}", e)))
}

#[async_trait]
impl AddressFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, family: IpFamily) -> Result<String> {
        tracing::info!("Fetching URL '{}' using {}", url, family);

        let response = self.client(family).get(url).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::Fetch(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response.text().await?;
        Ok(body.trim().to_string())
    }
}

/// Check that `candidate` is a literal address of `family`.
pub fn validate(candidate: &str, family: IpFamily) -> Result<IpAddr> {
    match family {
        IpFamily::V4 => validate_v4(candidate).map(IpAddr::V4),
        IpFamily::V6 => validate_v6(candidate).map(IpAddr::V6),
    }
}

/// Parse a dotted-quad IPv4 literal.
pub fn validate_v4(candidate: &str) -> Result<Ipv4Addr> {
    candidate
        .parse()
        .map_err(|_| invalid(candidate, IpFamily::V4))
}

/// Parse an IPv6 literal.
///
/// The candidate must also contain a colon, which rules out dotted forms
/// some endpoints return when they only saw an IPv4 peer.
pub fn validate_v6(candidate: &str) -> Result<Ipv6Addr> {
    if !candidate.contains(':') {
        return Err(invalid(candidate, IpFamily::V6));
    }
    candidate
        .parse()
        .map_err(|_| invalid(candidate, IpFamily::V6))
}

fn invalid(candidate: &str, family: IpFamily) -> DdnsError {
    DdnsError::InvalidAddress {
        family: family.to_string(),
        value: candidate.to_string(),
    }
}
