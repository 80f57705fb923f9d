//! Discover current addresses, compare with persisted state, push changes.
//!
//! A run moves through `Discover -> Decide -> (Skip | Persist -> UpdateLoop)`.
//! Every error aborts the run; the caller is expected to be re-invoked later
//! by whatever schedules it.

use crate::config::{Config, RecordType, StateStore};
use crate::detector::{validate_v4, validate_v6, AddressFetcher, IpFamily};
use crate::error::{DdnsError, Result};
use crate::providers::{DnsApi, RecordUpdate};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Courtesy pauses between external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between the IPv4 and IPv6 discovery requests.
    pub between_families: Duration,
    /// Between two record updates.
    pub between_targets: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_families: Duration::from_millis(500),
            between_targets: Duration::from_secs(2),
        }
    }
}

impl Pacing {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            between_families: Duration::ZERO,
            between_targets: Duration::ZERO,
        }
    }
}

/// Addresses discovered during this run. `None` when the family is disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveredAddresses {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl DiscoveredAddresses {
    /// IPv4 as stored in the state file; empty when not discovered.
    pub fn ipv4_string(&self) -> String {
        self.ipv4.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// IPv6 as stored in the state file; empty when not discovered.
    pub fn ipv6_string(&self) -> String {
        self.ipv6.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// Address to publish for a record type, if one was discovered.
    pub fn for_record(&self, record_type: RecordType) -> Option<IpAddr> {
        match record_type {
            RecordType::A => self.ipv4.map(IpAddr::V4),
            RecordType::Aaaa => self.ipv6.map(IpAddr::V6),
        }
    }

    fn matches(&self, config: &Config) -> bool {
        config.last_known.ipv4 == self.ipv4_string()
            && config.last_known.ipv6 == self.ipv6_string()
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Addresses matched the persisted state; nothing was written.
    Unchanged,
    /// State was persisted and the update loop ran to completion.
    Updated { updated: usize, skipped: usize },
}

/// Drives a single reconciliation run.
pub struct Reconciler {
    fetcher: Box<dyn AddressFetcher>,
    store: Box<dyn StateStore>,
    dns: Box<dyn DnsApi>,
    pacing: Pacing,
}

impl Reconciler {
    pub fn new(
        fetcher: Box<dyn AddressFetcher>,
        store: Box<dyn StateStore>,
        dns: Box<dyn DnsApi>,
    ) -> Self {
        Self {
            fetcher,
            store,
            dns,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run once. `config` is updated in place with the discovered addresses
    /// when a change (or `force`) leads to an update.
    pub async fn run(&self, config: &mut Config, force: bool) -> Result<RunOutcome> {
        tracing::info!("Fetching IP address");
        let discovered = self.discover(config).await?;
        tracing::info!(
            "ipv4: '{}', ipv6: '{}'",
            discovered.ipv4_string(),
            discovered.ipv6_string()
        );

        if !force && discovered.matches(config) {
            tracing::info!("IP address(es) have not changed, skipping update");
            return Ok(RunOutcome::Unchanged);
        }

        config.last_known.ipv4 = discovered.ipv4_string();
        config.last_known.ipv6 = discovered.ipv6_string();
        self.store.persist(config)?;

        self.update_all(config, &discovered).await
    }

    /// Query the configured endpoints, IPv4 first.
    pub async fn discover(&self, config: &Config) -> Result<DiscoveredAddresses> {
        let urls = &config.ip_fetch_urls;
        let mut discovered = DiscoveredAddresses::default();

        if !urls.ipv4.is_empty() {
            let candidate = self.fetcher.fetch(&urls.ipv4, IpFamily::V4).await?;
            discovered.ipv4 = Some(validate_v4(&candidate)?);
        }

        tokio::time::sleep(self.pacing.between_families).await;

        if !urls.ipv6.is_empty() {
            let candidate = self.fetcher.fetch(&urls.ipv6, IpFamily::V6).await?;
            discovered.ipv6 = Some(validate_v6(&candidate)?);
        }

        Ok(discovered)
    }

    async fn update_all(
        &self,
        config: &Config,
        discovered: &DiscoveredAddresses,
    ) -> Result<RunOutcome> {
        let total = config.domains.len();
        let mut updated = 0;
        let mut skipped = 0;

        for (i, target) in config.domains.iter().enumerate() {
            let full_host = target.full_host();
            let record_type = target.record_type()?;

            let Some(address) = discovered.for_record(record_type) else {
                tracing::warn!(
                    "Skipping [{}] '{}', no {} address is available",
                    record_type,
                    full_host,
                    family_of(record_type)
                );
                skipped += 1;
                continue;
            };

            tracing::info!("Looking for zone: {}", target.domain);
            let zone_id = self.dns.zone_id_by_name(&target.domain).await?;
            tracing::debug!("Zone ID: {}", zone_id);

            tracing::info!("Looking for record: [{}] '{}'", record_type, full_host);
            let records = self
                .dns
                .find_records(&zone_id, &full_host, record_type)
                .await?;

            let [record] = records.as_slice() else {
                return Err(DdnsError::AmbiguousRecord {
                    name: full_host,
                    record_type: record_type.to_string(),
                    count: records.len(),
                });
            };
            tracing::debug!("Record ID: {}", record.id);

            let update = RecordUpdate {
                record_type: record_type.to_string(),
                name: full_host.clone(),
                content: address.to_string(),
            };

            tracing::info!("Updating [{}] '{}' to {}", record_type, full_host, address);
            self.dns.update_record(&zone_id, &record.id, &update).await?;
            tracing::info!("Successfully updated record!");
            updated += 1;

            if i + 1 < total {
                tokio::time::sleep(self.pacing.between_targets).await;
            }
        }

        Ok(RunOutcome::Updated { updated, skipped })
    }
}

fn family_of(record_type: RecordType) -> IpFamily {
    match record_type {
        RecordType::A => IpFamily::V4,
        RecordType::Aaaa => IpFamily::V6,
    }
}
