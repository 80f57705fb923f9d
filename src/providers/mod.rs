//! DNS API collaborators.

mod cloudflare;


pub use cloudflare::CloudflareClient;

use crate::config::RecordType;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An existing record as reported by the DNS API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
}

/// New content for an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
}

/// The narrow slice of a DNS provider API the reconciler needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// Resolve a zone name such as `example.com` to the provider's zone id.
    async fn zone_id_by_name(&self, domain: &str) -> Result<String>;

    /// List records in `zone_id` matching both `name` and `record_type`.
    async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>>;

    /// Overwrite the content of an existing record.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<()>;
}
