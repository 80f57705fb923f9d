//! Error types for cf-ddns.
//!
//! Every variant is fatal to a run; nothing here is retried.

use thiserror::Error;

/// Result type alias for cf-ddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Config file could not be opened or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoad(String),

    /// Config file could not be serialized or written back.
    #[error("Failed to write config: {0}")]
    ConfigWrite(String),

    /// Address discovery request failed (connect, timeout, status, body).
    #[error("Failed to fetch address: {0}")]
    Fetch(String),

    /// Discovery endpoint returned something that is not an address of the
    /// requested family.
    #[error("Invalid {family} address: '{value}'")]
    InvalidAddress { family: String, value: String },

    /// Zone could not be resolved by name.
    #[error("Zone lookup failed for {domain}: {message}")]
    ZoneLookup { domain: String, message: String },

    /// Listing records in a zone failed.
    #[error("Record lookup failed for [{record_type}] {name}: {message}")]
    RecordLookup {
        name: String,
        record_type: String,
        message: String,
    },

    /// Anything other than exactly one matching record.
    #[error("Expected exactly 1 record for [{record_type}] {name}, found {count}")]
    AmbiguousRecord {
        name: String,
        record_type: String,
        count: usize,
    },

    /// Record content update was rejected or failed.
    #[error("Failed to update record {record_id}: {message}")]
    RecordUpdate { record_id: String, message: String },

    /// Configured record type outside A/AAAA.
    #[error("Expected A or AAAA record, was: {0}")]
    UnsupportedRecordType(String),
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Fetch(e.to_string())
    }
}
