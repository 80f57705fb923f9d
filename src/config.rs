//! Configuration and persisted reconciliation state.
//!
//! The config file doubles as the state file: the last addresses pushed to
//! DNS are written back into `initialIP` before any record is touched.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Cloudflare account email and global API key.
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Records to keep in sync, processed in this order.
    #[serde(default)]
    pub domains: Vec<DomainTarget>,

    /// Address discovery endpoints; an empty URL disables that family.
    #[serde(rename = "IPFetchURLs", default)]
    pub ip_fetch_urls: FetchUrls,

    /// Addresses observed on the previous run that changed anything.
    #[serde(rename = "initialIP", default)]
    pub last_known: LastKnown,
}

/// API credentials. Never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// A (domain, host, type) triple naming one existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTarget {
    pub domain: String,
    pub host: String,
    /// Kept as written so unsupported values round-trip untouched.
    #[serde(rename = "type")]
    pub record_type: String,
}

impl DomainTarget {
    /// Fully qualified record name, e.g. `home.example.com`.
    pub fn full_host(&self) -> String {
        format!("{}.{}", self.host, self.domain)
    }

    /// Parsed record type.
    pub fn record_type(&self) -> Result<RecordType> {
        self.record_type.parse()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchUrls {
    #[serde(default)]
    pub ipv4: String,
    #[serde(default)]
    pub ipv6: String,
}

/// Last persisted addresses. Empty means never observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastKnown {
    #[serde(default)]
    pub ipv4: String,
    #[serde(default)]
    pub ipv6: String,
}

/// Address record types this tool reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = DdnsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(DdnsError::UnsupportedRecordType(other.to_string())),
        }
    }
}

impl Config {
    /// Generate example configuration.
    pub fn example() -> Self {
        Self {
            credentials: Credentials {
                email: "user@example.com".to_string(),
                api_key: "your-global-api-key".to_string(),
            },
            domains: vec![
                DomainTarget {
                    domain: "example.com".to_string(),
                    host: "home".to_string(),
                    record_type: "A".to_string(),
                },
                DomainTarget {
                    domain: "example.com".to_string(),
                    host: "home".to_string(),
                    record_type: "AAAA".to_string(),
                },
            ],
            ip_fetch_urls: FetchUrls {
                ipv4: "https://api.ipify.org".to_string(),
                ipv6: "https://api6.ipify.org".to_string(),
            },
            last_known: LastKnown::default(),
        }
    }
}

/// Where reconciliation state is written back to.
#[cfg_attr(test, mockall::automock)]
pub trait StateStore: Send + Sync {
    /// Persist the full configuration, including updated last-known addresses.
    fn persist(&self, config: &Config) -> Result<()>;
}

/// JSON file backed state store.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used while persisting, e.g. `config.json.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load configuration from the file.
    pub fn load(&self) -> Result<Config> {
        tracing::info!("Reading config from '{}'", self.path.display());

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            DdnsError::ConfigLoad(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            DdnsError::ConfigLoad(format!("cannot parse {}: {}", self.path.display(), e))
        })
    }
}

impl StateStore for FileStateStore {
    fn persist(&self, config: &Config) -> Result<()> {
        tracing::info!("Updating config file '{}'", self.path.display());

        let mut content = serde_json::to_string_pretty(config)
            .map_err(|e| DdnsError::ConfigWrite(e.to_string()))?;
        content.push('\n');

        // Write next to the target and rename over it, so a failed write
        // never leaves a truncated config behind.
        let temp_path = self.temp_path();
        if let Err(e) = write_synced(&temp_path, content.as_bytes()) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(DdnsError::ConfigWrite(format!(
                "cannot write {}: {}",
                temp_path.display(),
                e
            )));
        }

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            DdnsError::ConfigWrite(format!(
                "cannot rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })
    }
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "email": "me@example.com",
  "api_key": "secret",
  "domains": [
    { "domain": "example.com", "host": "home", "type": "A" },
    { "domain": "example.org", "host": "nas", "type": "AAAA" }
  ],
  "IPFetchURLs": { "ipv4": "https://v4.example.net", "ipv6": "" },
  "initialIP": { "ipv4": "1.1.1.1", "ipv6": "" }
}"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(config.credentials.email, "me@example.com");
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[1].full_host(), "nas.example.org");
        assert_eq!(config.ip_fetch_urls.ipv4, "https://v4.example.net");
        assert!(config.ip_fetch_urls.ipv6.is_empty());
        assert_eq!(config.last_known.ipv4, "1.1.1.1");
    }

    #[test]
    fn test_optional_sections_default_to_empty() {
        let config: Config =
            serde_json::from_str(r#"{"email":"me@example.com","api_key":"k"}"#).unwrap();
        assert!(config.domains.is_empty());
        assert_eq!(config.ip_fetch_urls, FetchUrls::default());
        assert_eq!(config.last_known, LastKnown::default());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"domains":[]}"#).is_err());
    }

    #[test]
    fn test_record_type_parse() {
        let mut target = DomainTarget {
            domain: "example.com".to_string(),
            host: "home".to_string(),
            record_type: "AAAA".to_string(),
        };
        assert_eq!(target.record_type().unwrap(), RecordType::Aaaa);

        target.record_type = "CNAME".to_string();
        assert!(matches!(
            target.record_type(),
            Err(DdnsError::UnsupportedRecordType(t)) if t == "CNAME"
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let config = Config::example();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("your-global-api-key"));
        assert!(rendered.contains("<REDACTED>"));
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("config.json"));

        let mut config: Config = serde_json::from_str(SAMPLE).unwrap();
        config.last_known.ipv4 = "203.0.113.5".to_string();
        config.last_known.ipv6 = "2001:db8::1".to_string();

        store.persist(&config).unwrap();
        let reloaded = store.load().unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_persist_is_pretty_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("config.json"));
        store.persist(&Config::example()).unwrap();

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert!(written.starts_with("{\n  \"email\": "));

        let keys = [
            "\"email\"",
            "\"api_key\"",
            "\"domains\"",
            "\"IPFetchURLs\"",
            "\"initialIP\"",
        ];
        let order: Vec<usize> = keys
            .iter()
            .map(|key| written.find(key).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nope.json"));
        assert!(matches!(store.load(), Err(DdnsError::ConfigLoad(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStateStore::new(path);
        assert!(matches!(store.load(), Err(DdnsError::ConfigLoad(_))));
    }

    #[test]
    fn test_persist_replaces_existing_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let store = FileStateStore::new(&path);
        let mut config = store.load().unwrap();
        config.last_known.ipv4 = "1.1.1.2".to_string();
        store.persist(&config).unwrap();

        assert_eq!(store.load().unwrap().last_known.ipv4, "1.1.1.2");
        assert!(!dir.path().join("config.json.tmp").exists());

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("config.json")]);
    }

    #[test]
    fn test_failed_persist_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();

        // A directory squatting on the temp name makes the write fail.
        std::fs::create_dir(dir.path().join("config.json.tmp")).unwrap();

        let store = FileStateStore::new(&path);
        let mut config = store.load().unwrap();
        config.last_known.ipv4 = "1.1.1.2".to_string();

        assert!(matches!(
            store.persist(&config),
            Err(DdnsError::ConfigWrite(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
        assert_eq!(store.load().unwrap().last_known.ipv4, "1.1.1.1");
    }

    #[test]
    fn test_persist_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("missing").join("config.json"));
        assert!(matches!(
            store.persist(&Config::example()),
            Err(DdnsError::ConfigWrite(_))
        ));
    }
}
