//! # cf-ddns
//!
//! Keeps Cloudflare A/AAAA records in sync with this host's public addresses.
//!
//! ## How a run works
//!
//! - The public IPv4 and IPv6 addresses are fetched from configured
//!   "what is my IP" endpoints, each over a connection pinned to its family.
//! - If neither differs from the addresses stored in the config file (and
//!   `--force` is not set) the run ends without writing anything.
//! - Otherwise the new addresses are written back to the config file first,
//!   then every configured record is updated in order.
//!
//! Any error aborts the run. Scheduling (cron, systemd timers) is external.
//!
//! ## Usage
//!
//! ```bash
//! # Update if the address changed
//! cf-ddns --config /etc/cf-ddns/config.json
//!
//! # Push the current address even if it did not change
//! cf-ddns --force
//!
//! # Print a config template
//! cf-ddns --print-example
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod reconciler;

pub use config::{Config, FileStateStore, StateStore};
pub use detector::{AddressFetcher, HttpFetcher, IpFamily};
pub use error::{DdnsError, Result};
pub use providers::{CloudflareClient, DnsApi};
pub use reconciler::{Pacing, Reconciler, RunOutcome};
