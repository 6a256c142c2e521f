//! Configuration bundle for the DDNS updater
//!
//! The updater is handed one [`UpdaterConfig`] per run. It can be built from
//! the comma-separated strings an operator writes in an environment variable
//! or deserialized from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration consumed by the reconciler for a single run
#[derive(Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Maximum number of concurrent record updates
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Zone name (e.g. "example.com")
    pub zone: String,

    /// DNS records to keep in sync, in configured order.
    /// The first one is the reference record.
    pub records: Vec<String>,

    /// IP-discovery endpoints, tried in order
    pub ip_endpoints: Vec<String>,

    /// Perform lookups but skip writes
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the run event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for UpdaterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterConfig")
            .field("max_workers", &self.max_workers)
            .field("api_token", &"<REDACTED>")
            .field("zone", &self.zone)
            .field("records", &self.records)
            .field("ip_endpoints", &self.ip_endpoints)
            .field("dry_run", &self.dry_run)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .finish()
    }
}

impl UpdaterConfig {
    /// Build a configuration from the operator-facing string forms
    ///
    /// `records` and `ip_endpoints` are comma-separated lists; see
    /// [`parse_list`] for how they are split.
    pub fn from_parts(
        max_workers: usize,
        api_token: impl Into<String>,
        zone: impl Into<String>,
        records: &str,
        ip_endpoints: &str,
    ) -> Self {
        Self {
            max_workers,
            api_token: api_token.into(),
            zone: zone.into().trim().to_string(),
            records: parse_list(records),
            ip_endpoints: parse_list(ip_endpoints),
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// The file is validated before being returned.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_workers == 0 {
            return Err(crate::Error::config("max_workers must be > 0"));
        }
        if self.api_token.is_empty() {
            return Err(crate::Error::config("Cloudflare API token cannot be empty"));
        }
        if self.zone.trim().is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }
        if let Some(blank) = self.records.iter().find(|r| r.trim().is_empty()) {
            return Err(crate::Error::config(format!(
                "Record names cannot be blank: {:?}",
                blank
            )));
        }
        if self.ip_endpoints.is_empty() {
            return Err(crate::Error::config("No IP-discovery endpoints configured"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

/// Split a comma-separated list
///
/// Entries are whitespace-trimmed and kept in order. Duplicates are kept;
/// entries that are empty after trimming are dropped.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_max_workers() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    256
}
