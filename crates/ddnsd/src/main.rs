// # ddnsd - One-shot DDNS updater
//
// This binary is a THIN integration layer:
// 1. Read configuration (environment variables or a JSON file)
// 2. Initialize logging
// 3. Build the Cloudflare provider and the HTTP IP source
// 4. Run the reconciler once and exit
//
// Repetition is left to an external scheduler (cron, systemd timer).
//
// ## Configuration
//
// - `DDNS_CONFIG_FILE`: JSON `UpdaterConfig`; when set, the variables below
//   except the logging ones are ignored
// - `DDNS_MAX_WORKERS`: worker pool size (default 4)
// - `DDNS_PROVIDER_API_TOKEN`: Cloudflare API token
// - `DDNS_ZONE`: zone name
// - `DDNS_RECORDS`: comma-separated list of DNS records to manage
// - `DDNS_IP_ENDPOINTS`: comma-separated IP echo URLs (defaults built in)
// - `DDNS_MODE`: `dry-run` to skip writes
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `DDNS_LOG_FILE`: append logs to this file instead of stdout
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_API_TOKEN=your_token
// export DDNS_ZONE=example.com
// export DDNS_RECORDS=example.com,www.example.com
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::{UpdaterConfig, parse_list};
use ddns_core::{DnsProvider, IpSource, Reconciler};
use ddns_ip_http::{DEFAULT_IP_SERVICES, HttpIpSource};
use ddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// The run completed, whatever its outcome
    RunCompleted = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    updater: UpdaterConfig,
    log_level: String,
    log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_level = lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_file = lookup("DDNS_LOG_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        if let Some(path) = lookup("DDNS_CONFIG_FILE").filter(|p| !p.is_empty()) {
            let updater = UpdaterConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load DDNS_CONFIG_FILE {}", path))?;
            return Ok(Self {
                updater,
                log_level,
                log_file,
            });
        }

        let max_workers = match lookup("DDNS_MAX_WORKERS") {
            Some(raw) => raw.trim().parse::<usize>().with_context(|| {
                format!("DDNS_MAX_WORKERS must be a positive integer. Got: {}", raw)
            })?,
            None => 4,
        };

        let api_token = lookup("DDNS_PROVIDER_API_TOKEN").context(
            "DDNS_PROVIDER_API_TOKEN is required. \
            Set it via: export DDNS_PROVIDER_API_TOKEN=your_token",
        )?;
        let zone = lookup("DDNS_ZONE")
            .context("DDNS_ZONE is required. Set it via: export DDNS_ZONE=example.com")?;
        let records = lookup("DDNS_RECORDS").unwrap_or_default();
        let endpoints = lookup("DDNS_IP_ENDPOINTS")
            .filter(|e| !parse_list(e).is_empty())
            .unwrap_or_else(|| DEFAULT_IP_SERVICES.join(","));

        let dry_run = match lookup("DDNS_MODE").as_deref().map(str::trim) {
            None | Some("") | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DDNS_MODE '{}' is not supported. Supported modes: live, dry-run",
                other
            ),
        };

        let updater =
            UpdaterConfig::from_parts(max_workers, api_token, zone.trim(), &records, &endpoints)
                .with_dry_run(dry_run);

        Ok(Self {
            updater,
            log_level,
            log_file,
        })
    }

    /// Validate the configuration
    ///
    /// Structural checks are delegated to `UpdaterConfig::validate`; this
    /// adds name syntax, URL schemes and the log level.
    fn validate(&self) -> Result<()> {
        if self.updater.records.is_empty() {
            anyhow::bail!(
                "DDNS_RECORDS must contain at least one record. \
                Set it via: export DDNS_RECORDS=example.com,www.example.com"
            );
        }

        self.updater.validate()?;

        validate_domain_name(&self.updater.zone)
            .with_context(|| format!("Invalid zone name '{}'", self.updater.zone))?;

        for record in &self.updater.records {
            validate_domain_name(record)
                .with_context(|| format!("Invalid record name '{}'", record))?;
        }

        for url in &self.updater.ip_endpoints {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!(
                    "DDNS_IP_ENDPOINTS entries must use HTTP or HTTPS scheme. Got: {}",
                    url
                );
            }
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Endpoints served over plain HTTP
    fn insecure_endpoints(&self) -> Vec<&str> {
        self.updater
            .ip_endpoints
            .iter()
            .filter(|u| u.starts_with("http://"))
            .map(String::as_str)
            .collect()
    }
}

fn parse_log_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks. A leading `*` label is accepted for wildcard
/// records.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for (index, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if index == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        // Underscore is allowed for service labels such as _acme-challenge
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

/// Install the global tracing subscriber
fn init_tracing(level: Level, log_file: Option<&PathBuf>) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_thread_names(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open DDNS_LOG_FILE {}", path.display()))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    if let Err(e) = init_tracing(log_level, config.log_file.as_ref()) {
        eprintln!("Failed to set tracing subscriber: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("DDNS updater started");
    info!(
        "Configuration loaded: zone {}, {} record(s), {} worker(s)",
        config.updater.zone,
        config.updater.records.len(),
        config.updater.max_workers
    );
    for url in config.insecure_endpoints() {
        warn!("IP endpoint {} uses HTTP (not HTTPS). Consider using HTTPS.", url);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    match rt.block_on(run_once(config.updater)) {
        Ok(()) => DdnsExitCode::RunCompleted.into(),
        Err(e) => {
            error!("Startup error: {:#}", e);
            DdnsExitCode::ConfigError.into()
        }
    }
}

/// Build the components and run one reconciliation
///
/// Only construction can fail; the run itself reports through its outcome.
async fn run_once(updater: UpdaterConfig) -> Result<()> {
    let provider: Arc<dyn DnsProvider> = Arc::new(CloudflareProvider::from_config(&updater)?);
    let ip_source: Arc<dyn IpSource> =
        Arc::new(HttpIpSource::new(updater.ip_endpoints.clone())?);

    info!("DNS provider: {}", provider.provider_name());
    for record in &updater.records {
        debug!("Managing record: {}", record);
    }

    let (mut reconciler, mut events) = Reconciler::new(updater, provider, ip_source)?;
    let outcome = reconciler.launch_update_if_needed().await;

    while let Ok(event) = events.try_recv() {
        debug!("Run event: {:?}", event);
    }
    match outcome.abort_reason() {
        Some(reason) => warn!("Run finished without updating records: {}", reason),
        None => info!("Run finished: {:?}", outcome),
    }

    Ok(())
}
