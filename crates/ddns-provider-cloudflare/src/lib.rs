// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 implementation of
// `ddns_core::DnsProvider`.
//
// Each trait method is exactly one HTTP request. Zone and record identifiers
// are never cached: the reconciler resolves them again on every run.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - DNS Record Details: GET `/zones/:zone_id/dns_records/:record_id`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::UpdaterConfig;
use ddns_core::traits::DnsProvider;
use ddns_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare's "automatic" TTL sentinel
const AUTOMATIC_TTL: u32 = 1;

/// Record type managed by this provider
const RECORD_TYPE: &str = "A";

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Zone or record list entry; only the identifier is used
#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RecordDetail {
    content: String,
}

fn default_success() -> bool {
    true
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup, record content)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty, `Error::Transport` if the HTTP
    /// client cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    pub fn new_dry_run(api_token: impl Into<String>) -> Result<Self> {
        Self::new(api_token, true)
    }

    /// Create a provider from the updater configuration
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        if config.dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        Self::new(config.api_token.clone(), config.dry_run)
    }

    /// Point the provider at another API root (e.g. a local test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Attach the bearer token and JSON content type
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
    }

    /// Send a request and decode the envelope's `result`
    ///
    /// `action` names the operation in error messages.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
        let response = self.dispatch(request, action).await?;

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| Error::api(format!("Failed to parse response: {}", e)))?;
        check_success(&envelope, action)?;

        envelope
            .result
            .ok_or_else(|| Error::api(format!("Invalid response format: {} returned no result", action)))
    }

    /// Send a request whose response only reports success or failure
    ///
    /// An empty body or a null `result` is accepted; `success: false` is not.
    async fn send_for_status(&self, request: RequestBuilder, action: &str) -> Result<()> {
        let response = self.dispatch(request, action).await?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;
        if body.trim().is_empty() {
            return Ok(());
        }

        let envelope: ApiEnvelope<IgnoredAny> = serde_json::from_str(&body)
            .map_err(|e| Error::api(format!("Failed to parse response: {}", e)))?;
        check_success(&envelope, action)
    }

    /// Send an authorized request and reject non-success statuses
    async fn dispatch(&self, request: RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, action));
        }

        Ok(response)
    }

    /// Payload for a record update
    fn update_payload(record_name: &str, ip: Ipv4Addr) -> serde_json::Value {
        serde_json::json!({
            "type": RECORD_TYPE,
            "name": record_name,
            "content": ip.to_string(),
            "ttl": AUTOMATIC_TTL,
            "proxied": false,
        })
    }
}

/// Reject an envelope reporting `success: false`
fn check_success<T>(envelope: &ApiEnvelope<T>, action: &str) -> Result<()> {
    if envelope.success {
        return Ok(());
    }
    let messages: Vec<String> = envelope
        .errors
        .iter()
        .map(|m| format!("{} ({})", m.message, m.code))
        .collect();
    Err(Error::api(format!("{} failed: {}", action, messages.join("; "))))
}

/// Map a non-success HTTP status to an API error
fn status_error(status: StatusCode, error_text: &str, action: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::api(format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        409 => Error::api(format!(
            "Conflict: Record is being updated by another process. Status: {}",
            status
        )),
        429 => Error::api(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::api(format!(
            "Cloudflare server error (transient): {} - {}",
            status, error_text
        )),
        _ => Error::api(format!("{} failed: {} - {}", action, status, error_text)),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for: {}", zone_name);

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", zone_name)]);
        let zones: Vec<IdOnly> = self.send(request, "Zone lookup").await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_record_id(&self, zone_id: &str, record_name: &str) -> Result<String> {
        tracing::debug!("Looking up record ID: {} (type: {})", record_name, RECORD_TYPE);

        let request = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.base_url, zone_id))
            .query(&[("type", RECORD_TYPE), ("name", record_name)]);
        let records: Vec<IdOnly> = self.send(request, "Record lookup").await?;

        let record = records.into_iter().next().ok_or_else(|| {
            Error::not_found(format!(
                "DNS record not found: {} (type: {})",
                record_name, RECORD_TYPE
            ))
        })?;

        tracing::debug!("Found record ID: {}", record.id);
        Ok(record.id)
    }

    async fn get_record_content(&self, zone_id: &str, record_id: &str) -> Result<String> {
        let request = self.client.get(format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, record_id
        ));
        let record: RecordDetail = self.send(request, "Get record").await?;
        Ok(record.content)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "...", "content": "1.2.3.4", "ttl": 1, "proxied": false }
    /// ```
    async fn set_record_content(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        ip: Ipv4Addr,
    ) -> Result<()> {
        let url = format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id);
        let payload = Self::update_payload(record_name, ip);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        tracing::debug!("Updating DNS record: {} -> {}", record_name, ip);
        let request = self.client.put(&url).json(&payload);
        self.send_for_status(request, "Record update").await
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
