// # HTTP IP Source
//
// This crate discovers the host's public IPv4 address by asking plain-text
// "what is my IP" services over HTTP.
//
// ## Failover
//
// Endpoints are tried in the configured order, one at a time. The first
// endpoint that answers 2xx with a body parsing as an IPv4 address wins and
// no further endpoint is contacted. Failures are logged and the next
// endpoint is tried. If every endpoint fails the source reports `None`.
//
// Nothing is cached between calls.

use ddns_core::traits::IpSource;
use ddns_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

/// Per-request timeout for echo services
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default IP check services, in failover order
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",  // 43KB/day free, returns plain text IP
    "https://ifconfig.me/ip", // No rate limit documented
    "https://icanhazip.com",  // No rate limit documented
];

/// HTTP-based public IPv4 discovery with ordered failover
#[derive(Debug)]
pub struct HttpIpSource {
    /// Echo endpoints, tried in order
    endpoints: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `endpoints`: URLs answering with the caller's IP as plain text
    ///
    /// # Errors
    ///
    /// `Error::Transport` if the HTTP client cannot be built.
    pub fn new(endpoints: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoints, client })
    }

    /// Create a source using [`DEFAULT_IP_SERVICES`]
    pub fn with_default_services() -> Result<Self> {
        Self::new(DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect())
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Fetch the IP from a single echo service
    async fn fetch_ip(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!("HTTP error: {}", response.status())));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        let ip_text = ip_text.trim();

        ip_text
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::transport(format!("Invalid IPv4 address: {:?}", ip_text)))
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn discover_current_ip(&self) -> Option<Ipv4Addr> {
        for url in &self.endpoints {
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    tracing::debug!("Public IPv4 {} reported by {}", ip, url);
                    return Some(ip);
                }
                Err(e) => {
                    tracing::warn!("Can't retrieve public IPv4 address from {}: {}", url, e);
                }
            }
        }

        tracing::error!(
            "Public IPv4 address could not be retrieved from any of {} endpoint(s)",
            self.endpoints.len()
        );
        None
    }
}
