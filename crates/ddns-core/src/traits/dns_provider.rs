// # DNS Provider Trait
//
// Defines the interface the reconciler uses to read and write records at
// the remote DNS API.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// let zone_id = provider.resolve_zone_id("example.com").await?;
// let record_id = provider.resolve_record_id(&zone_id, "home.example.com").await?;
// let content = provider.get_record_content(&zone_id, &record_id).await?;
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for DNS provider implementations
///
/// Every method is a single request/response exchange with the provider.
/// Implementations hold no per-zone or per-record state: identifiers are
/// resolved again on every call.
///
/// # Thread Safety
///
/// Implementations must be thread-safe; the reconciler shares one instance
/// across all update workers.
///
/// # Name resolution
///
/// When the provider returns several matches for a name, the first one is
/// used. No disambiguation is attempted.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a zone name to the provider's zone identifier
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Identifier of the first matching zone
    /// - `Err(Error::NotFound)`: No zone matches
    /// - `Err(Error::Api)` / `Err(Error::Transport)`: The request failed
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// Resolve an A record name within a zone to the provider's record identifier
    ///
    /// Same failure modes as [`DnsProvider::resolve_zone_id`].
    async fn resolve_record_id(
        &self,
        zone_id: &str,
        record_name: &str,
    ) -> Result<String, crate::Error>;

    /// Fetch the content (the published address) of a record
    async fn get_record_content(
        &self,
        zone_id: &str,
        record_id: &str,
    ) -> Result<String, crate::Error>;

    /// Replace the content of an A record
    ///
    /// Type is always "A", TTL is the provider's automatic value and proxying
    /// is disabled.
    async fn set_record_content(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        ip: Ipv4Addr,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
