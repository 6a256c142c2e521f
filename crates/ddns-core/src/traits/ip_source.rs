// # IP Source Trait
//
// Defines the interface for discovering the caller's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP echo services with ordered fallback: `ddns-ip-http` crate

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public-IP discovery
///
/// Discovery is best effort. Failures of individual services are the
/// implementation's business: they are logged and the next service is tried.
/// Only the overall absence of an answer reaches the caller, as `None`.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Discover the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Some(Ipv4Addr)`: The first address successfully reported
    /// - `None`: No service produced an address
    async fn discover_current_ip(&self) -> Option<Ipv4Addr>;
}
