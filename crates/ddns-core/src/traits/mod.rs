//! Core traits for the DDNS updater
//!
//! - [`IpSource`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Read and write A records via the provider API

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::DnsProvider;
