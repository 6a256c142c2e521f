//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles record every call so tests can assert on what the
//! reconciler asked the provider to do.

#![allow(dead_code)]

use ddns_core::config::UpdaterConfig;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, IpSource};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A single PUT issued by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCall {
    pub zone_id: String,
    pub record_id: String,
    pub record_name: String,
    pub content: String,
    pub record_type: &'static str,
}

/// A mock DnsProvider backed by an in-memory zone
pub struct MockDnsProvider {
    zone_name: String,
    zone_missing: bool,
    missing_records: HashSet<String>,
    failing_records: HashSet<String>,
    panicking_records: HashSet<String>,
    put_delay: Duration,
    /// Published content per record name
    content: Mutex<HashMap<String, String>>,
    puts: Mutex<Vec<PutCall>>,
    zone_calls: AtomicUsize,
    content_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockDnsProvider {
    /// A zone in which every record name resolves and publishes `content`
    pub fn new(zone_name: &str, content: &str) -> Self {
        Self {
            zone_name: zone_name.to_string(),
            zone_missing: false,
            missing_records: HashSet::new(),
            failing_records: HashSet::new(),
            panicking_records: HashSet::new(),
            put_delay: Duration::ZERO,
            content: Mutex::new(HashMap::from([("*".to_string(), content.to_string())])),
            puts: Mutex::new(Vec::new()),
            zone_calls: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Zone lookups return an empty result set
    pub fn with_missing_zone(mut self) -> Self {
        self.zone_missing = true;
        self
    }

    /// Record lookups for `name` return an empty result set
    pub fn with_missing_record(mut self, name: &str) -> Self {
        self.missing_records.insert(name.to_string());
        self
    }

    /// PUTs for `name` fail with an API error
    pub fn with_failing_record(mut self, name: &str) -> Self {
        self.failing_records.insert(name.to_string());
        self
    }

    /// PUTs for `name` panic
    pub fn with_panicking_record(mut self, name: &str) -> Self {
        self.panicking_records.insert(name.to_string());
        self
    }

    /// Hold each PUT open for `delay`
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn zone_call_count(&self) -> usize {
        self.zone_calls.load(Ordering::SeqCst)
    }

    pub fn content_call_count(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    /// Highest number of PUTs observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn published(&self, record_name: &str) -> String {
        let content = self.content.lock().unwrap();
        content
            .get(record_name)
            .or_else(|| content.get("*"))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        self.zone_calls.fetch_add(1, Ordering::SeqCst);
        if self.zone_missing || zone_name != self.zone_name {
            return Err(Error::not_found(format!("Zone not found: {}", zone_name)));
        }
        Ok(format!("zone-{}", zone_name))
    }

    async fn resolve_record_id(&self, _zone_id: &str, record_name: &str) -> Result<String> {
        if self.missing_records.contains(record_name) {
            return Err(Error::not_found(format!(
                "DNS record not found: {} (type: A)",
                record_name
            )));
        }
        Ok(format!("rec-{}", record_name))
    }

    async fn get_record_content(&self, _zone_id: &str, record_id: &str) -> Result<String> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let name = record_id.trim_start_matches("rec-");
        Ok(self.published(name))
    }

    async fn set_record_content(
        &self,
        zone_id: &str,
        record_id: &str,
        record_name: &str,
        ip: Ipv4Addr,
    ) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.put_delay.is_zero() {
            tokio::time::sleep(self.put_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking_records.contains(record_name) {
            panic!("provider blew up for {}", record_name);
        }

        self.puts.lock().unwrap().push(PutCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            record_name: record_name.to_string(),
            content: ip.to_string(),
            record_type: "A",
        });

        if self.failing_records.contains(record_name) {
            return Err(Error::api(format!(
                "Failed to update record: 400 Bad Request - {}",
                record_name
            )));
        }

        self.content
            .lock()
            .unwrap()
            .insert(record_name.to_string(), ip.to_string());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An IP source that always answers the same thing
pub struct StaticIpSource {
    ip: Option<Ipv4Addr>,
    calls: AtomicUsize,
}

impl StaticIpSource {
    pub fn new(ip: Option<Ipv4Addr>) -> Self {
        Self {
            ip,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn discover_current_ip(&self) -> Option<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip
    }
}

/// Helper to create a minimal UpdaterConfig for testing
pub fn test_config(zone: &str, records: &[&str], max_workers: usize) -> UpdaterConfig {
    UpdaterConfig::from_parts(
        max_workers,
        "test-token",
        zone,
        &records.join(","),
        "http://127.0.0.1:9/ip",
    )
}

/// Helper to coerce a shared mock into the trait object the reconciler takes
pub fn as_provider(provider: &Arc<MockDnsProvider>) -> Arc<dyn DnsProvider> {
    provider.clone()
}

pub fn as_ip_source(source: &Arc<StaticIpSource>) -> Arc<dyn IpSource> {
    source.clone()
}
