//! Reconciler
//!
//! The Reconciler runs one pass of the DDNS update flow:
//! - Resolving the configured zone
//! - Reading the published address of the reference record
//! - Discovering the current public IPv4 address
//! - Updating every record concurrently when the two differ
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!                  │  Reconciler  │─── RunEvent ───▶ (sink)
//!                  └──────────────┘
//!                     │        │
//!           ┌─────────┘        └──────────┐
//!           ▼                             ▼
//!   ┌─────────────┐              ┌──────────────┐
//!   │  IpSource   │              │ DnsProvider  │◀── N workers
//!   │ (discover)  │              │ (read/write) │
//!   └─────────────┘              └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Resolve zone (abort on failure)
//! 2. Read reference record content (abort on failure)
//! 3. Discover public IP
//! 4. Absent IP → abort; equal → up to date; different → update
//! 5. Update all records, at most `max_workers` at a time, and wait for all

use crate::config::UpdaterConfig;
use crate::error::{Error, Result};
use crate::record::RecordSet;
use crate::traits::{DnsProvider, IpSource};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Run started
    RunStarted { records_count: usize },

    /// Zone or reference record could not be resolved; nothing was updated
    ZoneResolutionFailed { error: String },

    /// Published address already matches the public IP
    AlreadyUpToDate { ip: Ipv4Addr },

    /// No IP-discovery endpoint produced an address
    PublicIpUnavailable,

    /// A record was updated
    RecordUpdated { record_name: String, ip: Ipv4Addr },

    /// A record update failed
    RecordUpdateFailed { record_name: String, error: String },

    /// An error nobody anticipated reached the run boundary
    UnexpectedError { error: String },

    /// Run finished
    RunFinished { outcome: RunOutcome },
}

/// Final outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing to do
    UpToDate { ip: Ipv4Addr },
    /// Discovery produced no address; nothing was updated
    IpUnavailable,
    /// A pre-check failed; nothing was updated
    Aborted { reason: String },
    /// Updates were dispatched
    Updated(UpdateSummary),
}

impl RunOutcome {
    /// Why the run stopped before writing, if it did
    pub fn abort_reason(&self) -> Option<String> {
        match self {
            Self::IpUnavailable => Some(Error::IpUnavailable.to_string()),
            Self::Aborted { reason } => Some(reason.clone()),
            Self::UpToDate { .. } | Self::Updated(_) => None,
        }
    }
}

/// Per-record results of the fan-out step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Address written to every record
    pub ip: Ipv4Addr,
    /// Records updated successfully, in completion order
    pub updated: Vec<String>,
    /// Records whose update failed, in completion order
    pub failed: Vec<RecordFailure>,
}

/// A single failed record update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub record_name: String,
    pub error: String,
}

impl UpdateSummary {
    /// Number of updates dispatched
    pub fn attempted(&self) -> usize {
        self.updated.len() + self.failed.len()
    }

    /// True when every dispatched update succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} records updated to {}",
            self.updated.len(),
            self.attempted(),
            self.ip
        )
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ResolvingZone,
    ReadingReference,
    DiscoveringIp,
    UpToDate,
    Aborted,
    Updating,
    Done,
}

/// Reconciles the configured A records with the current public IP
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`], keep the returned event receiver
/// 2. Call [`Reconciler::launch_update_if_needed()`] once per scheduled run
///
/// The Reconciler owns the [`RecordSet`]; `last_updated_at` stamps survive
/// between calls on the same instance but never across processes.
pub struct Reconciler {
    /// DNS provider for reading and writing records
    provider: Arc<dyn DnsProvider>,

    /// Public IP discovery
    ip_source: Arc<dyn IpSource>,

    /// Zone name
    zone: String,

    /// Managed records, reference first
    records: RecordSet,

    /// Maximum concurrent record updates
    max_workers: usize,

    /// Current state of the run
    state: RunState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<RunEvent>,
}

impl Reconciler {
    /// Create a new Reconciler
    ///
    /// # Parameters
    ///
    /// - `config`: Updater configuration (validated here)
    /// - `provider`: DNS provider implementation
    /// - `ip_source`: Public IP discovery implementation
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields run events
    pub fn new(
        config: UpdaterConfig,
        provider: Arc<dyn DnsProvider>,
        ip_source: Arc<dyn IpSource>,
    ) -> Result<(Self, mpsc::Receiver<RunEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            provider,
            ip_source,
            zone: config.zone,
            records: RecordSet::from_names(&config.records),
            max_workers: config.max_workers,
            state: RunState::Idle,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Managed records with their last-update stamps
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// State reached by the most recent run
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run one reconciliation pass
    ///
    /// Never fails: every problem is logged, emitted as a [`RunEvent`] and
    /// reflected in the returned [`RunOutcome`].
    pub async fn launch_update_if_needed(&mut self) -> RunOutcome {
        info!(
            "DDNS run started for zone {} ({} record(s))",
            self.zone,
            self.records.len()
        );
        self.emit_event(RunEvent::RunStarted {
            records_count: self.records.len(),
        });

        let outcome = match self.run_internal().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Unexpected error during DDNS run: {}", e);
                self.emit_event(RunEvent::UnexpectedError {
                    error: e.to_string(),
                });
                self.transition(RunState::Aborted);
                RunOutcome::Aborted {
                    reason: format!("unexpected error: {}", e),
                }
            }
        };

        self.transition(RunState::Done);
        debug!("DDNS run finished: {:?}", outcome);
        self.emit_event(RunEvent::RunFinished {
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn run_internal(&mut self) -> Result<RunOutcome> {
        let reference = self
            .records
            .reference()
            .map(|r| r.name.clone())
            .ok_or_else(|| Error::config("No records configured"))?;

        // Steps 1-2: any failure here aborts before a single write
        self.transition(RunState::ResolvingZone);
        let zone_lookup = self.provider.resolve_zone_id(&self.zone).await;
        let zone_id = match zone_lookup {
            Ok(id) => id,
            Err(e) => return Ok(self.abort_on_lookup(e)),
        };

        self.transition(RunState::ReadingReference);
        let reference_lookup = self.read_content(&zone_id, &reference).await;
        let dns_content = match reference_lookup {
            Ok(content) => content,
            Err(e) => return Ok(self.abort_on_lookup(e)),
        };
        debug!("Reference record {} currently points to {}", reference, dns_content);

        // Step 3
        self.transition(RunState::DiscoveringIp);
        let Some(current_ip) = self.ip_source.discover_current_ip().await else {
            error!("{}. Verify your network configuration", Error::IpUnavailable);
            self.emit_event(RunEvent::PublicIpUnavailable);
            self.transition(RunState::Aborted);
            return Ok(RunOutcome::IpUnavailable);
        };

        // Step 4
        if dns_content.trim() == current_ip.to_string() {
            info!("DNS records are already up to date ({}). No need for update", current_ip);
            self.emit_event(RunEvent::AlreadyUpToDate { ip: current_ip });
            self.transition(RunState::UpToDate);
            return Ok(RunOutcome::UpToDate { ip: current_ip });
        }

        // Step 5
        info!(
            "Public IPv4 changed: {} -> {}, updating {} record(s)",
            dns_content,
            current_ip,
            self.records.len()
        );
        self.transition(RunState::Updating);
        let summary = self.fan_out(&zone_id, current_ip).await?;

        if summary.is_complete() {
            info!("{}", summary);
        } else {
            warn!("{} ({} failed)", summary, summary.failed.len());
        }

        Ok(RunOutcome::Updated(summary))
    }

    /// Resolve a record and fetch its published content
    async fn read_content(&self, zone_id: &str, record_name: &str) -> Result<String> {
        let record_id = self.provider.resolve_record_id(zone_id, record_name).await?;
        self.provider.get_record_content(zone_id, &record_id).await
    }

    fn abort_on_lookup(&mut self, e: Error) -> RunOutcome {
        if e.is_not_found() {
            error!("Verify zone/records in your configuration. Error: {}", e);
        } else {
            error!("DNS lookup failed before any update. Error: {}", e);
        }
        self.emit_event(RunEvent::ZoneResolutionFailed {
            error: e.to_string(),
        });
        self.transition(RunState::Aborted);
        RunOutcome::Aborted {
            reason: e.to_string(),
        }
    }

    /// Update every record, bounded by `max_workers`, and wait for all of them
    async fn fan_out(&mut self, zone_id: &str, ip: Ipv4Addr) -> Result<UpdateSummary> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        let mut task_records = HashMap::new();

        for (index, record) in self.records.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let zone_id = zone_id.to_string();
            let record_name = record.name.clone();

            let handle = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("worker pool closed: {}", e)))?;
                update_one(provider.as_ref(), &zone_id, &record_name, ip).await
            });
            task_records.insert(handle.id(), index);
        }

        let mut summary = UpdateSummary {
            ip,
            updated: Vec::new(),
            failed: Vec::new(),
        };

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_err) => {
                    let id = join_err.id();
                    let message = format!("update task failed: {}", join_err);
                    error!("Unexpected error: {}", message);
                    self.emit_event(RunEvent::UnexpectedError {
                        error: message.clone(),
                    });
                    (id, Err(Error::Other(message)))
                }
            };

            let index = *task_records
                .get(&id)
                .ok_or_else(|| Error::Other(format!("unknown update task {}", id)))?;
            let record_name = self
                .records
                .get(index)
                .map(|r| r.name.clone())
                .unwrap_or_default();

            match result {
                Ok(updated_at) => {
                    self.records.mark_updated(index, updated_at);
                    self.emit_event(RunEvent::RecordUpdated {
                        record_name: record_name.clone(),
                        ip,
                    });
                    summary.updated.push(record_name);
                }
                Err(e) => {
                    error!("Failed to update DNS A - {}: {}", record_name, e);
                    self.emit_event(RunEvent::RecordUpdateFailed {
                        record_name: record_name.clone(),
                        error: e.to_string(),
                    });
                    summary.failed.push(RecordFailure {
                        record_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Emit a run event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: RunEvent) {
        // A full or closed channel must never stall the run
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full or closed, dropping run event");
        }
    }
}

/// Re-resolve one record and write the new address
///
/// Returns the local time taken right after the write succeeded.
async fn update_one(
    provider: &dyn DnsProvider,
    zone_id: &str,
    record_name: &str,
    ip: Ipv4Addr,
) -> Result<DateTime<Local>> {
    let record_id = provider.resolve_record_id(zone_id, record_name).await?;
    provider
        .set_record_content(zone_id, &record_id, record_name, ip)
        .await?;
    let updated_at = Local::now();
    info!("DNS A - {} updated with new public IPv4: {}", record_name, ip);
    Ok(updated_at)
}
