// # ddns-core
//
// Core library for the one-shot DDNS updater.
//
// ## Architecture Overview
//
// One run keeps a set of DNS A records pointed at the machine's public IPv4:
// - **IpSource**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for reading/writing A records via a provider API
// - **RecordSet**: The managed records and their last-update stamps
// - **Reconciler**: Compares published and public IPs and fans out updates
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic lives here, HTTP lives in
//    the provider and IP-source crates
// 2. **Stateless runs**: Nothing survives the process; an external scheduler
//    drives repetition
// 3. **Fail fast before writing**: Any pre-check failure aborts the run
//    before the first update
// 4. **Library-First**: The binary is a thin shell around `Reconciler`

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod record;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider};
pub use engine::{Reconciler, RunEvent, RunOutcome, RunState, UpdateSummary};
pub use config::UpdaterConfig;
pub use error::{Error, Result};
pub use record::{DnsRecord, RecordSet};
