//! In-memory record set
//!
//! The set lives for a single run. Nothing here is persisted.

use chrono::{DateTime, Local};

/// A managed DNS A record and the time this process last updated it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Record name (e.g. "home.example.com")
    pub name: String,
    /// Local time of the last confirmed update, if any
    pub last_updated_at: Option<DateTime<Local>>,
}

impl DnsRecord {
    /// Create a record that has not been updated yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_updated_at: None,
        }
    }
}

/// Ordered collection of managed records
///
/// The first record is the reference record used for drift detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: Vec<DnsRecord>,
}

impl RecordSet {
    /// Build a set from record names, in order, trimming whitespace
    ///
    /// Names that are empty after trimming are skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .map(DnsRecord::new)
            .collect();
        Self { records }
    }

    /// The reference record (first configured), if any
    pub fn reference(&self) -> Option<&DnsRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DnsRecord> {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DnsRecord> {
        self.records.get(index)
    }

    /// Record a confirmed update for the record at `index`
    ///
    /// Returns false if the index is out of range.
    pub fn mark_updated(&mut self, index: usize, at: DateTime<Local>) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.last_updated_at = Some(at);
                true
            }
            None => false,
        }
    }
}
