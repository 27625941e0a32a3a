//! Bounded, in-memory audit log of request/response exchanges.
//!
//! Records are newest-first; the store never grows past its capacity and is
//! lost on restart. One record per inbound request, including CORS preflight.

use crate::template::iso_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::VecDeque;

/// Default number of audit records retained.
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Distinguishes ordinary dispatch records from CORS preflight records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// Ordinary mock dispatch (hit, miss, or method mismatch)
    Endpoint,
    /// CORS preflight handshake
    Cors,
}

/// Snapshot of the response actually sent to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status: u16,
    pub content_type: String,
    pub body: String,
    pub headers: HashMap<String, String>,
}

/// Immutable snapshot of one request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unique id: `<unix-millis>-<random alphanumeric suffix>`
    pub id: String,
    /// ISO-8601 creation instant
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub request_headers: HashMap<String, String>,
    pub request_body: String,
    pub user_agent: String,
    /// Best-effort originating address from forwarding headers
    pub ip: String,
    pub content_type: String,
    pub response: ResponseSnapshot,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    pub source: LogSource,
}

impl AuditRecord {
    /// Build a record from an observed exchange. Header-derived fields fall
    /// back to `"Unknown"` when absent, matching what the dashboard expects.
    pub fn from_exchange(
        method: &str,
        path: &str,
        request_headers: &HashMap<String, String>,
        request_body: &str,
        response: ResponseSnapshot,
        processing_time_ms: u64,
        source: LogSource,
    ) -> Self {
        let header = |name: &str| {
            request_headers
                .get(name)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string())
        };
        let ip = request_headers
            .get("x-forwarded-for")
            .or_else(|| request_headers.get("x-real-ip"))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            id: generate_record_id(),
            timestamp: iso_timestamp(),
            method: method.to_string(),
            path: path.to_string(),
            request_headers: request_headers.clone(),
            request_body: request_body.to_string(),
            user_agent: header("user-agent"),
            ip,
            content_type: header("content-type"),
            response,
            processing_time_ms,
            source,
        }
    }
}

/// Generate a record id unique even for records created within the same
/// millisecond.
pub fn generate_record_id() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}

/// Bounded, newest-first buffer of [`AuditRecord`]s.
///
/// Appends insert at the front; once the buffer exceeds its capacity the
/// oldest (tail) entries are dropped.
#[derive(Debug)]
pub struct RingLogStore {
    capacity: usize,
    entries: VecDeque<AuditRecord>,
}

impl RingLogStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }

    /// Insert a record at the head, evicting the oldest entries past capacity.
    pub fn append(&mut self, record: AuditRecord) {
        self.entries.push_front(record);
        self.entries.truncate(self.capacity);
    }

    /// All records, newest-first, as an independent copy.
    pub fn list(&self) -> Vec<AuditRecord> {
        self.entries.iter().cloned().collect()
    }

    /// Empty the store. Idempotent.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RingLogStore {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
