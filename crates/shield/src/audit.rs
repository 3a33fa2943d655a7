//! Block-audit ring buffer.
//!
//! Every blocked request appends one row. The buffer holds at most
//! `capacity` rows; on overflow the oldest half is dropped in a single
//! batch so eviction cost stays amortized under the one mutex.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use sg_adblock::ResourceType;

/// One blocked request, as recorded for the audit sink.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    pub request_id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub host: String,
    #[serde(serialize_with = "ser_resource_type")]
    pub resource_type: ResourceType,
    /// `None` when the block came from the non-rule allow/denylist path.
    pub rule_id: Option<String>,
    pub action: String,
    pub page_url: Option<String>,
    pub method: String,
}

fn ser_resource_type<S: serde::Serializer>(
    ty: &ResourceType,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(ty.as_str())
}

/// Fixed-capacity FIFO of [`AuditRow`]s.
pub struct AuditBuffer {
    rows: Mutex<VecDeque<AuditRow>>,
    capacity: usize,
}

impl AuditBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: Mutex::new(VecDeque::new()),
            capacity: capacity.max(2),
        }
    }

    /// Append one row, halving the buffer first when it is full.
    pub fn push(&self, row: AuditRow) {
        let mut rows = self.rows.lock();
        if rows.len() >= self.capacity {
            let drop = self.capacity / 2;
            rows.drain(..drop);
            tracing::debug!(dropped = drop, "audit buffer halved");
        }
        rows.push_back(row);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// The most recent `n` rows, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AuditRow> {
        let rows = self.rows.lock();
        rows.iter().rev().take(n).rev().cloned().collect()
    }

    pub fn clear(&self) {
        self.rows.lock().clear();
    }
}
