use super::store::{ContactStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reserved key prefix for writes awaiting delivery to their primary.
pub const PENDING_PREFIX: &str = "pending_";
/// Reserved key prefix for pending writes whose retries were exhausted.
pub const DEAD_LETTER_PREFIX: &str = "dead_";

/// Retries per entry before it is quarantined.
pub const MAX_ATTEMPTS: u32 = 8;

const RETRY_BASE_MS: u64 = 10_000;
const RETRY_CAP_MS: u64 = 600_000;
const RETRY_JITTER_MS: u64 = 1_000;

/// A buffered mutating operation that could not reach its primary.
///
/// All three mutation kinds share one fallback path; the reconciler
/// resubmits each variant with the matching forward call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
    Add {
        name: String,
        phone: String,
    },
    Delete {
        name: String,
    },
    Edit {
        original_name: String,
        name: String,
        phone: String,
    },
}

impl PendingOp {
    /// The name whose primary must receive this operation. Edits route by
    /// the new name; for same-shard edits both names map to the same node
    /// anyway.
    pub fn routing_name(&self) -> &str {
        match self {
            PendingOp::Add { name, .. } => name,
            PendingOp::Delete { name } => name,
            PendingOp::Edit { name, .. } => name,
        }
    }
}

/// A pending operation plus its retry accounting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingRecord {
    pub op: PendingOp,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    /// Unix millis before which the reconciler must not retry this entry.
    /// Zero for fresh entries, so they are eligible on the next cycle.
    pub not_before_ms: u64,
}

/// The pending-write queue: a typed view over the `pending_` namespace of
/// the local store.
///
/// Writers are exactly the request handlers (enqueue on forward failure)
/// and the reconciler (resolve, defer, quarantine). No locking beyond the
/// store's own transactional guarantees.
pub struct PendingQueue {
    store: Arc<ContactStore>,
}

impl PendingQueue {
    pub fn new(store: Arc<ContactStore>) -> Self {
        Self { store }
    }

    /// Buffers an operation for later delivery. Fresh entries are due
    /// immediately.
    pub fn enqueue(&self, op: PendingOp) -> Result<(), StoreError> {
        let key = format!("{PENDING_PREFIX}{}", op.routing_name());
        let record = PendingRecord {
            op,
            attempts: 0,
            not_before_ms: 0,
        };
        self.store.put(&key, &serde_json::to_string(&record)?)?;
        Ok(())
    }

    /// All pending records keyed by routing name. Records that fail to
    /// decode are skipped with a warning; they stay in place for manual
    /// inspection.
    pub fn list(&self) -> Result<Vec<(String, PendingRecord)>, StoreError> {
        let mut records = Vec::new();
        for (key, value) in self.store.scan_prefix(PENDING_PREFIX)? {
            let name = key[PENDING_PREFIX.len()..].to_string();
            match serde_json::from_str::<PendingRecord>(&value) {
                Ok(record) => records.push((name, record)),
                Err(e) => {
                    tracing::warn!("Skipping undecodable pending record {}: {}", key, e);
                }
            }
        }
        Ok(records)
    }

    /// Removes a delivered entry.
    pub fn resolve(&self, name: &str) -> Result<(), StoreError> {
        self.store.delete(&format!("{PENDING_PREFIX}{name}"))
    }

    /// Registers a failed delivery attempt: reschedules the entry with
    /// exponential backoff, or quarantines it once the attempt budget is
    /// spent so a genuinely dead primary is not probed forever.
    pub fn record_failure(&self, name: &str, record: &PendingRecord) -> Result<(), StoreError> {
        let attempts = record.attempts + 1;

        if attempts >= MAX_ATTEMPTS {
            let dead = PendingRecord {
                op: record.op.clone(),
                attempts,
                not_before_ms: 0,
            };
            self.store.put(
                &format!("{DEAD_LETTER_PREFIX}{name}"),
                &serde_json::to_string(&dead)?,
            )?;
            self.resolve(name)?;
            tracing::warn!(
                "Pending entry for '{}' exhausted {} attempts, moved to dead letter",
                name,
                attempts
            );
            return Ok(());
        }

        let jitter = rand::random::<u64>() % RETRY_JITTER_MS;
        let deferred = PendingRecord {
            op: record.op.clone(),
            attempts,
            not_before_ms: now_ms() + base_backoff_ms(attempts) + jitter,
        };
        self.store.put(
            &format!("{PENDING_PREFIX}{name}"),
            &serde_json::to_string(&deferred)?,
        )?;
        Ok(())
    }
}

/// Deterministic part of the retry delay: doubles per attempt, capped.
pub fn base_backoff_ms(attempts: u32) -> u64 {
    RETRY_BASE_MS
        .saturating_mul(1u64 << attempts.min(16))
        .min(RETRY_CAP_MS)
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
