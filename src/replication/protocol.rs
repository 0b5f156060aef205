//! Inter-node Wire Protocol
//!
//! Defines the HTTP endpoints and Data Transfer Objects used between
//! cluster members. Client-facing forwards reuse the public form-encoded
//! endpoints; replication pushes are JSON.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Public endpoint for client writes; also the target of forwarded adds
/// and reconciler resubmissions.
pub const ENDPOINT_ADD: &str = "/add";
/// Public endpoint for client deletes (broadcasts to the cluster).
pub const ENDPOINT_DELETE: &str = "/delete";
/// Internal endpoint applying a broadcast delete locally.
pub const ENDPOINT_DELETE_REMOTE: &str = "/delete_remote";
/// Public endpoint for client edits; also the target of forwarded edits.
pub const ENDPOINT_EDIT: &str = "/edit";
/// Endpoint for pushing a replicated contact from a primary to a backup.
pub const ENDPOINT_REPLICATE: &str = "/replicate";
/// Endpoint for pushing a replicated edit intent to a backup.
pub const ENDPOINT_REPLICATE_EDIT: &str = "/replicate_edit";
/// Liveness probe endpoint.
pub const ENDPOINT_PING: &str = "/ping";

// --- Data Transfer Objects ---

/// A directory entry. The name is both the identity and the storage key;
/// the phone number is an opaque value replaced wholesale on every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

/// A rename/update intent. Decomposes into a delete of `original_name`
/// followed by a write of `name`; it has no stored representation of its
/// own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditRequest {
    pub original_name: String,
    pub name: String,
    pub phone: String,
}

/// Acknowledgment returned by the replication endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub status: String,
}
