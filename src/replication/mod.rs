//! Replication Module
//!
//! Implements inter-node coordination for the contact directory.
//!
//! ## Core Concepts
//! - **Protocol**: Endpoint constants and the DTOs exchanged between nodes
//!   (form-encoded client forwards, JSON replication pushes).
//! - **Replicator**: Owns the HTTP client. Synchronous forwards to a
//!   primary block the calling request task with a short timeout;
//!   replication and delete fan-out are dispatched as bounded-concurrency
//!   background tasks whose failures are logged, never surfaced.
//! - **Reconciler**: A single long-lived task that periodically retries
//!   buffered writes against their (possibly recovered) primary.

pub mod protocol;
pub mod reconciler;
pub mod replicator;
