//! Local Storage Module
//!
//! Implements the node-private, durable state layer.
//!
//! ## Core Concepts
//! - **Contact Store**: An embedded ordered key-value engine (redb). The
//!   contact name is the storage key; values survive process restarts and
//!   are safe for concurrent access from multiple request tasks.
//! - **Namespaces**: One table holds live contacts plus two reserved
//!   prefixes: `pending_` for writes awaiting delivery to their primary,
//!   and `dead_` for pending writes whose retries were exhausted. Reserved
//!   keys never appear in contact listings.
//! - **Pending Queue**: Typed records over the `pending_` namespace with
//!   per-entry retry accounting, written by request handlers and drained by
//!   the reconciler.

pub mod pending;
pub mod store;
