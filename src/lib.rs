//! Distributed Contact Directory Library
//!
//! This library crate defines the core modules of a horizontally-sharded,
//! replicated contact directory. Every node in the cluster runs the same
//! binary (`main.rs`) and cooperates via a static membership list.
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`cluster`**: The coordination layer. Holds the immutable cluster
//!   configuration (node list + local address) and the shard router that
//!   deterministically assigns every contact name to a primary node.
//! - **`storage`**: The local state layer. Wraps an embedded, durable,
//!   ordered key-value engine and the pending-write queue used when a
//!   primary is unreachable.
//! - **`replication`**: The inter-node layer. Implements the wire protocol,
//!   the fire-and-forget replication fan-out, and the background reconciler
//!   that drains pending writes once their primary recovers.
//! - **`ops`**: The request orchestration layer. Routes each client
//!   operation (add/delete/edit) through sharding, storage and replication,
//!   and exposes the HTTP handlers.

pub mod cluster;
pub mod ops;
pub mod replication;
pub mod storage;
