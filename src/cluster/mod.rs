//! Cluster Coordination Module
//!
//! Holds the static cluster topology and the sharding logic built on it.
//!
//! ## Core Concepts
//! - **Membership**: The node list is fixed for the cluster's lifetime.
//!   `ClusterConfig` is built once at startup (from `PORT` and `NODES`) and
//!   shared read-only; there is no runtime join/leave and no gossip.
//! - **Sharding**: `ShardRouter` maps every contact name to exactly one
//!   primary node with a deterministic 32-bit hash. Because the hash and
//!   the node list are identical on every node, all nodes agree on the
//!   assignment without any communication.

pub mod router;
pub mod types;
