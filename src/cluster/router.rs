use super::types::{ClusterConfig, NodeAddr};
use std::sync::Arc;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a. Every node must compute identical hashes for the shard
/// assignment to agree cluster-wide, so the algorithm is fixed here rather
/// than delegated to `std::hash` (whose output is not stable across
/// releases or processes).
pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Maps contact names to their owning nodes.
///
/// `primary` is a pure function of `(name, node list)`: hash the name and
/// index into the membership list. Backups are every other member, so the
/// full membership always holds `primary ∪ backups`.
#[derive(Clone)]
pub struct ShardRouter {
    config: Arc<ClusterConfig>,
}

impl ShardRouter {
    pub fn new(config: Arc<ClusterConfig>) -> Self {
        Self { config }
    }

    /// The node that owns authoritative writes for `name`.
    pub fn primary(&self, name: &str) -> NodeAddr {
        let nodes = self.config.nodes();
        let idx = fnv1a_32(name.as_bytes()) as usize % nodes.len();
        nodes[idx].clone()
    }

    /// All members except the primary. The set is the same no matter which
    /// node computes it; callers that find themselves in the set apply the
    /// operation locally instead of sending it over HTTP.
    pub fn backups(&self, primary: &NodeAddr) -> Vec<NodeAddr> {
        self.config
            .nodes()
            .iter()
            .filter(|n| *n != primary)
            .cloned()
            .collect()
    }
}
