use crate::cluster::router::ShardRouter;
use crate::cluster::types::{ClusterConfig, NodeAddr};

/// Routing decision for an edit, derived deterministically from
/// `(primary(original_name), primary(new_name), locality)`.
///
/// Same-shard edits travel as one intent so the owning node applies the
/// delete and the write together. Cross-shard edits decompose into the
/// standalone delete and add paths; the two legs are decoupled and not
/// atomic, so a concurrent reader may briefly observe the value under
/// neither name or under both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRoute {
    /// Both names share a primary and it is this node.
    SameShardLocal { primary: NodeAddr },
    /// Both names share a primary on another node; forward the intent.
    SameShardRemote { primary: NodeAddr },
    /// The names hash to different primaries; run a delete leg against the
    /// old shard and an add leg against the new one.
    CrossShard {
        old_primary: NodeAddr,
        new_primary: NodeAddr,
    },
}

impl EditRoute {
    pub fn classify(
        router: &ShardRouter,
        config: &ClusterConfig,
        original_name: &str,
        new_name: &str,
    ) -> Self {
        let old_primary = router.primary(original_name);
        let new_primary = router.primary(new_name);

        if old_primary == new_primary {
            if config.is_local(&old_primary) {
                EditRoute::SameShardLocal {
                    primary: old_primary,
                }
            } else {
                EditRoute::SameShardRemote {
                    primary: old_primary,
                }
            }
        } else {
            EditRoute::CrossShard {
                old_primary,
                new_primary,
            }
        }
    }
}
