//! Ops Module Tests
//!
//! Validates the per-operation orchestration and the edit state machine.
//!
//! ## Test Scopes
//! - **EditRoute**: Deterministic branch selection for every edit shape,
//!   in isolation from the HTTP layer.
//! - **Directory**: Local write/read/delete paths, the pending fallback
//!   when a primary is unreachable, and the inbound replica operations.
//! - **Handlers**: Input validation at the HTTP boundary.

#[cfg(test)]
mod tests {
    use crate::cluster::router::ShardRouter;
    use crate::cluster::types::{ClusterConfig, NodeAddr};
    use crate::ops::directory::Directory;
    use crate::ops::edit::EditRoute;
    use crate::ops::handlers::{handle_add, AddForm};
    use crate::replication::protocol::{Contact, EditRequest};
    use crate::replication::replicator::Replicator;
    use crate::storage::pending::{PendingOp, PendingQueue, PENDING_PREFIX};
    use crate::storage::store::ContactStore;

    use axum::extract::{Extension, Form};
    use std::sync::Arc;
    use std::time::Duration;

    const DEAD_ADDR: &str = "http://127.0.0.1:1";

    struct TestNode {
        config: Arc<ClusterConfig>,
        router: ShardRouter,
        store: Arc<ContactStore>,
        pending: Arc<PendingQueue>,
        directory: Arc<Directory>,
        _dir: tempfile::TempDir,
    }

    fn test_node(nodes: Vec<NodeAddr>, local: NodeAddr) -> TestNode {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(ClusterConfig::new(nodes, local, 0).unwrap());
        let router = ShardRouter::new(config.clone());
        let store = Arc::new(ContactStore::open(dir.path().join("node.redb")).unwrap());
        let pending = Arc::new(PendingQueue::new(store.clone()));
        let replicator = Arc::new(Replicator::new(
            config.clone(),
            router.clone(),
            pending.clone(),
        ));
        let directory = Arc::new(Directory::new(
            config.clone(),
            router.clone(),
            store.clone(),
            pending.clone(),
            replicator,
        ));
        TestNode {
            config,
            router,
            store,
            pending,
            directory,
            _dir: dir,
        }
    }

    fn single_node() -> TestNode {
        let local = NodeAddr::new("http://localhost:9");
        test_node(vec![local.clone()], local)
    }

    /// Entry node in a two-node cluster whose peer is unreachable.
    fn node_with_dead_peer() -> (TestNode, NodeAddr) {
        let local = NodeAddr::new("http://localhost:9");
        let dead = NodeAddr::new(DEAD_ADDR);
        (test_node(vec![local.clone(), dead.clone()], local), dead)
    }

    fn name_owned_by(router: &ShardRouter, target: &NodeAddr) -> String {
        names_owned_by(router, target, 1).remove(0)
    }

    fn names_owned_by(router: &ShardRouter, target: &NodeAddr, count: usize) -> Vec<String> {
        (0..)
            .map(|i| format!("contact_{i}"))
            .filter(|name| &router.primary(name) == target)
            .take(count)
            .collect()
    }

    // ============================================================
    // EDIT ROUTE TESTS
    // ============================================================

    #[test]
    fn test_classify_same_shard_local() {
        let node = single_node();
        let names = names_owned_by(&node.router, node.config.local(), 2);

        let route = EditRoute::classify(&node.router, &node.config, &names[0], &names[1]);
        assert_eq!(
            route,
            EditRoute::SameShardLocal {
                primary: node.config.local().clone()
            }
        );
    }

    #[test]
    fn test_classify_same_shard_remote() {
        let (node, dead) = node_with_dead_peer();
        let names = names_owned_by(&node.router, &dead, 2);

        let route = EditRoute::classify(&node.router, &node.config, &names[0], &names[1]);
        assert_eq!(route, EditRoute::SameShardRemote { primary: dead });
    }

    #[test]
    fn test_classify_cross_shard() {
        let (node, dead) = node_with_dead_peer();
        let local_name = name_owned_by(&node.router, node.config.local());
        let remote_name = name_owned_by(&node.router, &dead);

        let route = EditRoute::classify(&node.router, &node.config, &remote_name, &local_name);
        assert_eq!(
            route,
            EditRoute::CrossShard {
                old_primary: dead,
                new_primary: node.config.local().clone(),
            }
        );
    }

    #[test]
    fn test_classify_unchanged_name_stays_same_shard() {
        let node = single_node();
        let name = name_owned_by(&node.router, node.config.local());

        let route = EditRoute::classify(&node.router, &node.config, &name, &name);
        assert!(matches!(route, EditRoute::SameShardLocal { .. }));
    }

    // ============================================================
    // DIRECTORY TESTS (local paths)
    // ============================================================

    #[tokio::test]
    async fn test_add_then_list_at_primary() {
        let node = single_node();

        node.directory.add("alice", "111").await.unwrap();

        let listed = node.directory.list().unwrap();
        assert_eq!(
            listed,
            vec![Contact {
                name: "alice".to_string(),
                phone: "111".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_add_overwrites_existing_phone() {
        let node = single_node();

        node.directory.add("alice", "111").await.unwrap();
        node.directory.add("alice", "999").await.unwrap();

        assert_eq!(node.store.get("alice").unwrap(), Some("999".to_string()));
    }

    #[tokio::test]
    async fn test_delete_removes_contact() {
        let node = single_node();

        node.directory.add("alice", "111").await.unwrap();
        node.directory.delete("alice").unwrap();

        assert!(node.directory.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_same_shard_local_renames() {
        let node = single_node();
        let names = names_owned_by(&node.router, node.config.local(), 2);

        node.directory.add(&names[0], "111").await.unwrap();
        node.directory
            .edit(EditRequest {
                original_name: names[0].clone(),
                name: names[1].clone(),
                phone: "222".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(node.store.get(&names[0]).unwrap(), None);
        assert_eq!(node.store.get(&names[1]).unwrap(), Some("222".to_string()));
    }

    #[tokio::test]
    async fn test_edit_unchanged_name_updates_phone() {
        let node = single_node();
        let name = name_owned_by(&node.router, node.config.local());

        node.directory.add(&name, "111").await.unwrap();
        node.directory
            .edit(EditRequest {
                original_name: name.clone(),
                name: name.clone(),
                phone: "222".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(node.store.get(&name).unwrap(), Some("222".to_string()));
    }

    // ============================================================
    // DIRECTORY TESTS (fallback paths)
    // ============================================================

    #[tokio::test]
    async fn test_add_with_unreachable_primary_buffers_pending() {
        let (node, dead) = node_with_dead_peer();
        let name = name_owned_by(&node.router, &dead);

        // The client still sees success; the write is buffered.
        node.directory.add(&name, "111").await.unwrap();

        let records = node.pending.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].1.op,
            PendingOp::Add {
                name: name.clone(),
                phone: "111".to_string(),
            }
        );

        // The buffered write is keyed under the reserved prefix and never
        // shows up as a live contact.
        assert!(node
            .store
            .get(&format!("{PENDING_PREFIX}{name}"))
            .unwrap()
            .is_some());
        assert!(node.directory.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_with_unreachable_primary_buffers_pending() {
        let (node, dead) = node_with_dead_peer();
        let names = names_owned_by(&node.router, &dead, 2);

        node.directory
            .edit(EditRequest {
                original_name: names[0].clone(),
                name: names[1].clone(),
                phone: "222".to_string(),
            })
            .await
            .unwrap();

        let records = node.pending.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].1.op,
            PendingOp::Edit {
                original_name: names[0].clone(),
                name: names[1].clone(),
                phone: "222".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_edit_cross_shard_into_local_primary() {
        let (node, dead) = node_with_dead_peer();
        let remote_name = name_owned_by(&node.router, &dead);
        let local_name = name_owned_by(&node.router, node.config.local());

        // A stale replica of the old name sits on this node.
        node.store.put(&remote_name, "111").unwrap();

        node.directory
            .edit(EditRequest {
                original_name: remote_name.clone(),
                name: local_name.clone(),
                phone: "222".to_string(),
            })
            .await
            .unwrap();

        // Old name removed locally, new name live at its (local) primary.
        assert_eq!(node.store.get(&remote_name).unwrap(), None);
        assert_eq!(node.store.get(&local_name).unwrap(), Some("222".to_string()));

        // The delete leg to the unreachable old primary is buffered by the
        // broadcast fan-out.
        for _ in 0..100 {
            let buffered = node
                .pending
                .list()
                .unwrap()
                .iter()
                .any(|(_, r)| r.op == PendingOp::Delete { name: remote_name.clone() });
            if buffered {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Delete leg was not buffered");
    }

    // ============================================================
    // DIRECTORY TESTS (inbound replica paths)
    // ============================================================

    #[tokio::test]
    async fn test_apply_replica_stores_without_routing() {
        let (node, dead) = node_with_dead_peer();
        // A replica for a name this node does not own must still be
        // stored as-is.
        let name = name_owned_by(&node.router, &dead);

        node.directory
            .apply_replica(&Contact {
                name: name.clone(),
                phone: "111".to_string(),
            })
            .unwrap();

        assert_eq!(node.store.get(&name).unwrap(), Some("111".to_string()));
        assert!(node.pending.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_edit_replica_deletes_then_puts() {
        let node = single_node();
        node.store.put("alice", "111").unwrap();

        node.directory
            .apply_edit_replica(&EditRequest {
                original_name: "alice".to_string(),
                name: "alice2".to_string(),
                phone: "222".to_string(),
            })
            .unwrap();

        assert_eq!(node.store.get("alice").unwrap(), None);
        assert_eq!(node.store.get("alice2").unwrap(), Some("222".to_string()));
    }

    #[tokio::test]
    async fn test_delete_local_removes_only_locally() {
        let node = single_node();
        node.store.put("alice", "111").unwrap();

        node.directory.delete_local("alice").unwrap();

        assert_eq!(node.store.get("alice").unwrap(), None);
    }

    // ============================================================
    // HANDLER VALIDATION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_add_rejects_empty_name() {
        let node = single_node();

        let result = handle_add(
            Extension(node.directory.clone()),
            Form(AddForm {
                name: String::new(),
                phone: "111".to_string(),
            }),
        )
        .await;

        let (status, _) = result.err().unwrap();
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_rejects_reserved_prefix() {
        let node = single_node();

        let result = handle_add(
            Extension(node.directory.clone()),
            Form(AddForm {
                name: "pending_alice".to_string(),
                phone: "111".to_string(),
            }),
        )
        .await;

        let (status, _) = result.err().unwrap();
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert!(node.directory.list().unwrap().is_empty());
    }
}
