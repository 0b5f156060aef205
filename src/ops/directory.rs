use super::edit::EditRoute;
use crate::cluster::router::ShardRouter;
use crate::cluster::types::ClusterConfig;
use crate::replication::protocol::{Contact, EditRequest};
use crate::replication::replicator::Replicator;
use crate::storage::pending::{PendingOp, PendingQueue};
use crate::storage::store::{ContactStore, StoreError};

use anyhow::Result;
use std::sync::Arc;

/// Per-operation orchestration over the cluster.
///
/// Plays the role of a smart client: callers issue plain add/delete/edit
/// calls and the directory handles routing (local write vs synchronous
/// forward), replication fan-out, and the pending-queue fallback. Every
/// dependency is injected at construction; the directory holds no state of
/// its own beyond those handles.
pub struct Directory {
    config: Arc<ClusterConfig>,
    router: ShardRouter,
    store: Arc<ContactStore>,
    pending: Arc<PendingQueue>,
    replicator: Arc<Replicator>,
}

impl Directory {
    pub fn new(
        config: Arc<ClusterConfig>,
        router: ShardRouter,
        store: Arc<ContactStore>,
        pending: Arc<PendingQueue>,
        replicator: Arc<Replicator>,
    ) -> Self {
        Self {
            config,
            router,
            store,
            pending,
            replicator,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Stores a contact at its primary.
    ///
    /// Local primary: write, then fan replication out to the backups.
    /// Remote primary: forward synchronously; if the forward fails the
    /// write is buffered locally and the operation still succeeds. The
    /// fallback is invisible to the client.
    pub async fn add(&self, name: &str, phone: &str) -> Result<()> {
        let primary = self.router.primary(name);
        let contact = Contact {
            name: name.to_string(),
            phone: phone.to_string(),
        };

        if self.config.is_local(&primary) {
            self.store.put(name, phone)?;
            self.replicator
                .replicate_contact(&self.router.backups(&primary), &contact);
            return Ok(());
        }

        if let Err(e) = self.replicator.forward_add(&primary, &contact).await {
            tracing::warn!(
                "Primary {} unreachable for add '{}', buffering locally: {}",
                primary,
                name,
                e
            );
            self.pending.enqueue(PendingOp::Add {
                name: contact.name,
                phone: contact.phone,
            })?;
        }
        Ok(())
    }

    /// Deletes a contact everywhere: locally first, then broadcast to the
    /// whole membership. Deletes are not shard-routed because any node may
    /// hold a replicated copy.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.store.delete(name)?;
        self.replicator.broadcast_delete(name);
        Ok(())
    }

    /// Applies an edit according to its routing classification.
    pub async fn edit(&self, edit: EditRequest) -> Result<()> {
        match EditRoute::classify(&self.router, &self.config, &edit.original_name, &edit.name) {
            EditRoute::SameShardLocal { primary } => {
                // The old record goes first, also when the name is
                // unchanged: the put below rewrites it either way.
                self.store.delete(&edit.original_name)?;
                self.store.put(&edit.name, &edit.phone)?;
                self.replicator
                    .replicate_edit(&self.router.backups(&primary), &edit);
            }
            EditRoute::SameShardRemote { primary } => {
                if let Err(e) = self.replicator.forward_edit(&primary, &edit).await {
                    tracing::warn!(
                        "Primary {} unreachable for edit '{}', buffering locally: {}",
                        primary,
                        edit.original_name,
                        e
                    );
                    self.pending.enqueue(PendingOp::Edit {
                        original_name: edit.original_name,
                        name: edit.name,
                        phone: edit.phone,
                    })?;
                }
            }
            EditRoute::CrossShard { .. } => {
                // Decoupled legs: the old name is deleted exactly like a
                // standalone delete, the new name is added exactly like a
                // standalone add (including its pending fallback).
                self.delete(&edit.original_name)?;
                self.add(&edit.name, &edit.phone).await?;
            }
        }
        Ok(())
    }

    /// Live contacts on this node, pending and quarantined entries
    /// excluded.
    pub fn list(&self) -> Result<Vec<Contact>, StoreError> {
        Ok(self
            .store
            .list_contacts()?
            .into_iter()
            .map(|(name, phone)| Contact { name, phone })
            .collect())
    }

    /// Inbound replication push: apply locally, never re-propagate.
    pub fn apply_replica(&self, contact: &Contact) -> Result<(), StoreError> {
        self.store.put(&contact.name, &contact.phone)
    }

    /// Inbound replicated edit: delete-then-put locally, never
    /// re-propagate.
    pub fn apply_edit_replica(&self, edit: &EditRequest) -> Result<(), StoreError> {
        self.store.delete(&edit.original_name)?;
        self.store.put(&edit.name, &edit.phone)
    }

    /// Inbound broadcast delete: local removal only.
    pub fn delete_local(&self, name: &str) -> Result<(), StoreError> {
        self.store.delete(name)
    }
}
