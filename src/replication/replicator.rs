use super::protocol::{
    Contact, EditRequest, ENDPOINT_ADD, ENDPOINT_DELETE_REMOTE, ENDPOINT_EDIT, ENDPOINT_PING,
    ENDPOINT_REPLICATE, ENDPOINT_REPLICATE_EDIT,
};
use crate::cluster::router::ShardRouter;
use crate::cluster::types::{ClusterConfig, NodeAddr};
use crate::storage::pending::{PendingOp, PendingQueue};

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Bound on forwarded writes and edits (blocks the originating request).
const FORWARD_TIMEOUT: Duration = Duration::from_secs(3);
/// Bound on background replication pushes.
const REPLICATE_TIMEOUT: Duration = Duration::from_secs(3);
/// Bound on delete deliveries and liveness probes.
const SHORT_TIMEOUT: Duration = Duration::from_secs(2);
/// Concurrent in-flight fan-out requests per node.
const MAX_FAN_OUT: usize = 8;

/// Inter-node delivery for the contact directory.
///
/// Forwards are synchronous and report failure to the caller; fan-out
/// (replication pushes, delete broadcasts) is fire-and-forget: one task
/// per peer, gated by a semaphore, outcome logged and never retried.
/// Replication failures are deliberately not buffered in the pending
/// queue; backups may silently miss updates.
pub struct Replicator {
    config: Arc<ClusterConfig>,
    router: ShardRouter,
    pending: Arc<PendingQueue>,
    client: reqwest::Client,
    fan_out: Arc<Semaphore>,
}

impl Replicator {
    pub fn new(
        config: Arc<ClusterConfig>,
        router: ShardRouter,
        pending: Arc<PendingQueue>,
    ) -> Self {
        Self {
            config,
            router,
            pending,
            client: reqwest::Client::new(),
            fan_out: Arc::new(Semaphore::new(MAX_FAN_OUT)),
        }
    }

    /// Forwards an add to the name's primary. Blocks until response or
    /// timeout; the caller decides whether to buffer on failure.
    pub async fn forward_add(&self, node: &NodeAddr, contact: &Contact) -> Result<()> {
        post_form(
            &self.client,
            &node.url(ENDPOINT_ADD),
            &[("name", &contact.name), ("phone", &contact.phone)],
            FORWARD_TIMEOUT,
        )
        .await
    }

    /// Forwards a whole edit intent to the shard's primary.
    pub async fn forward_edit(&self, node: &NodeAddr, edit: &EditRequest) -> Result<()> {
        post_form(
            &self.client,
            &node.url(ENDPOINT_EDIT),
            &[
                ("original_name", &edit.original_name),
                ("name", &edit.name),
                ("phone", &edit.phone),
            ],
            FORWARD_TIMEOUT,
        )
        .await
    }

    /// Delivers a delete to a single peer.
    pub async fn delete_remote(&self, node: &NodeAddr, name: &str) -> Result<()> {
        post_form(
            &self.client,
            &node.url(ENDPOINT_DELETE_REMOTE),
            &[("name", name)],
            SHORT_TIMEOUT,
        )
        .await
    }

    /// A node is alive iff its ping endpoint answers with a success status
    /// within the short timeout. Any network error, timeout or non-success
    /// status counts as not alive.
    pub async fn probe(&self, node: &NodeAddr) -> bool {
        let response = self
            .client
            .get(node.url(ENDPOINT_PING))
            .timeout(SHORT_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Pushes a committed contact to the given backups. Returns after
    /// dispatch; delivery is at-most-once and failures are only logged.
    pub fn replicate_contact(&self, backups: &[NodeAddr], contact: &Contact) {
        for backup in backups {
            self.spawn_push(backup.clone(), ENDPOINT_REPLICATE, contact.clone());
        }
    }

    /// Pushes a committed edit intent (delete + put) to the given backups.
    pub fn replicate_edit(&self, backups: &[NodeAddr], edit: &EditRequest) {
        for backup in backups {
            self.spawn_push(backup.clone(), ENDPOINT_REPLICATE_EDIT, edit.clone());
        }
    }

    /// Broadcasts a delete to every other cluster member. Deletes are not
    /// shard-routed: every node may hold a copy. A failed delivery to the
    /// name's primary is buffered for reconciliation; failures to other
    /// peers are logged only, matching the replication consistency
    /// contract.
    pub fn broadcast_delete(&self, name: &str) {
        let primary = self.router.primary(name);

        for peer in self.config.peers() {
            let client = self.client.clone();
            let fan_out = self.fan_out.clone();
            let pending = self.pending.clone();
            let peer = peer.clone();
            let is_primary = peer == primary;
            let name = name.to_string();

            tokio::spawn(async move {
                let _permit = match fan_out.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let url = peer.url(ENDPOINT_DELETE_REMOTE);
                match post_form(&client, &url, &[("name", &name)], SHORT_TIMEOUT).await {
                    Ok(()) => {
                        tracing::debug!("Delivered delete of '{}' to {}", name, peer);
                    }
                    Err(e) if is_primary => {
                        tracing::warn!(
                            "Delete of '{}' did not reach its primary {}, buffering: {}",
                            name,
                            peer,
                            e
                        );
                        if let Err(e) = pending.enqueue(PendingOp::Delete { name }) {
                            tracing::error!("Failed to buffer delete: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deliver delete of '{}' to {}: {}", name, peer, e);
                    }
                }
            });
        }
    }

    fn spawn_push<T>(&self, backup: NodeAddr, endpoint: &'static str, payload: T)
    where
        T: Serialize + Send + 'static,
    {
        let client = self.client.clone();
        let fan_out = self.fan_out.clone();

        tokio::spawn(async move {
            let _permit = match fan_out.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let response = client
                .post(backup.url(endpoint))
                .json(&payload)
                .timeout(REPLICATE_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!("Replicated to {}", backup);
                }
                Ok(resp) => {
                    tracing::warn!("Replication to {} rejected: {}", backup, resp.status());
                }
                Err(e) => {
                    tracing::warn!("Replication to {} failed: {}", backup, e);
                }
            }
        });
    }
}

async fn post_form(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
    timeout: Duration,
) -> Result<()> {
    let response = client.post(url).form(params).timeout(timeout).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("{} answered {}", url, response.status());
    }
    Ok(())
}
