use super::protocol::{Contact, EditRequest};
use super::replicator::Replicator;
use crate::cluster::router::ShardRouter;
use crate::cluster::types::ClusterConfig;
use crate::storage::pending::{now_ms, PendingOp, PendingQueue, PendingRecord};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

const RECONCILE_INTERVAL: Duration = Duration::from_secs(10);

/// Background drain of the pending-write queue.
///
/// Exactly one reconciler task runs per node, started at process
/// initialization and living until process exit. Each cycle walks the
/// queue sequentially: entries are resubmitted to their primary once it
/// answers the liveness probe, deferred with backoff when it does not, and
/// quarantined after the attempt budget.
pub struct Reconciler {
    config: Arc<ClusterConfig>,
    router: ShardRouter,
    pending: Arc<PendingQueue>,
    replicator: Arc<Replicator>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        config: Arc<ClusterConfig>,
        router: ShardRouter,
        pending: Arc<PendingQueue>,
        replicator: Arc<Replicator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            router,
            pending,
            replicator,
            interval: RECONCILE_INTERVAL,
        })
    }

    /// Spawns the reconciliation loop and returns immediately.
    pub fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting reconciler (cycle every {:?})",
            self.interval
        );
        tokio::spawn(async move {
            self.run_loop().await;
        });
    }

    async fn run_loop(&self) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.drain_cycle().await {
                tracing::warn!("Reconcile cycle failed: {}", e);
            }
        }
    }

    /// One pass over the pending queue. Public so tests can drive cycles
    /// directly without waiting on the interval.
    pub async fn drain_cycle(&self) -> Result<()> {
        for (name, record) in self.pending.list()? {
            if record.not_before_ms > now_ms() {
                continue;
            }

            let primary = self.router.primary(record.op.routing_name());

            // An entry whose primary is this node cannot be forwarded
            // anywhere; leave it in place for inspection.
            if self.config.is_local(&primary) {
                tracing::warn!(
                    "Pending entry '{}' is owned by this node, leaving it in place",
                    name
                );
                continue;
            }

            if !self.replicator.probe(&primary).await {
                self.pending.record_failure(&name, &record)?;
                continue;
            }

            match self.resubmit(&record).await {
                Ok(()) => {
                    self.pending.resolve(&name)?;
                    tracing::info!("Resubmitted pending entry '{}' to {}", name, primary);
                }
                Err(e) => {
                    tracing::warn!(
                        "Resubmission of '{}' to {} failed: {}",
                        name,
                        primary,
                        e
                    );
                    self.pending.record_failure(&name, &record)?;
                }
            }
        }
        Ok(())
    }

    async fn resubmit(&self, record: &PendingRecord) -> Result<()> {
        let primary = self.router.primary(record.op.routing_name());

        match &record.op {
            PendingOp::Add { name, phone } => {
                let contact = Contact {
                    name: name.clone(),
                    phone: phone.clone(),
                };
                self.replicator.forward_add(&primary, &contact).await
            }
            PendingOp::Delete { name } => self.replicator.delete_remote(&primary, name).await,
            PendingOp::Edit {
                original_name,
                name,
                phone,
            } => {
                let edit = EditRequest {
                    original_name: original_name.clone(),
                    name: name.clone(),
                    phone: phone.clone(),
                };
                self.replicator.forward_edit(&primary, &edit).await
            }
        }
    }
}
