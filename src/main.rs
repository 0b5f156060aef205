use contact_cluster::cluster::router::ShardRouter;
use contact_cluster::cluster::types::ClusterConfig;
use contact_cluster::ops::directory::Directory;
use contact_cluster::ops::handlers;
use contact_cluster::replication::reconciler::Reconciler;
use contact_cluster::replication::replicator::Replicator;
use contact_cluster::storage::pending::PendingQueue;
use contact_cluster::storage::store::ContactStore;

use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match ClusterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            eprintln!("Usage: PORT=<port> NODES=<url,url,...> contact-cluster");
            eprintln!(
                "Example: PORT=8001 NODES=http://localhost:8001,http://localhost:8002 contact-cluster"
            );
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting node {} ({} cluster members)",
        config.local(),
        config.nodes().len()
    );

    // 1. Local storage, isolated per node by the port-derived path:
    std::fs::create_dir_all("data")?;
    let store = Arc::new(ContactStore::open(config.storage_path())?);

    // 2. Protocol components:
    let router = ShardRouter::new(config.clone());
    let pending = Arc::new(PendingQueue::new(store.clone()));
    let replicator = Arc::new(Replicator::new(
        config.clone(),
        router.clone(),
        pending.clone(),
    ));
    let directory = Arc::new(Directory::new(
        config.clone(),
        router.clone(),
        store,
        pending.clone(),
        replicator.clone(),
    ));

    // 3. Reconciler, one background task for the node's lifetime:
    Reconciler::new(config.clone(), router, pending, replicator).start();

    // 4. HTTP server:
    let app = handlers::app(directory);
    let listen_addr = SocketAddr::from(([0, 0, 0, 0], config.port()));

    tracing::info!("HTTP server listening on {}", listen_addr);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
