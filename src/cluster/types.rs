use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Base URL of a cluster member, e.g. `http://localhost:8001`.
///
/// Addresses are compared as plain strings, so every node must list the
/// cluster with the exact same spelling. Whitespace and trailing slashes
/// are stripped at parse time to keep comparisons reliable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeAddr(String);

impl NodeAddr {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full URL for an endpoint path on this node.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable cluster topology, constructed once at startup and passed by
/// reference into every component. No component reads ambient global state.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    nodes: Vec<NodeAddr>,
    local: NodeAddr,
    port: u16,
}

impl ClusterConfig {
    /// Builds and validates a configuration.
    ///
    /// The node list must be non-empty, contain no blank entries, and
    /// include the local address: sharding arithmetic is over the full
    /// list, so a node absent from its own list could never be a primary.
    pub fn new(nodes: Vec<NodeAddr>, local: NodeAddr, port: u16) -> Result<Self> {
        if nodes.is_empty() {
            bail!("cluster node list is empty");
        }
        if nodes.iter().any(|n| n.as_str().is_empty()) {
            bail!("cluster node list contains an empty address");
        }
        if !nodes.contains(&local) {
            bail!("local address {} is not in the cluster node list", local);
        }
        Ok(Self { nodes, local, port })
    }

    /// Reads `PORT` and `NODES` from the environment.
    pub fn from_env() -> Result<Arc<Self>> {
        let port = std::env::var("PORT").context("PORT is not set")?;
        let nodes = std::env::var("NODES").context("NODES is not set")?;
        Ok(Arc::new(Self::from_parts(&port, &nodes)?))
    }

    /// Parses the raw `PORT` / `NODES` values. Split out from `from_env`
    /// so configuration parsing is testable without touching the process
    /// environment.
    pub fn from_parts(port: &str, nodes: &str) -> Result<Self> {
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT value: {port:?}"))?;
        let local = NodeAddr::new(&format!("http://localhost:{port}"));
        let nodes: Vec<NodeAddr> = nodes
            .split(',')
            .map(NodeAddr::new)
            .filter(|n| !n.as_str().is_empty())
            .collect();
        Self::new(nodes, local, port)
    }

    pub fn nodes(&self) -> &[NodeAddr] {
        &self.nodes
    }

    pub fn local(&self) -> &NodeAddr {
        &self.local
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self, node: &NodeAddr) -> bool {
        node == &self.local
    }

    /// All members except this node.
    pub fn peers(&self) -> impl Iterator<Item = &NodeAddr> {
        self.nodes.iter().filter(|n| **n != self.local)
    }

    /// Storage location for this node, namespaced by port so that several
    /// nodes can share a working directory during local runs.
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from("data").join(format!("db-{}.redb", self.port))
    }
}
