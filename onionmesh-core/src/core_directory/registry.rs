/*
    Directory - in-memory relay registry

    Holds the {nodeId, pubKey} pairs published by relays at startup and serves the full
    listing to senders building circuits.

    Invariants:
    - identifiers are unique; a second registration for the same id is rejected
    - a rejected registration never mutates the list
    - the duplicate check and the insert happen under one write lock, so concurrent
      registrations of the same id cannot both succeed
*/

use super::types::{NodeId, NodeRecord};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Errors returned by directory registration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Missing or malformed registration fields
    #[error("Invalid registration: {0}")]
    InvalidInput(String),

    /// The identifier is already registered
    #[error("Node {0} is already registered")]
    DuplicateRegistration(NodeId),
}

impl DirectoryError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DirectoryError::InvalidInput(_) => "invalid_input",
            DirectoryError::DuplicateRegistration(_) => "duplicate_registration",
        }
    }
}

/// Relay directory shared by every request handler of one directory node
#[derive(Debug, Default)]
pub struct Directory {
    nodes: RwLock<Vec<NodeRecord>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relay's public key under its identifier
    pub async fn register(&self, node_id: NodeId, pub_key: String) -> Result<(), DirectoryError> {
        if pub_key.trim().is_empty() {
            return Err(DirectoryError::InvalidInput("public key is empty".to_string()));
        }

        let mut nodes = self.nodes.write().await;
        if nodes.iter().any(|node| node.node_id == node_id) {
            debug!(node_id, "Rejected duplicate registration");
            return Err(DirectoryError::DuplicateRegistration(node_id));
        }

        nodes.push(NodeRecord { node_id, pub_key });
        info!(node_id, registered = nodes.len(), "Node registered");
        Ok(())
    }

    /// Full snapshot of registered relays, in registration order
    pub async fn list_nodes(&self) -> Vec<NodeRecord> {
        self.nodes.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}
