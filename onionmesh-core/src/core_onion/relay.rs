/*
    Relay - peel one layer, then forward or terminate

    Per request:  Idle -> Received -> Peeled -> { Terminal | Forwarding } -> Idle

    1. Split the message at ASYMMETRIC_ENVELOPE_LEN and recover the hop key with the
       relay's private key
    2. Decrypt the symmetric envelope (empty envelope means already final)
    3. Read the 10-digit routing prefix; shorter plaintext is terminal
    4. Record the diagnostic snapshot
    5. Terminal: report delivery. Otherwise resolve the prefix to a relay or user and
       forward the remainder exactly once

    The snapshot is the only state shared between requests and is last-write-wins.
*/

use super::errors::{OnionError, OnionResult};
use super::wire::peel_layer;
use crate::core_crypto::RelayKeyPair;
use crate::core_directory::{NodeId, NodeRecord};
use crate::core_router::{AddressSpace, Endpoint, Transport};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Diagnostic snapshot of the most recently peeled message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayState {
    pub last_encrypted_message: Option<String>,
    pub last_decrypted_message: Option<String>,
    pub last_forward_destination: Option<u64>,
}

/// What a relay did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// This hop was terminal; `plaintext` is the final remainder
    Delivered { plaintext: String },
    /// The remainder was handed to the next hop
    Forwarded { endpoint: Endpoint },
}

/// One relay: its key pair, its snapshot, and a way to reach the next hop
pub struct RelayNode {
    node_id: NodeId,
    keys: RelayKeyPair,
    public_key: String,
    addresses: AddressSpace,
    transport: Arc<dyn Transport>,
    state: RwLock<RelayState>,
}

impl RelayNode {
    /// Create a relay with an existing key pair
    pub fn new(
        node_id: NodeId,
        keys: RelayKeyPair,
        addresses: AddressSpace,
        transport: Arc<dyn Transport>,
    ) -> OnionResult<Self> {
        // Reject identifiers that would collide with the user range
        addresses.relay_port(node_id)?;
        let public_key = keys.export_public_key()?;

        Ok(Self {
            node_id,
            keys,
            public_key,
            addresses,
            transport,
            state: RwLock::new(RelayState::default()),
        })
    }

    /// Create a relay with a freshly generated key pair
    pub fn generate(
        node_id: NodeId,
        addresses: AddressSpace,
        transport: Arc<dyn Transport>,
    ) -> OnionResult<Self> {
        Self::new(node_id, RelayKeyPair::generate()?, addresses, transport)
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn keys(&self) -> &RelayKeyPair {
        &self.keys
    }

    /// The directory entry this relay publishes
    pub fn record(&self) -> NodeRecord {
        NodeRecord::new(self.node_id, self.public_key.clone())
    }

    /// Publish this relay's public key to the directory
    pub async fn register(&self) -> OnionResult<()> {
        self.transport.register_node(&self.record()).await?;
        info!(node_id = self.node_id, "Relay registered with directory");
        Ok(())
    }

    /// Peel one layer of `message` and forward or terminate
    pub async fn handle_message(&self, message: &str) -> OnionResult<RelayOutcome> {
        let result = self.peel_and_route(message).await;
        match &result {
            Ok(RelayOutcome::Delivered { .. }) => metrics::record_relay_outcome("delivered"),
            Ok(RelayOutcome::Forwarded { .. }) => metrics::record_relay_outcome("forwarded"),
            Err(err) => {
                warn!(node_id = self.node_id, error = %err, "Failed to process message");
                metrics::record_relay_outcome(err.kind());
            }
        }
        result
    }

    async fn peel_and_route(&self, message: &str) -> OnionResult<RelayOutcome> {
        debug!(node_id = self.node_id, bytes = message.len(), "Message received, peeling");
        let peeled = peel_layer(&self.keys, message)?;

        {
            let mut state = self.state.write().await;
            state.last_encrypted_message = Some(message.to_string());
            state.last_decrypted_message = Some(peeled.remainder.clone());
            state.last_forward_destination = peeled.next_hop;
        }

        let Some(next_hop) = peeled.next_hop else {
            info!(node_id = self.node_id, "Terminal hop reached");
            return Ok(RelayOutcome::Delivered {
                plaintext: peeled.remainder,
            });
        };

        let endpoint = self.addresses.resolve(next_hop)?;
        info!(node_id = self.node_id, %endpoint, "Forwarding peeled message");
        self.transport
            .forward(endpoint, &peeled.remainder)
            .await
            .map_err(OnionError::from)?;

        Ok(RelayOutcome::Forwarded { endpoint })
    }

    /// Copy of the diagnostic snapshot
    pub async fn state(&self) -> RelayState {
        self.state.read().await.clone()
    }
}

impl std::fmt::Debug for RelayNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayNode")
            .field("node_id", &self.node_id)
            .field("addresses", &self.addresses)
            .finish_non_exhaustive()
    }
}
