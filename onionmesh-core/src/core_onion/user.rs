//! User node: final destination of a circuit and origin of new sends
//!
//! Receiving stores the plaintext. Sending delegates to [`CircuitBuilder`] and only
//! updates the snapshot once the entry relay accepted the message.

use super::circuit::CircuitBuilder;
use super::errors::{OnionError, OnionResult};
use crate::core_directory::{NodeId, UserId};
use crate::core_router::{AddressSpace, Transport};
use crate::metrics::{self, Timer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Diagnostic snapshot of a user's last exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub last_received_message: Option<String>,
    pub last_sent_message: Option<String>,
    pub last_circuit: Option<Vec<NodeId>>,
}

pub struct UserNode {
    user_id: UserId,
    addresses: AddressSpace,
    builder: CircuitBuilder,
    state: RwLock<UserState>,
}

impl UserNode {
    pub fn new(
        user_id: UserId,
        addresses: AddressSpace,
        transport: Arc<dyn Transport>,
    ) -> OnionResult<Self> {
        addresses.user_port(user_id)?;

        Ok(Self {
            user_id,
            addresses,
            builder: CircuitBuilder::new(transport, addresses),
            state: RwLock::new(UserState::default()),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Accept plaintext handed over by the exit relay
    pub async fn receive(&self, message: String) {
        info!(user_id = self.user_id, bytes = message.len(), "Message delivered");
        self.state.write().await.last_received_message = Some(message);
    }

    /// Send `message` to `destination` over a fresh 3-hop circuit
    pub async fn send(&self, message: &str, destination: UserId) -> OnionResult<Vec<NodeId>> {
        if message.is_empty() {
            return Err(OnionError::InvalidInput("message must not be empty".to_string()));
        }
        // Unroutable destinations never reach the directory
        self.addresses
            .user_port(destination)
            .map_err(|err| OnionError::InvalidInput(err.to_string()))?;

        let timer = Timer::new(metrics::SEND_DURATION_MS);
        let result = self.builder.send(message, destination).await;
        timer.stop();

        let circuit = match result {
            Ok(circuit) => circuit,
            Err(err) => {
                warn!(user_id = self.user_id, destination, error = %err, "Send failed");
                metrics::record_send(Some(err.kind()));
                return Err(err);
            }
        };
        metrics::record_send(None);

        let path = circuit.path();
        let mut state = self.state.write().await;
        state.last_sent_message = Some(message.to_string());
        state.last_circuit = Some(path.clone());

        info!(user_id = self.user_id, destination, ?path, "Message sent");
        Ok(path)
    }

    pub async fn state(&self) -> UserState {
        self.state.read().await.clone()
    }
}

impl std::fmt::Debug for UserNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserNode")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_router::Endpoint;
    use crate::test_utils::{record_for, RecordingTransport};

    fn three_relays() -> Vec<crate::core_directory::NodeRecord> {
        vec![record_for(1), record_for(2), record_for(3)]
    }

    #[tokio::test]
    async fn test_receive_records_plaintext() {
        let transport = Arc::new(RecordingTransport::default());
        let user = UserNode::new(7, AddressSpace::default(), transport).unwrap();

        user.receive("hello".to_string()).await;
        user.receive("again".to_string()).await;

        assert_eq!(user.state().await.last_received_message.as_deref(), Some("again"));
    }

    #[tokio::test]
    async fn test_send_records_message_and_path() {
        let transport = Arc::new(RecordingTransport::with_nodes(three_relays()));
        let user = UserNode::new(0, AddressSpace::default(), transport.clone()).unwrap();

        let path = user.send("hello", 7).await.unwrap();

        let state = user.state().await;
        assert_eq!(state.last_sent_message.as_deref(), Some("hello"));
        assert_eq!(state.last_circuit, Some(path.clone()));
        assert_eq!(transport.forwarded().await[0].0, Endpoint::Relay(path[0]));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let transport = Arc::new(RecordingTransport::with_nodes(three_relays()));
        let user = UserNode::new(0, AddressSpace::default(), transport.clone()).unwrap();

        let err = user.send("", 7).await.unwrap_err();

        assert!(matches!(err, OnionError::InvalidInput(_)));
        assert_eq!(transport.forward_attempts().await, 0);
    }

    #[tokio::test]
    async fn test_unroutable_destination_is_invalid_input() {
        let transport = Arc::new(RecordingTransport::with_nodes(three_relays()));
        let user = UserNode::new(0, AddressSpace::default(), transport.clone()).unwrap();

        let err = user.send("hello", 70_000).await.unwrap_err();

        assert!(matches!(err, OnionError::InvalidInput(_)));
        assert_eq!(transport.forward_attempts().await, 0);
        assert_eq!(user.state().await, UserState::default());
    }

    #[tokio::test]
    async fn test_failed_send_leaves_state_untouched() {
        let transport = Arc::new(
            RecordingTransport::with_nodes(three_relays()).failing_forwards(),
        );
        let user = UserNode::new(0, AddressSpace::default(), transport).unwrap();

        assert!(user.send("hello", 7).await.is_err());
        assert_eq!(user.state().await, UserState::default());
    }

    #[tokio::test]
    async fn test_user_outside_port_range_is_rejected() {
        let transport = Arc::new(RecordingTransport::default());
        let result = UserNode::new(70_000, AddressSpace::default(), transport);

        assert!(matches!(result, Err(OnionError::Address(_))));
    }
}
