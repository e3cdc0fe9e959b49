//! In-memory transport that records outbound calls

use crate::core_directory::NodeRecord;
use crate::core_router::{Endpoint, Transport, TransportError};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Serves a fixed node listing and records registrations and forwards
#[derive(Debug, Default)]
pub struct RecordingTransport {
    nodes: Vec<NodeRecord>,
    fail_forwards: bool,
    registered: Mutex<Vec<NodeRecord>>,
    forwarded: Mutex<Vec<(Endpoint, String)>>,
    forward_attempts: Mutex<usize>,
}

impl RecordingTransport {
    pub fn with_nodes(nodes: Vec<NodeRecord>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    /// Make every `forward` call fail as if the peer were down
    pub fn failing_forwards(mut self) -> Self {
        self.fail_forwards = true;
        self
    }

    /// Successful forwards, in call order
    pub async fn forwarded(&self) -> Vec<(Endpoint, String)> {
        self.forwarded.lock().await.clone()
    }

    /// Number of forward calls, including failed ones
    pub async fn forward_attempts(&self) -> usize {
        *self.forward_attempts.lock().await
    }

    pub async fn registered(&self) -> Vec<NodeRecord> {
        self.registered.lock().await.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>, TransportError> {
        Ok(self.nodes.clone())
    }

    async fn register_node(&self, record: &NodeRecord) -> Result<(), TransportError> {
        self.registered.lock().await.push(record.clone());
        Ok(())
    }

    async fn forward(&self, endpoint: Endpoint, message: &str) -> Result<(), TransportError> {
        *self.forward_attempts.lock().await += 1;
        if self.fail_forwards {
            return Err(TransportError::Unreachable(endpoint.to_string()));
        }
        self.forwarded.lock().await.push((endpoint, message.to_string()));
        Ok(())
    }
}
