//! Request/Response bodies shared by the node servers and the HTTP transport
//!
//! Request fields are optional so that a missing field surfaces as a 400 from
//! the handler instead of a generic extractor rejection.

use crate::core_directory::{NodeId, NodeRecord, UserId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Directory Types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeRequest {
    pub node_id: Option<NodeId>,
    pub pub_key: Option<String>,
}

impl From<&NodeRecord> for RegisterNodeRequest {
    fn from(record: &NodeRecord) -> Self {
        Self {
            node_id: Some(record.node_id),
            pub_key: Some(record.pub_key.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterNodeResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRegistryResponse {
    pub nodes: Vec<NodeRecord>,
}

// ============================================================================
// Message Types
// ============================================================================

/// Body of every `/message` call, relay or user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: Option<String>,
}

impl MessageRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    /// Final plaintext, only set when a relay turned out to be the terminal hop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: Option<String>,
    pub destination_user_id: Option<UserId>,
}

// ============================================================================
// Diagnostic Types
// ============================================================================

/// Wrapper for every diagnostic snapshot read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse<T> {
    pub result: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
