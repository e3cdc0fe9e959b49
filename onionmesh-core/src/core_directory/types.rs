//! Directory data types

use serde::{Deserialize, Serialize};

/// Relay identifier as registered in the directory
pub type NodeId = u32;

/// User (destination / sender) identifier
pub type UserId = u32;

/// A registered relay: identifier plus base64(SPKI DER) public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub pub_key: String,
}

impl NodeRecord {
    pub fn new(node_id: NodeId, pub_key: impl Into<String>) -> Self {
        Self {
            node_id,
            pub_key: pub_key.into(),
        }
    }
}
