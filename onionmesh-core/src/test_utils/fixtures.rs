//! Test fixtures for relay keys and directory records

use crate::core_crypto::RelayKeyPair;
use crate::core_directory::{NodeId, NodeRecord};
use crate::core_onion::RelayNode;
use crate::core_router::{AddressSpace, Transport};
use std::sync::{Arc, OnceLock};

/// Number of distinct key pairs available to tests
pub const SHARED_KEY_COUNT: usize = 6;

static SHARED_KEYS: OnceLock<Vec<RelayKeyPair>> = OnceLock::new();

/// Key pair `index` from a process-wide pool
///
/// Panics if `index >= SHARED_KEY_COUNT`.
pub fn shared_keys(index: NodeId) -> &'static RelayKeyPair {
    let keys = SHARED_KEYS.get_or_init(|| {
        (0..SHARED_KEY_COUNT)
            .map(|_| RelayKeyPair::generate().expect("key generation"))
            .collect()
    });
    &keys[index as usize]
}

/// Directory record for relay `node_id`, backed by `shared_keys(node_id)`
pub fn record_for(node_id: NodeId) -> NodeRecord {
    let pub_key = shared_keys(node_id)
        .export_public_key()
        .expect("public key export");
    NodeRecord::new(node_id, pub_key)
}

/// Relay `node_id` on the default address space using the shared key pool
pub fn relay_with_shared_keys(node_id: NodeId, transport: Arc<dyn Transport>) -> RelayNode {
    RelayNode::new(
        node_id,
        shared_keys(node_id).clone(),
        AddressSpace::default(),
        transport,
    )
    .expect("relay construction")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_keys_are_stable_and_distinct() {
        assert_eq!(record_for(1), record_for(1));
        assert_ne!(record_for(1).pub_key, record_for(2).pub_key);
    }
}
