/*
    Circuit Builder - path selection and layering (sender side)

    Workflow for sending
    1. Fetch the directory listing through the transport
    2. Pick HOP_COUNT distinct relays with a partial Fisher-Yates shuffle; the order of
       the pick is the path
    3. Wrap innermost-out: the last hop's layer targets the destination user's port, every
       earlier layer targets the port of the hop after it
    4. POST the finished message to hop 0, exactly once

    Fewer than HOP_COUNT relays fails with InsufficientNodes before anything is forwarded.
    Per-hop keys only live inside `wrap_layer`.
*/

use super::errors::{OnionError, OnionResult};
use super::wire::{wrap_layer, LayeredMessage, HOP_COUNT};
use crate::core_crypto::import_public_key;
use crate::core_directory::{NodeId, NodeRecord, UserId};
use crate::core_router::{AddressSpace, Endpoint, Transport};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// An ordered path of distinct relays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    hops: Vec<NodeRecord>,
}

impl Circuit {
    /// Build a circuit from an explicit hop list
    pub fn new(hops: Vec<NodeRecord>) -> OnionResult<Self> {
        if hops.len() != HOP_COUNT {
            return Err(OnionError::InvalidCircuit(format!(
                "expected {} hops, got {}",
                HOP_COUNT,
                hops.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = hops.iter().find(|hop| !seen.insert(hop.node_id)) {
            return Err(OnionError::InvalidCircuit(format!(
                "relay {} appears twice",
                dup.node_id
            )));
        }

        Ok(Self { hops })
    }

    pub fn hops(&self) -> &[NodeRecord] {
        &self.hops
    }

    /// Relay identifiers in path order
    pub fn path(&self) -> Vec<NodeId> {
        self.hops.iter().map(|hop| hop.node_id).collect()
    }

    /// The relay that receives the message from the sender
    pub fn entry(&self) -> &NodeRecord {
        &self.hops[0]
    }
}

/// Choose HOP_COUNT distinct relays uniformly at random, order matters
pub fn select_path<R: Rng + ?Sized>(nodes: &[NodeRecord], rng: &mut R) -> OnionResult<Circuit> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<&NodeRecord> = nodes
        .iter()
        .filter(|node| seen.insert(node.node_id))
        .collect();

    if candidates.len() < HOP_COUNT {
        return Err(OnionError::InsufficientNodes {
            available: candidates.len(),
            required: HOP_COUNT,
        });
    }

    // Fisher-Yates, stopped after the first HOP_COUNT positions
    for i in 0..HOP_COUNT {
        let j = rng.random_range(i..candidates.len());
        candidates.swap(i, j);
    }

    Circuit::new(candidates[..HOP_COUNT].iter().map(|&node| node.clone()).collect())
}

/// Wrap `message` for `circuit`, ending at `destination`'s user endpoint
pub fn build_onion(
    circuit: &Circuit,
    message: &str,
    destination: UserId,
    addresses: &AddressSpace,
) -> OnionResult<LayeredMessage> {
    let mut payload = message.to_string();
    let mut next_hop = u64::from(addresses.user_port(destination)?);

    for hop in circuit.hops().iter().rev() {
        let hop_key = import_public_key(&hop.pub_key)?;
        payload = wrap_layer(&hop_key, next_hop, &payload)?;
        next_hop = u64::from(addresses.relay_port(hop.node_id)?);
    }

    Ok(LayeredMessage::new(payload))
}

/// Sender-side driver: directory lookup, layering and the first forward
pub struct CircuitBuilder {
    transport: Arc<dyn Transport>,
    addresses: AddressSpace,
}

impl CircuitBuilder {
    pub fn new(transport: Arc<dyn Transport>, addresses: AddressSpace) -> Self {
        Self { transport, addresses }
    }

    /// Send `message` to user `destination` over a fresh circuit
    ///
    /// Returns the circuit that carried the message. Single attempt: any failure
    /// is returned as is, nothing is retried.
    pub async fn send(&self, message: &str, destination: UserId) -> OnionResult<Circuit> {
        let nodes = self.transport.fetch_nodes().await?;
        debug!(available = nodes.len(), "Fetched node registry");

        // ThreadRng is not Send; keep it out of the await points below
        let circuit = {
            let mut rng = rand::rng();
            select_path(&nodes, &mut rng)?
        };
        info!(path = ?circuit.path(), destination, "Circuit selected");

        let onion = build_onion(&circuit, message, destination, &self.addresses)?;
        self.transport
            .forward(Endpoint::Relay(circuit.entry().node_id), onion.as_str())
            .await?;

        Ok(circuit)
    }
}
