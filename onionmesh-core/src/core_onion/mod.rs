//! Onion layering protocol: wire format, sender-side circuit building and
//! relay-side peeling.

pub mod circuit;
pub mod errors;
pub mod relay;
pub mod user;
pub mod wire;

pub use circuit::{build_onion, select_path, Circuit, CircuitBuilder};
pub use errors::{OnionError, OnionResult};
pub use relay::{RelayNode, RelayOutcome, RelayState};
pub use user::{UserNode, UserState};
pub use wire::{
    peel_layer, wrap_layer, LayeredMessage, PeeledLayer, ASYMMETRIC_ENVELOPE_LEN, HOP_COUNT,
    ROUTING_PREFIX_LEN,
};
