//! onionmesh: a minimal onion-routing overlay
//!
//! A sender wraps a message in three layers, one per relay; each relay peels its
//! layer and forwards the rest, and the last one hands the plaintext to the
//! destination user. Directory, relays and users talk JSON over HTTP.

pub mod config;
pub mod core_crypto;
pub mod core_directory;
pub mod core_http;
pub mod core_onion;
pub mod core_router;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod shutdown;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Config, ConfigError};
pub use core_directory::{Directory, NodeId, NodeRecord, UserId};
pub use core_onion::{OnionError, RelayNode, UserNode};
pub use logging::{init_logging, LogLevel};
pub use network::Network;
