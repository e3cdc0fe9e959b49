/*
    Addressing - port-based address space shared by every participant

    Every node listens on `base + identifier`:
      - directory on `registry_port`
      - relay n on `base_relay_port + n`
      - user u on `base_user_port + u`

    The routing prefix inside an onion layer carries the next hop's port. A relay decides
    whether it forwards to another relay or hands the plaintext to a user purely by
    comparing that port against `base_user_port`.
*/

use crate::core_directory::{NodeId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when mapping between identifiers and ports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The address is not inside the relay or user range
    #[error("Unknown address: {0}")]
    UnknownAddress(u64),

    /// The identifier does not fit in its port range
    #[error("{kind} {id} is outside the addressable range")]
    OutOfRange { kind: &'static str, id: u32 },
}

/// A resolved hop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Relay(NodeId),
    User(UserId),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Relay(id) => write!(f, "relay {}", id),
            Endpoint::User(id) => write!(f, "user {}", id),
        }
    }
}

/// Port layout of one simulated network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpace {
    pub registry_port: u16,
    pub base_relay_port: u16,
    pub base_user_port: u16,
}

impl AddressSpace {
    pub fn new(registry_port: u16, base_relay_port: u16, base_user_port: u16) -> Self {
        Self {
            registry_port,
            base_relay_port,
            base_user_port,
        }
    }

    /// Number of relay identifiers that fit below the user range
    pub fn relay_capacity(&self) -> u32 {
        u32::from(self.base_user_port.saturating_sub(self.base_relay_port))
    }

    pub fn relay_port(&self, node_id: NodeId) -> Result<u16, AddressError> {
        if node_id >= self.relay_capacity() {
            return Err(AddressError::OutOfRange { kind: "relay", id: node_id });
        }
        // Bounded by base_user_port, cannot overflow
        Ok(self.base_relay_port + node_id as u16)
    }

    pub fn user_port(&self, user_id: UserId) -> Result<u16, AddressError> {
        u32::from(self.base_user_port)
            .checked_add(user_id)
            .and_then(|port| u16::try_from(port).ok())
            .ok_or(AddressError::OutOfRange { kind: "user", id: user_id })
    }

    pub fn port_of(&self, endpoint: Endpoint) -> Result<u16, AddressError> {
        match endpoint {
            Endpoint::Relay(id) => self.relay_port(id),
            Endpoint::User(id) => self.user_port(id),
        }
    }

    /// Map a routing address (a port) back to the participant listening on it
    pub fn resolve(&self, address: u64) -> Result<Endpoint, AddressError> {
        let port = u16::try_from(address).map_err(|_| AddressError::UnknownAddress(address))?;

        if port >= self.base_user_port {
            Ok(Endpoint::User(u32::from(port - self.base_user_port)))
        } else if port >= self.base_relay_port {
            Ok(Endpoint::Relay(u32::from(port - self.base_relay_port)))
        } else {
            Err(AddressError::UnknownAddress(address))
        }
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new(8080, 4000, 5000)
    }
}
