//! Test utilities and helpers for onionmesh
//!
//! Shared key fixtures (RSA generation is slow, so keys are created once per test
//! binary) and an in-memory transport that records every outbound call.

pub mod fixtures;
pub mod recording_transport;

pub use fixtures::*;
pub use recording_transport::*;
