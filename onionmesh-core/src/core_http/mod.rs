//! HTTP surfaces of the three node kinds
//!
//! Each node runs its own axum server with its own state; there is no shared
//! global table between nodes of one process.

pub mod api;
pub mod handlers;
pub mod server;
pub mod types;

pub use api::{build_directory_router, build_relay_router, build_user_router};
pub use handlers::ApiError;
pub use server::{NodeServer, RunningServer};
