pub mod registry;
pub mod types;

pub use registry::{Directory, DirectoryError};
pub use types::{NodeId, NodeRecord, UserId};
