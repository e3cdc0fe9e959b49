pub mod addressing;
pub mod transport;

pub use addressing::{AddressError, AddressSpace, Endpoint};
pub use transport::{HttpTransport, Transport, TransportError};
