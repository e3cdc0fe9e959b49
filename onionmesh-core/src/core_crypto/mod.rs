//! Key provider for onion layers
//!
//! Asymmetric keys (RSA-OAEP, 2048 bit) protect the per-hop symmetric key;
//! symmetric keys (AES-256-CBC) protect the routing prefix and inner payload.

pub mod asymmetric;
pub mod errors;
pub mod symmetric;

pub use asymmetric::{encrypt_to, import_public_key, RelayKeyPair, RSA_MODULUS_BITS};
pub use errors::{CryptoError, CryptoResult};
pub use symmetric::{SymmetricKey, IV_LEN, SYMMETRIC_KEY_LEN};
