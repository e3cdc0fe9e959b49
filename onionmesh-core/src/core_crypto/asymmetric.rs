/*
    asymmetric.rs - RSA-OAEP key pairs for relays

    Every relay owns one 2048-bit RSA key pair. The public half is published to the
    directory as base64(SPKI DER); senders use it to wrap the per-hop symmetric key.

    Encryption: RSA-OAEP with SHA-256 for both the digest and MGF1, empty label.
    Output is base64(ciphertext). With a 2048-bit modulus the ciphertext is 256 bytes,
    which always encodes to 344 base64 characters.
*/

use super::errors::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;

/// RSA modulus size used for every relay key
pub const RSA_MODULUS_BITS: usize = 2048;

/// Asymmetric key pair held by a relay for peeling its layer
#[derive(Clone)]
pub struct RelayKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl RelayKeyPair {
    /// Generate a fresh key pair
    pub fn generate() -> CryptoResult<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_MODULUS_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self { private_key, public_key })
    }

    /// Rebuild a key pair from a base64 PKCS#8 private key
    pub fn from_private_key_base64(encoded: &str) -> CryptoResult<Self> {
        let der = STANDARD.decode(encoded)?;
        let private_key = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self { private_key, public_key })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Export the public key as base64(SPKI DER)
    pub fn export_public_key(&self) -> CryptoResult<String> {
        let der = self
            .public_key
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyExport(e.to_string()))?;
        Ok(STANDARD.encode(der.as_bytes()))
    }

    /// Export the private key as base64(PKCS#8 DER)
    pub fn export_private_key(&self) -> CryptoResult<String> {
        let der = self
            .private_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyExport(e.to_string()))?;
        Ok(STANDARD.encode(der.as_bytes()))
    }

    /// Decrypt a base64 RSA-OAEP ciphertext addressed to this key pair
    pub fn decrypt(&self, ciphertext: &str) -> CryptoResult<Vec<u8>> {
        let raw = STANDARD.decode(ciphertext)?;
        self.private_key
            .decrypt(Oaep::new::<Sha256>(), &raw)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

impl fmt::Debug for RelayKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Parse a base64(SPKI DER) public key as published in the directory
pub fn import_public_key(encoded: &str) -> CryptoResult<RsaPublicKey> {
    let der = STANDARD.decode(encoded)?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Encrypt `data` to `public_key`, returning base64(ciphertext)
pub fn encrypt_to(public_key: &RsaPublicKey, data: &[u8]) -> CryptoResult<String> {
    let ciphertext = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), data)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}
