/*
    symmetric.rs - per-hop AES-256-CBC keys

    Each hop of a circuit gets its own freshly generated 256-bit key. The key encrypts
    that hop's routing prefix plus inner payload, and is zeroized as soon as it is dropped.

    Envelope layout: base64(IV || AES-256-CBC-PKCS7(key, plaintext)), IV is 16 random bytes.
*/

use super::errors::{CryptoError, CryptoResult};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of a symmetric key in bytes
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Length of the initialization vector prepended to each ciphertext
pub const IV_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// A single-use symmetric key for one hop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
        rand::rng().fill(&mut bytes[..]);
        Self(bytes)
    }

    /// Build a key from raw bytes (must be exactly 32 bytes)
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; SYMMETRIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "expected {} key bytes, got {}",
                SYMMETRIC_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Import a base64 raw key
    pub fn import(encoded: &str) -> CryptoResult<Self> {
        let mut raw = STANDARD.decode(encoded)?;
        let key = Self::from_bytes(&raw);
        raw.zeroize();
        key
    }

    /// Export the raw key as base64
    pub fn export(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encrypt UTF-8 text into a base64 `IV || ciphertext` envelope
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill(&mut iv[..]);

        let ciphertext = Aes256CbcEnc::new(&self.0.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut envelope = Vec::with_capacity(IV_LEN + ciphertext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);
        STANDARD.encode(envelope)
    }

    /// Decrypt a base64 `IV || ciphertext` envelope back to UTF-8 text
    pub fn decrypt(&self, envelope: &str) -> CryptoResult<String> {
        let raw = STANDARD.decode(envelope)?;
        if raw.len() < IV_LEN + BLOCK_LEN || (raw.len() - IV_LEN) % BLOCK_LEN != 0 {
            return Err(CryptoError::Decryption(format!(
                "invalid envelope length {}",
                raw.len()
            )));
        }

        let (iv, ciphertext) = raw.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| CryptoError::Decryption("invalid IV".to_string()))?;

        let plaintext = Aes256CbcDec::new(&self.0.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}
