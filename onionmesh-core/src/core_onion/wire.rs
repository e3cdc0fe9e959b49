/*
    Wire format of a layered message

    A layered message is a flat string. One layer is:

        AsymmetricEnvelope (344 chars) || SymmetricEnvelope (rest)

    AsymmetricEnvelope = base64(RSA-OAEP(hop public key, raw hop key))
    SymmetricEnvelope  = base64(IV || AES-256-CBC(hop key, routing prefix || inner payload))

    The routing prefix is the next hop's port, zero-padded to 10 ASCII digits. The inner
    payload is the next layer, or the plaintext for the last relay.

    There is no length field: the relay splits at ASYMMETRIC_ENVELOPE_LEN, which is the
    base64 length of one RSA block and must be recomputed if the modulus size changes.
*/

use super::errors::{OnionError, OnionResult};
use crate::core_crypto::{encrypt_to, RelayKeyPair, SymmetricKey, RSA_MODULUS_BITS};
use rsa::RsaPublicKey;
use std::fmt;

/// Number of relays in every circuit
pub const HOP_COUNT: usize = 3;

/// Length of the base64 asymmetric envelope at the head of every layer
pub const ASYMMETRIC_ENVELOPE_LEN: usize = base64_len(RSA_MODULUS_BITS / 8);

/// Width of the zero-padded next-hop address inside a decrypted layer
pub const ROUTING_PREFIX_LEN: usize = 10;

const MAX_ROUTING_ADDRESS: u64 = 9_999_999_999;

const fn base64_len(bytes: usize) -> usize {
    4 * ((bytes + 2) / 3)
}

/// The ciphertext handed from one hop to the next
#[derive(Clone, PartialEq, Eq)]
pub struct LayeredMessage(String);

impl LayeredMessage {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The asymmetric envelope of the outermost layer
    pub fn outer_envelope(&self) -> Option<&str> {
        self.0.get(..ASYMMETRIC_ENVELOPE_LEN)
    }
}

impl fmt::Debug for LayeredMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayeredMessage({} chars)", self.0.len())
    }
}

impl From<LayeredMessage> for String {
    fn from(message: LayeredMessage) -> Self {
        message.0
    }
}

/// Result of removing one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeledLayer {
    /// Next hop address, `None` when this hop is terminal
    pub next_hop: Option<u64>,
    /// What is left after the routing prefix
    pub remainder: String,
}

impl PeeledLayer {
    pub fn is_terminal(&self) -> bool {
        self.next_hop.is_none()
    }
}

/// Zero-pad a next-hop address to the fixed prefix width
pub fn encode_routing_prefix(address: u64) -> OnionResult<String> {
    if address > MAX_ROUTING_ADDRESS {
        return Err(OnionError::InvalidInput(format!(
            "address {} does not fit in {} digits",
            address, ROUTING_PREFIX_LEN
        )));
    }
    Ok(format!("{:0width$}", address, width = ROUTING_PREFIX_LEN))
}

/// Split a layer into its asymmetric and symmetric envelopes
pub fn split_envelopes(message: &str) -> OnionResult<(&str, &str)> {
    if message.len() < ASYMMETRIC_ENVELOPE_LEN || !message.is_char_boundary(ASYMMETRIC_ENVELOPE_LEN)
    {
        return Err(OnionError::DecryptionFailure(format!(
            "message of {} bytes has no complete asymmetric envelope",
            message.len()
        )));
    }
    Ok(message.split_at(ASYMMETRIC_ENVELOPE_LEN))
}

/// Separate the routing prefix from a decrypted layer
///
/// Anything shorter than the prefix width is terminal: no next hop and the
/// whole input is the remainder.
pub fn split_routing_prefix(plain: &str) -> OnionResult<(Option<u64>, &str)> {
    let boundary = plain
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(plain.len()))
        .nth(ROUTING_PREFIX_LEN);

    let Some(boundary) = boundary else {
        return Ok((None, plain));
    };

    let (prefix, remainder) = plain.split_at(boundary);
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OnionError::DecryptionFailure(
            "malformed routing prefix".to_string(),
        ));
    }
    let address = prefix.parse::<u64>().map_err(OnionError::decryption)?;

    Ok((Some(address), remainder))
}

/// Wrap `inner` in one layer addressed to the holder of `hop_key`
///
/// A fresh symmetric key is generated for the layer and dropped (zeroized)
/// before returning.
pub fn wrap_layer(hop_key: &RsaPublicKey, next_hop: u64, inner: &str) -> OnionResult<String> {
    let layer_key = SymmetricKey::generate();

    let mut plain = encode_routing_prefix(next_hop)?;
    plain.push_str(inner);
    let symmetric_envelope = layer_key.encrypt(&plain);

    let asymmetric_envelope = encrypt_to(hop_key, layer_key.as_bytes())?;
    if asymmetric_envelope.len() != ASYMMETRIC_ENVELOPE_LEN {
        return Err(OnionError::InvalidInput(format!(
            "hop key produced a {}-char envelope, expected {}",
            asymmetric_envelope.len(),
            ASYMMETRIC_ENVELOPE_LEN
        )));
    }

    let mut layer = asymmetric_envelope;
    layer.push_str(&symmetric_envelope);
    Ok(layer)
}

/// Remove the outermost layer of `message` with the relay's private key
pub fn peel_layer(keys: &RelayKeyPair, message: &str) -> OnionResult<PeeledLayer> {
    let (asymmetric_envelope, symmetric_envelope) = split_envelopes(message)?;

    let raw_key = keys
        .decrypt(asymmetric_envelope)
        .map_err(OnionError::decryption)?;
    let layer_key = SymmetricKey::from_bytes(&raw_key).map_err(OnionError::decryption)?;

    // An empty symmetric envelope is already final
    let plain = if symmetric_envelope.is_empty() {
        String::new()
    } else {
        layer_key
            .decrypt(symmetric_envelope)
            .map_err(OnionError::decryption)?
    };

    let (next_hop, remainder) = split_routing_prefix(&plain)?;
    Ok(PeeledLayer {
        next_hop,
        remainder: remainder.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::shared_keys;

    #[test]
    fn test_constants() {
        assert_eq!(ASYMMETRIC_ENVELOPE_LEN, 344);
        assert_eq!(HOP_COUNT, 3);
        assert_eq!(ROUTING_PREFIX_LEN, 10);
    }

    #[test]
    fn test_encode_routing_prefix() {
        assert_eq!(encode_routing_prefix(4001).unwrap(), "0000004001");
        assert_eq!(encode_routing_prefix(0).unwrap(), "0000000000");
        assert_eq!(encode_routing_prefix(9_999_999_999).unwrap(), "9999999999");
        assert!(encode_routing_prefix(10_000_000_000).is_err());
    }

    #[test]
    fn test_split_routing_prefix() {
        assert_eq!(
            split_routing_prefix("0000005007hello").unwrap(),
            (Some(5007), "hello")
        );
        assert_eq!(split_routing_prefix("0000004002").unwrap(), (Some(4002), ""));
    }

    #[test]
    fn test_short_plaintext_is_terminal() {
        assert_eq!(split_routing_prefix("").unwrap(), (None, ""));
        assert_eq!(split_routing_prefix("hello").unwrap(), (None, "hello"));
        assert_eq!(split_routing_prefix("123456789").unwrap(), (None, "123456789"));
        // Nine characters, more than nine bytes
        assert_eq!(split_routing_prefix("ééééééééé").unwrap(), (None, "ééééééééé"));
    }

    #[test]
    fn test_non_numeric_prefix_is_rejected() {
        assert!(matches!(
            split_routing_prefix("hello world"),
            Err(OnionError::DecryptionFailure(_))
        ));
        assert!(matches!(
            split_routing_prefix("+000004001x"),
            Err(OnionError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_split_envelopes() {
        let message = format!("{}{}", "A".repeat(ASYMMETRIC_ENVELOPE_LEN), "tail");
        let (asym, sym) = split_envelopes(&message).unwrap();

        assert_eq!(asym.len(), ASYMMETRIC_ENVELOPE_LEN);
        assert_eq!(sym, "tail");

        assert!(split_envelopes("too short").is_err());
        assert!(split_envelopes("").is_err());
    }

    #[test]
    fn test_wrap_then_peel_single_layer() {
        let keys = shared_keys(0);
        let layer = wrap_layer(keys.public_key(), 5007, "hello").unwrap();

        let peeled = peel_layer(keys, &layer).unwrap();
        assert_eq!(peeled.next_hop, Some(5007));
        assert_eq!(peeled.remainder, "hello");
        assert!(!peeled.is_terminal());
    }

    #[test]
    fn test_envelope_length_independent_of_payload() {
        let keys = shared_keys(0);
        for payload in ["", "x", "a much longer payload that spans many AES blocks ........"] {
            let layer = wrap_layer(keys.public_key(), 4001, payload).unwrap();
            let (asym, _) = split_envelopes(&layer).unwrap();

            assert_eq!(asym.len(), ASYMMETRIC_ENVELOPE_LEN);
            assert!(keys.decrypt(asym).is_ok());
        }
    }

    #[test]
    fn test_empty_symmetric_envelope_is_terminal() {
        let keys = shared_keys(1);
        let layer = wrap_layer(keys.public_key(), 4001, "ignored").unwrap();
        let asym_only = &layer[..ASYMMETRIC_ENVELOPE_LEN];

        let peeled = peel_layer(keys, asym_only).unwrap();
        assert!(peeled.is_terminal());
        assert_eq!(peeled.remainder, "");
    }

    #[test]
    fn test_peel_with_wrong_key_fails() {
        let layer = wrap_layer(shared_keys(0).public_key(), 4001, "payload").unwrap();

        let err = peel_layer(shared_keys(1), &layer).unwrap_err();
        assert!(matches!(err, OnionError::DecryptionFailure(_)));
    }

    #[test]
    fn test_peel_corrupt_symmetric_envelope_fails() {
        let keys = shared_keys(0);
        let mut layer = wrap_layer(keys.public_key(), 4001, "payload").unwrap();
        layer.push_str("!!");

        assert!(matches!(
            peel_layer(keys, &layer),
            Err(OnionError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_layered_message_debug_hides_content() {
        let message = LayeredMessage::new("secret-ciphertext");
        assert_eq!(format!("{:?}", message), "LayeredMessage(17 chars)");
        assert_eq!(message.outer_envelope(), None);
    }
}
