//! Merchant secret and per-order key diversification.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use des::TdesEde3;
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::encoding;
use crate::error::{Error, Result};

type TdesCbcEncryptor = cbc::Encryptor<TdesEde3>;

/// Length of a decoded merchant key (3DES, three 8-byte keys).
pub const KEY_LEN: usize = 24;

const BLOCK_LEN: usize = 8;

/// The merchant secret as the bank hands it out: base64, standard alphabet.
///
/// The encoded form is what gets stored. It is decoded once per signing or
/// verification call and the decoded bytes are wiped when the call returns.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct MerchantKey {
    encoded: String,
}

impl MerchantKey {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.trim().is_empty()
    }

    /// Decode to raw 3DES key bytes.
    pub(crate) fn decode(&self) -> Result<Zeroizing<Vec<u8>>> {
        let raw = encoding::decode_standard(self.encoded.trim())
            .map(Zeroizing::new)
            .map_err(|_| Error::InvalidKey {
                message: "merchant key is not valid standard base64".to_string(),
            })?;

        if raw.len() != KEY_LEN {
            return Err(Error::InvalidKey {
                message: format!(
                    "merchant key decodes to {} bytes, expected {}",
                    raw.len(),
                    KEY_LEN
                ),
            });
        }

        Ok(raw)
    }
}

impl std::fmt::Debug for MerchantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchantKey")
            .field("encoded", &"<redacted>")
            .finish()
    }
}

/// Derive the per-order key: 3DES-CBC with a zero IV over the order id,
/// zero-padded to a whole number of blocks. No padding block is added, so the
/// output is exactly as long as the padded plaintext.
pub(crate) fn diversify(raw_key: &[u8], order: &str) -> Result<Zeroizing<Vec<u8>>> {
    let mut plaintext = order.as_bytes().to_vec();
    let padded_len = plaintext.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
    plaintext.resize(padded_len, 0);

    let cipher =
        TdesCbcEncryptor::new_from_slices(raw_key, &[0u8; BLOCK_LEN]).map_err(|_| {
            Error::InvalidKey {
                message: format!("3DES key must be {} bytes", KEY_LEN),
            }
        })?;

    Ok(Zeroizing::new(
        cipher.encrypt_padded_vec_mut::<NoPadding>(&plaintext),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Public sandbox key published by the gateway for its test environment.
    const TEST_KEY: &str = "sq7HjrUOBfKmC576ILgskD5srU870gJ7";

    #[test]
    fn test_decode_test_key() {
        let key = MerchantKey::new(TEST_KEY);
        assert_eq!(key.decode().unwrap().len(), KEY_LEN);
    }

    #[test]
    fn test_decode_rejects_bad_encoding_without_echoing_it() {
        let key = MerchantKey::new("sq7H-rUO_fKmC576ILgskD5srU870gJ7");
        let err = key.decode().unwrap_err();

        assert!(matches!(err, Error::InvalidKey { .. }));
        assert!(!err.to_string().contains("sq7H"));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let key = MerchantKey::new("c2VjcmV0"); // "secret"
        let err = key.decode().unwrap_err();
        assert!(err.to_string().contains("6 bytes"));
    }

    #[test]
    fn test_diversify_single_block() {
        let raw = MerchantKey::new(TEST_KEY).decode().unwrap();
        let derived = diversify(&raw, "a1b-2550").unwrap();
        assert_eq!(hex::encode(&*derived), "79752b60b91a510f");
    }

    #[test]
    fn test_diversify_pads_to_block_multiple() {
        let raw = MerchantKey::new(TEST_KEY).decode().unwrap();

        // 11 bytes pad to 16: two blocks, no extra padding block.
        let derived = diversify(&raw, "12345678901").unwrap();
        assert_eq!(derived.len(), 16);
        assert_eq!(hex::encode(&*derived), "9ed56b24fc69db19eba123a830878917");
    }

    #[test]
    fn test_diversify_depends_on_order() {
        let raw = MerchantKey::new(TEST_KEY).decode().unwrap();
        let a = diversify(&raw, "a1b-2550").unwrap();
        let b = diversify(&raw, "a1c-2550").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_debug_does_not_expose_key() {
        let key = MerchantKey::new(TEST_KEY);
        let debug_str = format!("{:?}", key);

        assert!(debug_str.contains("MerchantKey"));
        assert!(!debug_str.contains(TEST_KEY));
    }
}
