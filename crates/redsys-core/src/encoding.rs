//! Base64 alphabets used by the gateway.
//!
//! Outbound values (merchant parameters, request signature, merchant key) use
//! the standard alphabet. Notification blobs and signatures use the URL-safe
//! alphabet; the gateway may or may not pad them.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// URL-safe engine that accepts blobs with or without padding.
const URL_SAFE_ANY_PADDING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn encode_standard(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

pub fn decode_standard(data: impl AsRef<[u8]>) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}

/// URL-safe encoding, padded the way the gateway emits notification signatures.
pub fn encode_url_safe(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

pub fn decode_url_safe(data: impl AsRef<[u8]>) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_ANY_PADDING.decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0xfb 0xff encodes to "+/8=" in the standard alphabet and "-_8=" URL-safe.
    const BYTES: [u8; 2] = [0xfb, 0xff];

    #[test]
    fn test_alphabets_differ() {
        assert_eq!(encode_standard(BYTES), "+/8=");
        assert_eq!(encode_url_safe(BYTES), "-_8=");
    }

    #[test]
    fn test_url_safe_decoder_rejects_standard_alphabet() {
        assert!(decode_url_safe("+/8=").is_err());
        assert_eq!(decode_url_safe("-_8=").unwrap(), BYTES);
    }

    #[test]
    fn test_standard_decoder_rejects_url_safe_alphabet() {
        assert!(decode_standard("-_8=").is_err());
        assert_eq!(decode_standard("+/8=").unwrap(), BYTES);
    }

    #[test]
    fn test_url_safe_padding_is_optional() {
        assert_eq!(decode_url_safe("-_8").unwrap(), BYTES);
        assert_eq!(decode_url_safe("-_8=").unwrap(), BYTES);
    }
}
