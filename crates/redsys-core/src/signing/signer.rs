//! Signing of outbound payment requests.
//!
//! Provides the `HMAC_SHA256_V1` signature the gateway expects next to
//! `Ds_MerchantParameters`.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use super::key::{diversify, MerchantKey};
use crate::encoding;
use crate::error::{Error, Result};
use crate::params::MerchantParameters;

type HmacSha256 = Hmac<Sha256>;

/// Signature version tag sent as `Ds_SignatureVersion`.
pub const SIGNATURE_VERSION: &str = "HMAC_SHA256_V1";

/// The three values posted to the gateway's payment endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

/// Signs payment requests and verifies notifications with one merchant key.
///
/// Holds no state besides the key; share it freely between threads.
#[derive(Clone)]
pub struct PaymentSigner {
    pub(super) key: MerchantKey,
}

impl PaymentSigner {
    pub fn new(key: MerchantKey) -> Self {
        Self { key }
    }

    /// Encode and sign merchant parameters.
    ///
    /// The parameters must carry `DS_MERCHANT_ORDER`; it diversifies the key.
    pub fn sign(&self, params: &MerchantParameters) -> Result<SignedRequest> {
        let raw_key = self.key.decode()?;
        let merchant_parameters = params.encode_for_transmission()?;
        let order = params.order()?;

        let order_key = diversify(&raw_key, &order)?;
        let digest = mac256(merchant_parameters.as_bytes(), &order_key)?;

        debug!(order = %order, "Signed merchant parameters");

        Ok(SignedRequest {
            signature_version: SIGNATURE_VERSION.to_string(),
            merchant_parameters,
            signature: encoding::encode_standard(digest),
        })
    }
}

/// HMAC-SHA256 of `message` under `key`, raw digest bytes.
pub(super) fn mac256(message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(key).map_err(|_| Error::InvalidKey {
        message: "derived key rejected by HMAC".to_string(),
    })?;
    mac.update(message);

    Ok(mac.finalize().into_bytes().to_vec())
}

impl std::fmt::Debug for PaymentSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSigner")
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RequestField;

    // Public sandbox key published by the gateway for its test environment.
    const TEST_KEY: &str = "sq7HjrUOBfKmC576ILgskD5srU870gJ7";

    fn test_signer() -> PaymentSigner {
        PaymentSigner::new(MerchantKey::new(TEST_KEY))
    }

    fn test_params() -> MerchantParameters {
        let mut params = MerchantParameters::new();
        params.set(RequestField::Amount, 2550u64);
        params.set(RequestField::Order, "a1b-2550");
        params.set(RequestField::MerchantCode, "999008881");
        params.set(RequestField::Currency, "978");
        params.set(RequestField::TransactionType, 0u64);
        params.set(RequestField::Terminal, "1");
        params.set(
            RequestField::MerchantUrl,
            "https://shop.example/tpv-pago-exitoso/",
        );
        params.set(RequestField::UrlOk, "https://shop.example/tpv-pago-exitoso/");
        params.set(RequestField::UrlKo, "https://shop.example/tpv-pago-error/");
        params.set(RequestField::MerchantName, "Example Shop");
        params.set(RequestField::ProductDescription, "Pago TPV");
        params
    }

    #[test]
    fn test_sign_matches_fixture() {
        let signed = test_signer().sign(&test_params()).unwrap();

        assert_eq!(signed.signature_version, "HMAC_SHA256_V1");
        assert!(signed.merchant_parameters.starts_with("eyJEU19NRVJDSEFOVF9BTU9VTlQiOjI1NTAs"));
        assert_eq!(
            signed.signature,
            "g7vULNZ24M6EICJCuhSjzXXBfLUXgiMvjk+jRazjtzQ="
        );
    }

    #[test]
    fn test_signatures_are_deterministic() {
        let signer = test_signer();
        let first = signer.sign(&test_params()).unwrap();
        let second = signer.sign(&test_params()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_depends_on_every_field() {
        let signer = test_signer();
        let baseline = signer.sign(&test_params()).unwrap().signature;

        let mut params = test_params();
        params.set(RequestField::Amount, 2551u64);
        assert_ne!(signer.sign(&params).unwrap().signature, baseline);

        let mut params = test_params();
        params.set(RequestField::Order, "a1c-2550");
        assert_ne!(signer.sign(&params).unwrap().signature, baseline);
    }

    #[test]
    fn test_sign_requires_order() {
        let mut params = MerchantParameters::new();
        params.set(RequestField::Amount, 100u64);

        let result = test_signer().sign(&params);
        assert!(matches!(result, Err(Error::MissingParameter(_))));
    }

    #[test]
    fn test_sign_rejects_invalid_key() {
        let signer = PaymentSigner::new(MerchantKey::new("not base64!"));
        let result = signer.sign(&test_params());
        assert!(matches!(result, Err(Error::InvalidKey { .. })));
    }

    #[test]
    fn test_signed_request_field_names() {
        let signed = test_signer().sign(&test_params()).unwrap();
        let json = serde_json::to_value(&signed).unwrap();

        assert_eq!(json["Ds_SignatureVersion"], "HMAC_SHA256_V1");
        assert!(json["Ds_MerchantParameters"].is_string());
        assert!(json["Ds_Signature"].is_string());
    }

    #[test]
    fn test_debug_does_not_expose_key() {
        let debug_str = format!("{:?}", test_signer());
        assert!(debug_str.contains("PaymentSigner"));
        assert!(!debug_str.contains(TEST_KEY));
    }
}
