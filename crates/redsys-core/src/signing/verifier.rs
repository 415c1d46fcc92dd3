//! Verification of gateway notifications.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use super::key::diversify;
use super::signer::{mac256, PaymentSigner, SIGNATURE_VERSION};
use crate::encoding;
use crate::error::{Error, Result};
use crate::params::NotificationParameters;

/// Response codes below this value are authorizations.
pub const AUTHORIZED_BELOW: u32 = 100;

/// The three values the gateway sends back, by redirect or server-to-server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCallback {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

/// A notification whose signature checked out and whose response code is an
/// authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub order: String,
    pub response_code: u32,
    pub parameters: NotificationParameters,
}

impl VerifiedPayment {
    pub fn amount_minor(&self) -> Option<u64> {
        self.parameters.amount_minor()
    }
}

/// Final state of a returned transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Authorized,
    Declined,
    Invalid,
}

impl PaymentStatus {
    /// Classify a verification result. Local failures (bad key, bad
    /// configuration) say nothing about the callback and come back as the
    /// error itself.
    pub fn of(result: &Result<VerifiedPayment>) -> std::result::Result<Self, &Error> {
        match result {
            Ok(_) => Ok(PaymentStatus::Authorized),
            Err(Error::DeclinedResponse { .. }) => Ok(PaymentStatus::Declined),
            Err(e) if e.is_callback_rejection() => Ok(PaymentStatus::Invalid),
            Err(e) => Err(e),
        }
    }
}

impl PaymentSigner {
    /// Verify a full callback, including its signature version.
    pub fn verify_callback(&self, callback: &GatewayCallback) -> Result<VerifiedPayment> {
        if callback.signature_version != SIGNATURE_VERSION {
            warn!(
                version = %callback.signature_version,
                "Rejecting callback with unsupported signature version"
            );
            return Err(Error::UnsupportedSignatureVersion {
                version: callback.signature_version.clone(),
            });
        }

        self.verify(&callback.merchant_parameters, &callback.signature)
    }

    /// Verify a notification blob against the URL-safe signature received
    /// with it.
    ///
    /// Succeeds only when the signature matches and `Ds_Response` is below
    /// 100. Decode failures, mismatches and declines come back as distinct
    /// errors.
    pub fn verify(&self, merchant_parameters: &str, signature: &str) -> Result<VerifiedPayment> {
        let raw_key = self.key.decode()?;
        let parameters = NotificationParameters::decode_from_notification(merchant_parameters)?;
        let order = parameters.order()?;

        let order_key = diversify(&raw_key, &order)?;
        let expected = encoding::encode_url_safe(mac256(merchant_parameters.as_bytes(), &order_key)?);

        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            warn!(order = %order, "Notification signature mismatch");
            return Err(Error::SignatureMismatch { order });
        }

        let response_code = parameters.response_code()?;
        if response_code >= AUTHORIZED_BELOW {
            info!(order = %order, response_code, "Payment declined by gateway");
            return Err(Error::DeclinedResponse {
                order,
                response_code,
            });
        }

        debug!(order = %order, response_code, "Payment authorized");

        Ok(VerifiedPayment {
            order,
            response_code,
            parameters,
        })
    }

    /// The URL-safe signature the gateway is expected to send with `blob`.
    pub fn notification_signature(&self, blob: &str) -> Result<String> {
        let raw_key = self.key.decode()?;
        let order = NotificationParameters::decode_from_notification(blob)?.order()?;
        let order_key = diversify(&raw_key, &order)?;

        Ok(encoding::encode_url_safe(mac256(blob.as_bytes(), &order_key)?))
    }
}
