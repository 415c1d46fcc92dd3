//! Redsys Core Library
//!
//! Merchant parameter encoding, order identifier generation and the
//! `HMAC_SHA256_V1` signing protocol used by the Redsys virtual POS.

pub mod config;
pub mod encoding;
pub mod error;
pub mod order_id;
pub mod params;
pub mod payment;
pub mod signing;

pub use config::{Currency, Environment, GatewayConfig};
pub use error::{DecodeError, Error, Result};
pub use params::{MerchantParameters, NotificationParameters, ParameterValue};
pub use payment::{PaymentForm, PaymentRequest};
pub use signing::{
    GatewayCallback, MerchantKey, PaymentSigner, PaymentStatus, SignedRequest, VerifiedPayment,
};
