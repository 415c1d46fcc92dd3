//! `HMAC_SHA256_V1` signatures for merchant parameters.
//!
//! # Architecture
//!
//! ```text
//! MerchantKey (base64, at rest)
//!       │ decode
//!       ▼
//! raw 3DES key ── diversify(order id) ──► per-order key
//!                                              │
//!        Ds_MerchantParameters (base64) ───────┤ HMAC-SHA256
//!                                              ▼
//!                                         Ds_Signature
//! ```
//!
//! Requests are signed over the standard-base64 parameters and the digest is
//! encoded with the standard alphabet. Notifications are verified over the
//! URL-safe blob exactly as received and compared against a URL-safe digest.
//!
//! # Example
//!
//! ```ignore
//! use redsys_core::params::{MerchantParameters, RequestField};
//! use redsys_core::signing::{MerchantKey, PaymentSigner};
//!
//! let signer = PaymentSigner::new(MerchantKey::new("sq7HjrUOBfKmC576ILgskD5srU870gJ7"));
//!
//! let mut params = MerchantParameters::new();
//! params.set(RequestField::Order, "a1b-2550");
//! params.set(RequestField::Amount, 2550u64);
//!
//! let request = signer.sign(&params)?;
//! // later, on the return trip
//! let payment = signer.verify(&blob, &signature)?;
//! ```

pub mod key;
pub mod signer;
pub mod verifier;

pub use key::MerchantKey;
pub use signer::{PaymentSigner, SignedRequest, SIGNATURE_VERSION};
pub use verifier::{GatewayCallback, PaymentStatus, VerifiedPayment};
