//! Application state shared across handlers.

use std::sync::Arc;

use redsys_core::{GatewayConfig, PaymentSigner};

use crate::nonce::NonceIssuer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Validated merchant configuration, read-only after startup.
    pub gateway: Arc<GatewayConfig>,
    /// Signer built from the merchant key.
    pub signer: PaymentSigner,
    /// Issues and checks payment form nonces.
    pub nonces: NonceIssuer,
}

impl AppState {
    pub fn new(gateway: GatewayConfig, nonces: NonceIssuer) -> Self {
        let signer = gateway.signer();
        Self {
            gateway: Arc::new(gateway),
            signer,
            nonces,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> Arc<AppState> {
    let nonces = NonceIssuer::new("test-nonce-secret").unwrap();
    Arc::new(AppState::new(GatewayConfig::sandbox(), nonces))
}
