//! Form nonces for the payment entry point.
//!
//! A nonce is an HMAC-SHA256 over the current 12-hour tick, so it needs no
//! storage and stays valid for 12 to 24 hours. It guards against cross-site
//! form posts; it is not a replay counter.

use anyhow::anyhow;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of one nonce tick in seconds.
pub const TICK_SECS: i64 = 12 * 60 * 60;

/// Header the payment form sends its nonce in.
pub const NONCE_HEADER: &str = "x-tpv-nonce";

const ACTION: &str = "tpv_redsys_nonce";

/// Issues and checks form nonces with a server secret.
#[derive(Clone)]
pub struct NonceIssuer {
    mac: HmacSha256,
}

impl NonceIssuer {
    pub fn new(secret: impl AsRef<[u8]>) -> anyhow::Result<Self> {
        let mac = <HmacSha256 as KeyInit>::new_from_slice(secret.as_ref())
            .map_err(|e| anyhow!("Invalid nonce secret: {}", e))?;
        Ok(Self { mac })
    }

    /// Issuer with a random per-process secret. Nonces do not survive restarts.
    pub fn random() -> anyhow::Result<Self> {
        let secret: [u8; 32] = rand::random();
        Self::new(secret)
    }

    pub fn issue(&self, now: DateTime<Utc>) -> String {
        self.nonce_for_tick(tick(now))
    }

    /// Accepts nonces from the current and the previous tick.
    pub fn verify(&self, nonce: &str, now: DateTime<Utc>) -> bool {
        let current = tick(now);

        [current, current - 1].into_iter().any(|t| {
            let expected = self.nonce_for_tick(t);
            bool::from(expected.as_bytes().ct_eq(nonce.as_bytes()))
        })
    }

    fn nonce_for_tick(&self, tick: i64) -> String {
        let mut mac = self.mac.clone();
        mac.update(format!("{}|{}", ACTION, tick).as_bytes());
        let digest = mac.finalize().into_bytes();

        URL_SAFE_NO_PAD.encode(&digest[..16])
    }
}

fn tick(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(TICK_SECS)
}

impl std::fmt::Debug for NonceIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceIssuer")
            .field("secret", &"<redacted>")
            .finish()
    }
}
