//! Merchant order identifiers.
//!
//! The identifier is signed twice over: it sits inside the merchant
//! parameters and it diversifies the signing key. The gateway accepts 4 to 8
//! characters here, so the amount is folded in with a fallback cascade:
//!
//! 1. `xyz-2550`: 3-char prefix, dash, amount in minor units
//! 2. `xyz25`: the same prefix and the amount in whole major units
//! 3. `wxyz50`: a fresh 4-char prefix and the minor units modulo 100
//!
//! There is no uniqueness check against earlier identifiers. Two payments
//! that draw the same prefix for the same amount get the same identifier.

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::trace;

/// Prefix characters.
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const MIN_LEN: usize = 4;
pub const MAX_LEN: usize = 8;

/// Which step of the cascade produced an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    PrefixedMinorUnits,
    PrefixedMajorUnits,
    RemainderOnly,
}

/// Generate an identifier using the thread-local generator.
pub fn generate(amount_minor: u64) -> String {
    generate_with(amount_minor, &mut rand::rng())
}

/// Generate an identifier from an explicit randomness source.
pub fn generate_with<R: Rng + ?Sized>(amount_minor: u64, rng: &mut R) -> String {
    let (order, tier) = compose(amount_minor, rng);
    trace!(order = %order, tier = ?tier, "Generated order identifier");
    order
}

fn compose<R: Rng + ?Sized>(amount_minor: u64, rng: &mut R) -> (String, Tier) {
    let prefix = random_prefix(rng, 3);

    let order = format!("{}-{}", prefix, amount_minor);
    if order.len() <= MAX_LEN {
        return (order, Tier::PrefixedMinorUnits);
    }

    let order = format!("{}{}", prefix, amount_minor / 100);
    if order.len() <= MAX_LEN {
        return (order, Tier::PrefixedMajorUnits);
    }

    let order = format!("{}{}", random_prefix(rng, 4), amount_minor % 100);
    (order, Tier::RemainderOnly)
}

/// Distinct characters drawn uniformly from [`ALPHABET`].
fn random_prefix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    ALPHABET
        .choose_multiple(rng, len)
        .map(|&c| char::from(c))
        .collect()
}
