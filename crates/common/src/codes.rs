//! Referral and gift code generation.
//!
//! Codes are uppercase alphanumerics (A–Z, 0–9) derived from a Sha3-256
//! digest over the seed material plus a fresh random salt, mapped onto
//! the alphabet. The salt makes repeated draws for the same seed yield
//! different codes; uniqueness against the stored code set is the
//! caller's check, done through [`unique_code`] with a bounded number of
//! re-draws.

use rand::RngCore;
use sha3::{Digest, Sha3_256};

/// Output alphabet. 36 symbols; digest bytes are reduced modulo this.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const REFERRAL_CODE_LEN: usize = 8;
pub const GIFT_CODE_LEN: usize = 12;
pub const GIFT_CODE_PREFIX: &str = "GIFT-";

/// Re-draws before `unique_code` gives up. With a 36^8 space this only
/// trips if the caller's `exists` check is broken.
const MAX_DRAW_ATTEMPTS: usize = 32;

/// Derive one candidate code of `len` characters from seed parts plus a
/// random salt.
pub fn derive_code(seed: &[&str], len: usize) -> String {
    let mut salt = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha3_256::new();
    for part in seed {
        hasher.update(part.as_bytes());
        // separator so ("ab","c") and ("a","bc") hash differently
        hasher.update([0u8]);
    }
    hasher.update(salt);
    let digest = hasher.finalize();

    digest
        .iter()
        .cycle()
        .take(len)
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}

/// Draw codes until one passes the caller's collision check.
///
/// Returns `None` only after [`MAX_DRAW_ATTEMPTS`] collisions.
pub fn unique_code<F>(seed: &[&str], len: usize, mut exists: F) -> Option<String>
where
    F: FnMut(&str) -> bool,
{
    for _ in 0..MAX_DRAW_ATTEMPTS {
        let code = derive_code(seed, len);
        if !exists(&code) {
            return Some(code);
        }
    }
    None
}

/// Gift codes carry a fixed prefix so they are recognizable in logs and
/// support tickets. The collision check sees the full prefixed code.
pub fn unique_gift_code<F>(seed: &[&str], mut exists: F) -> Option<String>
where
    F: FnMut(&str) -> bool,
{
    for _ in 0..MAX_DRAW_ATTEMPTS {
        let code = format!("{}{}", GIFT_CODE_PREFIX, derive_code(seed, GIFT_CODE_LEN));
        if !exists(&code) {
            return Some(code);
        }
    }
    None
}
