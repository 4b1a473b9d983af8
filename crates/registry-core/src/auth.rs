//! Message Authenticator (§4.3): HMAC-SHA-1 compute and verify.

use crate::errors::AuthError;
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Size in bytes of an HMAC-SHA-1 tag.
pub const TAG_LEN: usize = 20;

type HmacSha1 = Hmac<Sha1>;

/// Computes the 20-byte HMAC-SHA-1 tag of `message` under `key`.
///
/// `Hmac::new_from_slice` never fails for SHA-1 (it accepts keys of any
/// length, hashing down keys longer than the block size internally), so
/// this never returns an error in practice; it still returns `Result` to
/// keep the contract explicit about the underlying construction.
pub fn compute(key: &[u8], message: &[u8]) -> [u8; TAG_LEN] {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&tag);
    out
}

/// Verifies `tag` against the HMAC-SHA-1 of `message` under `key` using a
/// constant-time comparison.
pub fn verify(key: &[u8], message: &[u8], tag: &[u8]) -> Result<(), AuthError> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.verify_slice(tag).map_err(|_| AuthError::VerificationFailed)
}
