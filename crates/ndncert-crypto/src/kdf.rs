//! Key derivation (HKDF-SHA256).
//!
//! The handshake derives two values from the ECDH shared secret and the
//! CA-chosen 32-byte salt:
//! - the 16-byte AES-128 session key (empty info), and
//! - the 8-byte request id (info `"requestId"`), computed identically on
//!   both sides so no extra round-trip is needed to agree on it.

use crate::{Error, Result};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of the AES-128 session key in bytes.
pub const SESSION_KEY_LEN: usize = 16;

/// Length of a request id in bytes.
pub const REQUEST_ID_LEN: usize = 8;

/// Generic HKDF-SHA256 per RFC 5869.
///
/// # Errors
///
/// Fails only if `output_len` exceeds the HKDF expansion bound
/// (255 × 32 bytes).
///
/// # Example
///
/// ```
/// use ndncert_crypto::kdf::hkdf_sha256;
///
/// let okm = hkdf_sha256(b"shared secret", b"salt", b"context", 42).unwrap();
/// assert_eq!(okm.len(), 42);
/// ```
pub fn hkdf_sha256(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; output_len];
    hk.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivation("HKDF expansion failed".into()))?;
    Ok(Zeroizing::new(okm))
}

/// Derive the AES-128 session key from the handshake.
///
/// `session_key = HKDF(shared, salt, info = "", 16)`.
pub fn derive_session_key(shared: &[u8], salt: &[u8; 32]) -> Result<Zeroizing<[u8; 16]>> {
    let okm = hkdf_sha256(shared, salt, b"", SESSION_KEY_LEN)?;
    let mut key = [0u8; SESSION_KEY_LEN];
    key.copy_from_slice(&okm);
    Ok(Zeroizing::new(key))
}

/// Derive the 8-byte request id from the handshake.
///
/// `request_id = HKDF(shared, salt, info = "requestId", 8)`.
pub fn derive_request_id(shared: &[u8], salt: &[u8; 32]) -> Result<[u8; 8]> {
    let okm = hkdf_sha256(shared, salt, b"requestId", REQUEST_ID_LEN)?;
    let mut id = [0u8; REQUEST_ID_LEN];
    id.copy_from_slice(&okm);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 5869 Test Case 1.
    #[test]
    fn test_hkdf_rfc5869() {
        let ikm = hex::decode("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b").unwrap();
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let okm = hkdf_sha256(&ikm, &salt, &info, 42).unwrap();

        let expected = hex::decode(
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865",
        )
        .unwrap();
        assert_eq!(&*okm, &expected);
    }

    #[test]
    fn test_session_key_and_request_id_are_independent() {
        let shared = [0x42u8; 32];
        let salt = [0x07u8; 32];

        let key = derive_session_key(&shared, &salt).unwrap();
        let id = derive_request_id(&shared, &salt).unwrap();

        assert_eq!(key.len(), SESSION_KEY_LEN);
        assert_eq!(id.len(), REQUEST_ID_LEN);
        // Different info strings must give unrelated output.
        assert_ne!(&key[..REQUEST_ID_LEN], &id[..]);
    }

    #[test]
    fn test_derivations_are_deterministic() {
        let shared = [0x13u8; 32];
        let salt = [0x55u8; 32];

        assert_eq!(
            *derive_session_key(&shared, &salt).unwrap(),
            *derive_session_key(&shared, &salt).unwrap()
        );
        assert_eq!(
            derive_request_id(&shared, &salt).unwrap(),
            derive_request_id(&shared, &salt).unwrap()
        );
    }

    #[test]
    fn test_salt_changes_output() {
        let shared = [0x13u8; 32];
        let key_a = derive_session_key(&shared, &[0u8; 32]).unwrap();
        let key_b = derive_session_key(&shared, &[1u8; 32]).unwrap();
        assert_ne!(*key_a, *key_b);
    }
}
