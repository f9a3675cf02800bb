//! CSPRNG helpers.
//!
//! Everything random in the protocol — handshake salts, envelope IVs, PIN
//! codes, name-assignment nonces — comes from the OS CSPRNG through these
//! helpers.

use rand::RngCore;

/// Fill a fresh `Vec` of `n` bytes from the OS CSPRNG.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// A fresh random fixed-size array from the OS CSPRNG.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}
