//! AES-128-CBC with PKCS#7 padding for the encrypted challenge envelope.
//!
//! The envelope carries `{ciphertext, iv}`; the IV is a fresh random
//! 16-byte value for every message. CBC is unauthenticated, so callers
//! bound exposure with the per-session block counter and treat any
//! padding or parse failure after decryption as a protocol reject.

use crate::{Error, Result};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// Encrypt `plaintext` under `key`/`iv` with PKCS#7 padding.
///
/// The ciphertext is always a non-zero multiple of [`BLOCK_LEN`].
pub fn aes128_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `ciphertext` under `key`/`iv` and strip PKCS#7 padding.
///
/// # Errors
///
/// Returns an error if the ciphertext is empty, not block-aligned, or the
/// padding is invalid after decryption (the usual symptom of a wrong key).
///
/// # Example
///
/// ```
/// use ndncert_crypto::cipher::{aes128_cbc_decrypt, aes128_cbc_encrypt};
///
/// let key = [0x2b; 16];
/// let iv = [0x01; 16];
/// let ciphertext = aes128_cbc_encrypt(&key, &iv, b"challenge payload");
/// let plaintext = aes128_cbc_decrypt(&key, &iv, &ciphertext).unwrap();
/// assert_eq!(&*plaintext, b"challenge payload");
/// ```
pub fn aes128_cbc_decrypt(
    key: &[u8; 16],
    iv: &[u8; 16],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(Error::Decryption(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }
    let plaintext = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::Decryption("bad PKCS#7 padding".into()))?;
    Ok(Zeroizing::new(plaintext))
}

/// Number of AES blocks a plaintext of `len` bytes occupies once padded.
///
/// PKCS#7 always adds at least one byte, so an exact multiple of the block
/// size still gains a block.
pub fn padded_block_count(len: usize) -> u64 {
    (len as u64 / BLOCK_LEN as u64) + 1
}
