//! Encrypted envelope for CHALLENGE traffic.
//!
//! `{EncryptedPayload, InitialVector(16)}` over the session key, with a
//! fresh random IV per message. Both sides account every AES block against
//! a per-session ceiling; a session that exhausts its budget is torn down
//! rather than risking IV reuse at scale.

use crate::tlv::{self, types};
use crate::{Error, ErrorCode, Result};
use ndncert_crypto::cipher::{self, BLOCK_LEN, IV_LEN};
use ndncert_crypto::rng;
use zeroize::Zeroizing;

/// Encrypt `plaintext` and encode the envelope TLVs.
///
/// `block_counter` is the per-session AES block tally; crossing the
/// `u32::MAX` ceiling fails with an `OutOfTime` rejection.
pub fn seal(key: &[u8; 16], block_counter: &mut u32, plaintext: &[u8]) -> Result<Vec<u8>> {
    bump(block_counter, cipher::padded_block_count(plaintext.len()))?;

    let iv: [u8; IV_LEN] = rng::random_array();
    let ciphertext = cipher::aes128_cbc_encrypt(key, &iv, plaintext);

    let mut buf = Vec::with_capacity(ciphertext.len() + IV_LEN + 8);
    tlv::write_tlv(&mut buf, types::ENCRYPTED_PAYLOAD, &ciphertext);
    tlv::write_tlv(&mut buf, types::INITIAL_VECTOR, &iv);
    Ok(buf)
}

/// Decode the envelope TLVs and decrypt the payload.
///
/// Rejects a missing field, an IV that is not 16 bytes, a ciphertext that
/// is not block-aligned, and any padding failure after decryption.
pub fn open(key: &[u8; 16], block_counter: &mut u32, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let elements = tlv::Element::parse_all(data)?;
    let payload = tlv::find(&elements, types::ENCRYPTED_PAYLOAD)?.value;
    let iv_bytes = tlv::find(&elements, types::INITIAL_VECTOR)?.value;

    if iv_bytes.len() != IV_LEN {
        return Err(Error::InvalidTlv(format!(
            "initial vector must be {} bytes, got {}",
            IV_LEN,
            iv_bytes.len()
        )));
    }
    if payload.is_empty() || payload.len() % BLOCK_LEN != 0 {
        return Err(Error::InvalidTlv(format!(
            "encrypted payload length {} is not a positive multiple of {}",
            payload.len(),
            BLOCK_LEN
        )));
    }

    bump(block_counter, (payload.len() / BLOCK_LEN) as u64)?;

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(iv_bytes);
    Ok(cipher::aes128_cbc_decrypt(key, &iv, payload)?)
}

fn bump(counter: &mut u32, blocks: u64) -> Result<()> {
    let total = (*counter as u64)
        .checked_add(blocks)
        .filter(|t| *t <= u32::MAX as u64)
        .ok_or_else(|| {
            Error::rejection(ErrorCode::OutOfTime, "session AES block budget exhausted")
        })?;
    *counter = total as u32;
    Ok(())
}
