//! Ephemeral ECDH key agreement over NIST P-256.
//!
//! Each NEW/RENEW/REVOKE exchange starts from a fresh `EcdhState` on both
//! sides; the shared secret feeds the HKDF derivations in [`crate::kdf`].
//! Public keys travel on the wire in uncompressed form (0x04 || x || y)
//! per SEC 1.

use crate::{Error, Result};
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, PublicKey, SecretKey};
use zeroize::Zeroizing;

/// Length of an uncompressed SEC 1 P-256 point.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Ephemeral P-256 keypair for one handshake.
///
/// The private scalar is zeroed when the state is dropped. A state is meant
/// to live for exactly one handshake; deriving the shared secret does not
/// consume it only so the owning session can retry a malformed peer key.
///
/// # Example
///
/// ```
/// use ndncert_crypto::EcdhState;
///
/// let ca = EcdhState::new();
/// let requester = EcdhState::new();
///
/// let ca_shared = ca.derive_secret(requester.public_key()).unwrap();
/// let requester_shared = requester.derive_secret(ca.public_key()).unwrap();
/// assert_eq!(*ca_shared, *requester_shared);
/// ```
pub struct EcdhState {
    secret_key: SecretKey,
    /// Public key in uncompressed form, cached at generation time.
    public_key_bytes: Vec<u8>,
}

impl EcdhState {
    /// Generate a fresh ephemeral keypair from the OS CSPRNG.
    pub fn new() -> Self {
        let secret_key = SecretKey::random(&mut rand::rngs::OsRng);
        let public_key_bytes = secret_key
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Self {
            secret_key,
            public_key_bytes,
        }
    }

    /// Create a state from an existing 32-byte private scalar.
    ///
    /// Used for known-answer tests; production handshakes always use
    /// [`EcdhState::new`].
    ///
    /// # Errors
    ///
    /// Returns an error if the scalar is not a valid P-256 private key.
    pub fn from_private(private_key: &[u8]) -> Result<Self> {
        if private_key.len() != 32 {
            return Err(Error::InvalidKeyLength(format!(
                "P-256 private key must be 32 bytes, got {}",
                private_key.len()
            )));
        }
        let secret_key = SecretKey::from_slice(private_key)
            .map_err(|_| Error::InvalidPrivateKey("not a valid P-256 scalar".into()))?;
        let public_key_bytes = secret_key
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Ok(Self {
            secret_key,
            public_key_bytes,
        })
    }

    /// The uncompressed public point (65 bytes, leading 0x04).
    pub fn public_key(&self) -> &[u8] {
        &self.public_key_bytes
    }

    /// Derive the shared secret from the peer's uncompressed public point.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer key has the wrong length or encoding, or
    /// is not a point on the curve.
    pub fn derive_secret(&self, peer_public: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        if peer_public.len() != PUBLIC_KEY_LEN {
            return Err(Error::InvalidKeyLength(format!(
                "P-256 public key must be {} bytes (uncompressed), got {}",
                PUBLIC_KEY_LEN,
                peer_public.len()
            )));
        }
        if peer_public[0] != 0x04 {
            return Err(Error::InvalidPublicKey(
                "P-256 public key must use uncompressed form (0x04 prefix)".into(),
            ));
        }

        let peer_point = EncodedPoint::from_bytes(peer_public)
            .map_err(|_| Error::InvalidPublicKey("failed to parse P-256 point".into()))?;
        let peer_key = Option::<PublicKey>::from(PublicKey::from_encoded_point(&peer_point))
            .ok_or_else(|| Error::InvalidPublicKey("point is not on the curve".into()))?;

        let shared = diffie_hellman(self.secret_key.to_nonzero_scalar(), peer_key.as_affine());

        let mut result = [0u8; 32];
        result.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(Zeroizing::new(result))
    }
}

impl Default for EcdhState {
    fn default() -> Self {
        Self::new()
    }
}
