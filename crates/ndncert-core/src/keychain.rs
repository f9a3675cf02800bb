//! Signing seam and the in-memory key chain.
//!
//! The engines never touch private keys directly: outbound replies are
//! signed through the [`Signer`] trait, and inbound signatures are checked
//! against certificate public keys with [`verify`]. Hosts with a real key
//! store implement `Signer`; the provided [`KeyChain`] keeps P-256 keys in
//! memory and is what the CA host and the tests use.

use crate::cert::{Certificate, ValidityPeriod, KEY_COMPONENT};
use crate::name::Name;
use crate::request::now_unix;
use crate::{Error, Result};
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use std::collections::HashMap;

/// Signs protocol replies and certificates on behalf of the engine.
pub trait Signer: Send + Sync {
    /// Sign `data` with the key named by `key_locator`.
    ///
    /// Returns the DER-encoded ECDSA signature.
    fn sign(&self, data: &[u8], key_locator: &Name) -> Result<Vec<u8>>;
}

/// Verify `signature` over `data` against the public key in `cert`.
///
/// Returns `false` for any malformed key, malformed signature, or failed
/// verification; nothing here is an error the caller can act on.
pub fn verify(data: &[u8], signature: &[u8], cert: &Certificate) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(&cert.public_key) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(signature) else {
        return false;
    };
    key.verify(data, &sig).is_ok()
}

/// Verify a certificate's own signature against its embedded public key.
///
/// Request templates and self-signed CA certificates are checked this way;
/// issued certificates are checked against the CA certificate instead.
pub fn verify_self_signed(cert: &Certificate) -> bool {
    verify(&cert.signed_portion(), &cert.signature, cert)
}

/// An in-memory P-256 key chain.
///
/// Keys are indexed by their key name (`/<identity>/KEY/<key-id>`). The
/// chain is mutable while identities are being created and then shared
/// immutably with the engines.
#[derive(Default)]
pub struct KeyChain {
    keys: HashMap<Name, SigningKey>,
}

impl KeyChain {
    /// An empty key chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an identity with a fresh key and return its self-signed
    /// certificate (`/<identity>/KEY/<key-id>/self/v=<n>`), valid for ten
    /// years.
    pub fn create_identity(&mut self, identity: &Name) -> Result<Certificate> {
        let now = now_unix();
        let validity = ValidityPeriod {
            not_before: now,
            not_after: now + 10 * 365 * 86_400,
        };
        self.make_certificate(identity, b"self", validity)
    }

    /// Create a fresh key under `identity` and return a self-signed
    /// certificate request template
    /// (`/<identity>/KEY/<key-id>/cert-request/v=<n>`) with the given
    /// validity window.
    pub fn make_cert_request(
        &mut self,
        identity: &Name,
        validity: ValidityPeriod,
    ) -> Result<Certificate> {
        self.make_certificate(identity, b"cert-request", validity)
    }

    fn make_certificate(
        &mut self,
        identity: &Name,
        issuer: &[u8],
        validity: ValidityPeriod,
    ) -> Result<Certificate> {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let public_key = VerifyingKey::from(&signing_key)
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let key_id = ndncert_crypto::rng::random_array::<8>();
        let key_name = identity.clone().append(KEY_COMPONENT).append(key_id);
        let version = format!("v={}", u64::from_be_bytes(ndncert_crypto::rng::random_array()));
        let name = key_name.clone().append(issuer).append(version.as_bytes());

        let mut cert = Certificate {
            name,
            public_key,
            validity,
            key_locator: key_name.clone(),
            signature: Vec::new(),
        };
        let signature: Signature = signing_key.sign(&cert.signed_portion());
        cert.signature = signature.to_der().as_bytes().to_vec();

        self.keys.insert(key_name, signing_key);
        Ok(cert)
    }

    /// True if the chain holds the key named by `key_name`.
    pub fn has_key(&self, key_name: &Name) -> bool {
        self.keys.contains_key(key_name)
    }
}

impl Signer for KeyChain {
    fn sign(&self, data: &[u8], key_locator: &Name) -> Result<Vec<u8>> {
        let key = self.keys.get(key_locator).ok_or_else(|| {
            Error::Signing(format!("no key for locator {}", key_locator))
        })?;
        let signature: Signature = key.sign(data);
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
