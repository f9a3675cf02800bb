//! Certificate value type.
//!
//! Certificates are plain values: a name of the form
//! `/<identity>/KEY/<key-id>/<issuer>/<version>`, the holder's P-256 public
//! key in uncompressed SEC 1 form, a validity period, the signer's key
//! locator, and an ECDSA P-256/SHA-256 signature (DER) over the signed
//! portion. They are stored once (in the certificate store or a profile)
//! and referenced elsewhere by name.

use crate::name::Name;
use crate::tlv::{self, types};
use crate::{Error, Result};
use serde::Deserialize;

/// The reserved `KEY` name component.
pub const KEY_COMPONENT: &[u8] = b"KEY";

/// Issuer component used by CA-issued certificates.
pub const ISSUER_NDNCERT: &[u8] = b"NDNCERT";

/// Inclusive validity window, seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidityPeriod {
    /// First instant at which the certificate is valid.
    pub not_before: u64,
    /// Last instant at which the certificate is valid.
    pub not_after: u64,
}

impl ValidityPeriod {
    /// True if `at` falls inside the window.
    pub fn contains(&self, at: u64) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// A certificate binding a name to a public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Full certificate name.
    pub name: Name,
    /// Uncompressed SEC 1 P-256 public key (65 bytes).
    pub public_key: Vec<u8>,
    /// Validity window.
    pub validity: ValidityPeriod,
    /// Name of the signing key.
    pub key_locator: Name,
    /// DER-encoded ECDSA signature over [`Certificate::signed_portion`].
    pub signature: Vec<u8>,
}

impl Certificate {
    /// The identity this certificate names: everything before the `KEY`
    /// component, or the full name if there is none.
    pub fn identity(&self) -> Name {
        match self.name.position(KEY_COMPONENT) {
            Some(index) => self.name.prefix(index),
            None => self.name.clone(),
        }
    }

    /// The key id component (immediately after `KEY`), if present.
    pub fn key_id(&self) -> Option<&[u8]> {
        let index = self.name.position(KEY_COMPONENT)?;
        self.name.get(index + 1)
    }

    /// Bytes covered by the signature: name, public key, validity period,
    /// and key locator, in encoding order.
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut buf = self.name.encode();
        tlv::write_tlv(&mut buf, types::CONTENT, &self.public_key);
        let mut validity = Vec::new();
        tlv::write_uint_tlv(&mut validity, types::NOT_BEFORE, self.validity.not_before);
        tlv::write_uint_tlv(&mut validity, types::NOT_AFTER, self.validity.not_after);
        tlv::write_tlv(&mut buf, types::VALIDITY_PERIOD, &validity);
        let mut locator = Vec::new();
        locator.extend_from_slice(&self.key_locator.encode());
        tlv::write_tlv(&mut buf, types::KEY_LOCATOR, &locator);
        buf
    }

    /// Full TLV encoding: the signed portion followed by the signature.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = self.signed_portion();
        tlv::write_tlv(&mut buf, types::SIGNATURE_VALUE, &self.signature);
        buf
    }

    /// Decode a certificate from its TLV encoding.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let elements = tlv::Element::parse_all(data)?;

        let name = Name::decode_value(tlv::find(&elements, types::NAME)?.value)?;
        let public_key = tlv::find(&elements, types::CONTENT)?.value.to_vec();

        let validity_value = tlv::find(&elements, types::VALIDITY_PERIOD)?.value;
        let validity_elements = tlv::Element::parse_all(validity_value)?;
        let validity = ValidityPeriod {
            not_before: tlv::find(&validity_elements, types::NOT_BEFORE)?.as_uint()?,
            not_after: tlv::find(&validity_elements, types::NOT_AFTER)?.as_uint()?,
        };

        let locator_value = tlv::find(&elements, types::KEY_LOCATOR)?.value;
        let locator_elements = tlv::Element::parse_all(locator_value)?;
        let key_locator = Name::decode_value(tlv::find(&locator_elements, types::NAME)?.value)?;

        let signature = tlv::find(&elements, types::SIGNATURE_VALUE)?.value.to_vec();

        Ok(Certificate {
            name,
            public_key,
            validity,
            key_locator,
            signature,
        })
    }
}

// Certificates travel through JSON (profiles, file-backed stores) as the hex
// form of their TLV encoding, so the wire bytes stay canonical.
impl serde::Serialize for Certificate {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.encode()))
    }
}

impl<'de> serde::Deserialize<'de> for Certificate {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(serde::de::Error::custom)?;
        Certificate::decode(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Parse a certificate out of the value of a wrapping TLV element,
/// reporting `context` on failure.
pub fn decode_in(value: &[u8], context: &str) -> Result<Certificate> {
    Certificate::decode(value)
        .map_err(|e| Error::InvalidTlv(format!("bad certificate in {context}: {e}")))
}
