//! NEW/RENEW/REVOKE parameters and handshake response content.
//!
//! The three request types share one wire shape and differ only in which
//! certificate block they carry: a request template (NEW/RENEW) or the
//! certificate being revoked (REVOKE).

use crate::cert::{self, Certificate};
use crate::request::{RequestType, Status};
use crate::tlv::{self, types};
use crate::{Error, Result};

/// Decoded handshake response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The CA's ephemeral ECDH public key.
    pub ecdh_pub: Vec<u8>,
    /// The CA-chosen HKDF salt.
    pub salt: [u8; 32],
    /// The derived request id, echoed for confirmation.
    pub request_id: [u8; 8],
    /// Session status (always `BeforeChallenge` from a conforming CA).
    pub status: Status,
    /// Challenge types the CA will accept.
    pub challenges: Vec<String>,
}

fn cert_block_type(request_type: RequestType) -> u64 {
    match request_type {
        RequestType::New | RequestType::Renew => types::CERT_REQUEST,
        RequestType::Revoke => types::CERT_TO_REVOKE,
    }
}

/// Encode request application parameters: the requester's ephemeral public
/// key plus the certificate block for this request type.
pub fn encode_application_parameters(
    request_type: RequestType,
    ecdh_pub: &[u8],
    certificate: &Certificate,
) -> Vec<u8> {
    let mut buf = Vec::new();
    tlv::write_tlv(&mut buf, types::ECDH_PUB, ecdh_pub);
    tlv::write_tlv(&mut buf, cert_block_type(request_type), &certificate.encode());
    buf
}

/// Decode request application parameters.
pub fn decode_application_parameters(
    data: &[u8],
    request_type: RequestType,
) -> Result<(Vec<u8>, Certificate)> {
    let elements = tlv::Element::parse_all(data)?;
    let ecdh_pub = tlv::find(&elements, types::ECDH_PUB)?.value.to_vec();
    let block = tlv::find(&elements, cert_block_type(request_type))?;
    let certificate = cert::decode_in(block.value, request_type.verb())?;
    Ok((ecdh_pub, certificate))
}

/// Encode handshake response content.
pub fn encode_data_content(
    ecdh_pub: &[u8],
    salt: &[u8; 32],
    request_id: &[u8; 8],
    status: Status,
    challenges: &[String],
) -> Vec<u8> {
    let mut buf = Vec::new();
    tlv::write_tlv(&mut buf, types::ECDH_PUB, ecdh_pub);
    tlv::write_tlv(&mut buf, types::SALT, salt);
    tlv::write_tlv(&mut buf, types::REQUEST_ID, request_id);
    tlv::write_uint_tlv(&mut buf, types::STATUS, status.to_u64());
    for challenge in challenges {
        tlv::write_str_tlv(&mut buf, types::CHALLENGE, challenge);
    }
    buf
}

/// Decode handshake response content.
pub fn decode_data_content(data: &[u8]) -> Result<HandshakeResponse> {
    let elements = tlv::Element::parse_all(data)?;

    let ecdh_pub = tlv::find(&elements, types::ECDH_PUB)?.value.to_vec();

    let salt_value = tlv::find(&elements, types::SALT)?.value;
    let salt: [u8; 32] = salt_value
        .try_into()
        .map_err(|_| Error::InvalidTlv(format!("salt must be 32 bytes, got {}", salt_value.len())))?;

    let id_value = tlv::find(&elements, types::REQUEST_ID)?.value;
    let request_id: [u8; 8] = id_value.try_into().map_err(|_| {
        Error::InvalidTlv(format!("request id must be 8 bytes, got {}", id_value.len()))
    })?;

    let status_value = tlv::find(&elements, types::STATUS)?.as_uint()?;
    let status = Status::from_u64(status_value)
        .ok_or_else(|| Error::InvalidTlv(format!("unknown status {}", status_value)))?;

    let challenges = tlv::find_all(&elements, types::CHALLENGE)
        .iter()
        .map(|e| e.as_str().map(str::to_string))
        .collect::<Result<Vec<_>>>()?;

    Ok(HandshakeResponse {
        ecdh_pub,
        salt,
        request_id,
        status,
        challenges,
    })
}
