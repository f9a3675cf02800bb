//! CHALLENGE parameters and response content (plaintext forms).
//!
//! Both directions travel inside the encrypted envelope; these functions
//! encode and decode the inner TLV bytes only.

use crate::name::Name;
use crate::request::Status;
use crate::tlv::{self, types};
use crate::{Error, Result};

use super::{read_parameter_pairs, write_parameter_pairs};

/// Decoded CHALLENGE response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeContent {
    /// Session status after the module step.
    pub status: Status,
    /// Challenge-defined sub-state string.
    pub challenge_status: String,
    /// Attempts still accepted.
    pub remaining_tries: u64,
    /// Seconds of session freshness remaining.
    pub remaining_time: u64,
    /// Name of the issued certificate, present on success.
    pub issued_cert_name: Option<Name>,
}

/// Encode CHALLENGE application parameters: the selected challenge type and
/// its module-defined `(key, value)` pairs.
pub fn encode_application_parameters(selected: &str, params: &[(String, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    tlv::write_str_tlv(&mut buf, types::SELECTED_CHALLENGE, selected);
    write_parameter_pairs(&mut buf, params);
    buf
}

/// Decode CHALLENGE application parameters.
pub fn decode_application_parameters(data: &[u8]) -> Result<(String, Vec<(String, String)>)> {
    let elements = tlv::Element::parse_all(data)?;
    let selected = tlv::find(&elements, types::SELECTED_CHALLENGE)?
        .as_str()?
        .to_string();
    let params = read_parameter_pairs(&elements)?;
    Ok((selected, params))
}

/// Encode CHALLENGE response content.
pub fn encode_data_content(
    status: Status,
    challenge_status: &str,
    remaining_tries: u64,
    remaining_time: u64,
    issued_cert_name: Option<&Name>,
) -> Vec<u8> {
    let mut buf = Vec::new();
    tlv::write_uint_tlv(&mut buf, types::STATUS, status.to_u64());
    tlv::write_str_tlv(&mut buf, types::CHALLENGE_STATUS, challenge_status);
    tlv::write_uint_tlv(&mut buf, types::REMAINING_TRIES, remaining_tries);
    tlv::write_uint_tlv(&mut buf, types::REMAINING_TIME, remaining_time);
    if let Some(name) = issued_cert_name {
        tlv::write_tlv(&mut buf, types::ISSUED_CERT_NAME, &name.encode());
    }
    buf
}

/// Decode CHALLENGE response content.
pub fn decode_data_content(data: &[u8]) -> Result<ChallengeContent> {
    let elements = tlv::Element::parse_all(data)?;

    let status_value = tlv::find(&elements, types::STATUS)?.as_uint()?;
    let status = Status::from_u64(status_value)
        .ok_or_else(|| Error::InvalidTlv(format!("unknown status {}", status_value)))?;
    let challenge_status = tlv::find(&elements, types::CHALLENGE_STATUS)?
        .as_str()?
        .to_string();
    let remaining_tries = tlv::find(&elements, types::REMAINING_TRIES)?.as_uint()?;
    let remaining_time = tlv::find(&elements, types::REMAINING_TIME)?.as_uint()?;
    let issued_cert_name = tlv::find_optional(&elements, types::ISSUED_CERT_NAME)
        .map(|e| Name::decode(e.value))
        .transpose()?;

    Ok(ChallengeContent {
        status,
        challenge_status,
        remaining_tries,
        remaining_time,
        issued_cert_name,
    })
}
