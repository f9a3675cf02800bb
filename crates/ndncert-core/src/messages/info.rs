//! INFO response content: the CA's published profile.

use crate::cert;
use crate::config::CaProfile;
use crate::tlv::{self, types};
use crate::Result;

/// Encode the signed INFO content from a profile and the CA certificate.
pub fn encode_data_content(profile: &CaProfile, ca_cert: &cert::Certificate) -> Vec<u8> {
    let mut buf = Vec::new();
    tlv::write_tlv(&mut buf, types::CA_PREFIX, &profile.ca_prefix.encode());
    tlv::write_str_tlv(&mut buf, types::CA_INFO, &profile.ca_info);
    for key in &profile.probe_parameter_keys {
        tlv::write_str_tlv(&mut buf, types::PARAMETER_KEY, key);
    }
    tlv::write_uint_tlv(&mut buf, types::MAX_VALIDITY_PERIOD, profile.max_validity_period);
    if let Some(max) = profile.max_suffix_length {
        tlv::write_uint_tlv(&mut buf, types::MAX_SUFFIX_LENGTH, max);
    }
    tlv::write_tlv(&mut buf, types::CA_CERTIFICATE, &ca_cert.encode());
    buf
}

/// Decode INFO content into a profile (certificate included).
pub fn decode_data_content(data: &[u8]) -> Result<CaProfile> {
    let elements = tlv::Element::parse_all(data)?;

    let ca_prefix = crate::Name::decode(tlv::find(&elements, types::CA_PREFIX)?.value)?;
    let ca_info = tlv::find(&elements, types::CA_INFO)?.as_str()?.to_string();
    let probe_parameter_keys = tlv::find_all(&elements, types::PARAMETER_KEY)
        .iter()
        .map(|e| e.as_str().map(str::to_string))
        .collect::<Result<Vec<_>>>()?;
    let max_validity_period = tlv::find(&elements, types::MAX_VALIDITY_PERIOD)?.as_uint()?;
    let max_suffix_length = tlv::find_optional(&elements, types::MAX_SUFFIX_LENGTH)
        .map(|e| e.as_uint())
        .transpose()?;
    let ca_certificate = tlv::find(&elements, types::CA_CERTIFICATE)?;
    let certificate = cert::decode_in(ca_certificate.value, "INFO content")?;

    Ok(CaProfile {
        ca_prefix,
        ca_info,
        probe_parameter_keys,
        max_validity_period,
        max_suffix_length,
        forwarding_hint: None,
        cert: Some(certificate),
        supported_challenges: Vec::new(),
    })
}
