//! Message encoders and decoders.
//!
//! One module per interaction, each exposing `encode_*`/`decode_*` pairs
//! over raw TLV byte buffers. Application parameters are what the requester
//! sends; data content is what the CA replies with. CHALLENGE traffic is
//! encoded here in plaintext form and protected by [`envelope`].

pub mod challenge;
pub mod envelope;
pub mod error;
pub mod info;
pub mod new_renew_revoke;
pub mod probe;

/// Encode a flat `(ParameterKey, ParameterValue)` pair list.
pub(crate) fn write_parameter_pairs(buf: &mut Vec<u8>, params: &[(String, String)]) {
    use crate::tlv::{types, write_str_tlv};
    for (key, value) in params {
        write_str_tlv(buf, types::PARAMETER_KEY, key);
        write_str_tlv(buf, types::PARAMETER_VALUE, value);
    }
}

/// Decode a flat pair list: keys and values must strictly alternate.
pub(crate) fn read_parameter_pairs(
    elements: &[crate::tlv::Element<'_>],
) -> crate::Result<Vec<(String, String)>> {
    use crate::tlv::types;
    use crate::Error;

    let mut pairs = Vec::new();
    let mut pending_key: Option<String> = None;
    for element in elements {
        match element.typ {
            types::PARAMETER_KEY => {
                if pending_key.is_some() {
                    return Err(Error::InvalidTlv("parameter key without value".into()));
                }
                pending_key = Some(element.as_str()?.to_string());
            }
            types::PARAMETER_VALUE => {
                let key = pending_key.take().ok_or_else(|| {
                    Error::InvalidTlv("parameter value without key".into())
                })?;
                pairs.push((key, element.as_str()?.to_string()));
            }
            _ => {}
        }
    }
    if pending_key.is_some() {
        return Err(Error::InvalidTlv("trailing parameter key".into()));
    }
    Ok(pairs)
}
