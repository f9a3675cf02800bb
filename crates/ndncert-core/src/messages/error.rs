//! Error content: `ErrorCode` + `ErrorInfo`.
//!
//! Error content may replace any normal response; receivers probe for it
//! with [`try_decode`] before decoding the expected shape.

use crate::tlv::{self, types};
use crate::{Error, ErrorCode, Result};

/// Encode Error content.
pub fn encode_data_content(code: ErrorCode, info: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    tlv::write_uint_tlv(&mut buf, types::ERROR_CODE, code.to_u64());
    tlv::write_str_tlv(&mut buf, types::ERROR_INFO, info);
    buf
}

/// Decode Error content.
pub fn decode_data_content(data: &[u8]) -> Result<(ErrorCode, String)> {
    try_decode(data)?.ok_or_else(|| Error::InvalidTlv("not an error content".into()))
}

/// Decode Error content if `data` carries one; `Ok(None)` otherwise.
pub fn try_decode(data: &[u8]) -> Result<Option<(ErrorCode, String)>> {
    let elements = tlv::Element::parse_all(data)?;
    let Some(code_element) = tlv::find_optional(&elements, types::ERROR_CODE) else {
        return Ok(None);
    };
    let code_value = code_element.as_uint()?;
    let code = ErrorCode::from_u64(code_value)
        .ok_or_else(|| Error::InvalidTlv(format!("unknown error code {}", code_value)))?;
    let info = tlv::find(&elements, types::ERROR_INFO)?.as_str()?.to_string();
    Ok(Some((code, info)))
}
