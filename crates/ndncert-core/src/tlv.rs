//! TLV wire primitives.
//!
//! Every protocol message is a tree of type-length-value blocks. Type and
//! length are variable-size non-negative numbers: one byte below 253, or a
//! marker byte (253/254/255) followed by a big-endian u16/u32/u64.
//! Integer values are minimal-length big-endian (1, 2, 4, or 8 bytes);
//! strings are UTF-8 without terminator.

use crate::{Error, Result};

/// Assigned TLV type numbers.
///
/// Stable within a deployment; peers must agree on these for interop.
pub mod types {
    /// Name (sequence of components).
    pub const NAME: u64 = 7;
    /// One generic name component.
    pub const GENERIC_NAME_COMPONENT: u64 = 8;
    /// Certificate content (public key bits).
    pub const CONTENT: u64 = 21;
    /// Certificate signature value.
    pub const SIGNATURE_VALUE: u64 = 23;
    /// Certificate key locator (a Name).
    pub const KEY_LOCATOR: u64 = 28;
    /// Certificate validity period.
    pub const VALIDITY_PERIOD: u64 = 253;
    /// Validity not-before (seconds since epoch).
    pub const NOT_BEFORE: u64 = 254;
    /// Validity not-after (seconds since epoch).
    pub const NOT_AFTER: u64 = 255;

    /// CA name prefix.
    pub const CA_PREFIX: u64 = 121;
    /// Free-form CA description.
    pub const CA_INFO: u64 = 123;
    /// One PROBE parameter key.
    pub const PARAMETER_KEY: u64 = 125;
    /// One PROBE/CHALLENGE parameter value.
    pub const PARAMETER_VALUE: u64 = 127;
    /// The CA's own certificate.
    pub const CA_CERTIFICATE: u64 = 129;
    /// Maximum certificate validity period (seconds).
    pub const MAX_VALIDITY_PERIOD: u64 = 131;
    /// Maximum suffix length granted under the CA prefix.
    pub const MAX_SUFFIX_LENGTH: u64 = 133;
    /// One PROBE name candidate.
    pub const PROBE_RESPONSE: u64 = 141;
    /// One PROBE redirect (another CA's certificate name).
    pub const PROBE_REDIRECT: u64 = 143;
    /// Ephemeral ECDH public key (uncompressed P-256 point).
    pub const ECDH_PUB: u64 = 145;
    /// Certificate request template (NEW/RENEW).
    pub const CERT_REQUEST: u64 = 147;
    /// Handshake salt (32 bytes).
    pub const SALT: u64 = 149;
    /// Request id (8 bytes).
    pub const REQUEST_ID: u64 = 151;
    /// One supported challenge type string.
    pub const CHALLENGE: u64 = 153;
    /// Session status.
    pub const STATUS: u64 = 155;
    /// Envelope initialization vector (16 bytes).
    pub const INITIAL_VECTOR: u64 = 157;
    /// Envelope ciphertext.
    pub const ENCRYPTED_PAYLOAD: u64 = 159;
    /// The challenge type the requester selected.
    pub const SELECTED_CHALLENGE: u64 = 161;
    /// Challenge-defined sub-state string.
    pub const CHALLENGE_STATUS: u64 = 163;
    /// Remaining challenge attempts.
    pub const REMAINING_TRIES: u64 = 165;
    /// Remaining session freshness (seconds).
    pub const REMAINING_TIME: u64 = 167;
    /// Name of the issued certificate.
    pub const ISSUED_CERT_NAME: u64 = 169;
    /// Wire error code.
    pub const ERROR_CODE: u64 = 171;
    /// Wire error diagnostic string.
    pub const ERROR_INFO: u64 = 173;
    /// Certificate to revoke (REVOKE).
    pub const CERT_TO_REVOKE: u64 = 177;
}

/// One decoded TLV element borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// TLV type number.
    pub typ: u64,
    /// Raw value bytes.
    pub value: &'a [u8],
}

impl<'a> Element<'a> {
    /// Parse every top-level element in `data`, consuming the whole buffer.
    pub fn parse_all(data: &'a [u8]) -> Result<Vec<Element<'a>>> {
        let mut elements = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let typ = read_var_number(data, &mut offset)?;
            let len = read_var_number(data, &mut offset)? as usize;
            if data.len() - offset < len {
                return Err(Error::InvalidTlv(format!(
                    "element of type {} claims {} value bytes, {} remain",
                    typ,
                    len,
                    data.len() - offset
                )));
            }
            elements.push(Element {
                typ,
                value: &data[offset..offset + len],
            });
            offset += len;
        }
        Ok(elements)
    }

    /// Interpret the value as a non-negative big-endian integer.
    pub fn as_uint(&self) -> Result<u64> {
        read_uint(self.value)
    }

    /// Interpret the value as UTF-8 text.
    pub fn as_str(&self) -> Result<&'a str> {
        core::str::from_utf8(self.value)
            .map_err(|_| Error::InvalidTlv(format!("type {} value is not UTF-8", self.typ)))
    }
}

/// Find the first element of `typ`, or fail with a decode error.
pub fn find<'a>(elements: &[Element<'a>], typ: u64) -> Result<Element<'a>> {
    elements
        .iter()
        .find(|e| e.typ == typ)
        .copied()
        .ok_or_else(|| Error::InvalidTlv(format!("missing required element of type {}", typ)))
}

/// Find the first element of `typ`, if present.
pub fn find_optional<'a>(elements: &[Element<'a>], typ: u64) -> Option<Element<'a>> {
    elements.iter().find(|e| e.typ == typ).copied()
}

/// Collect every element of `typ`, in order.
pub fn find_all<'a>(elements: &[Element<'a>], typ: u64) -> Vec<Element<'a>> {
    elements.iter().filter(|e| e.typ == typ).copied().collect()
}

/// Append a TLV block with a raw byte value.
pub fn write_tlv(buf: &mut Vec<u8>, typ: u64, value: &[u8]) {
    write_var_number(buf, typ);
    write_var_number(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

/// Append a TLV block carrying a minimal-length big-endian integer.
pub fn write_uint_tlv(buf: &mut Vec<u8>, typ: u64, value: u64) {
    let mut encoded = [0u8; 8];
    let bytes: &[u8] = if value <= u8::MAX as u64 {
        encoded[0] = value as u8;
        &encoded[..1]
    } else if value <= u16::MAX as u64 {
        encoded[..2].copy_from_slice(&(value as u16).to_be_bytes());
        &encoded[..2]
    } else if value <= u32::MAX as u64 {
        encoded[..4].copy_from_slice(&(value as u32).to_be_bytes());
        &encoded[..4]
    } else {
        encoded.copy_from_slice(&value.to_be_bytes());
        &encoded[..8]
    };
    write_tlv(buf, typ, bytes);
}

/// Append a TLV block carrying UTF-8 text.
pub fn write_str_tlv(buf: &mut Vec<u8>, typ: u64, value: &str) {
    write_tlv(buf, typ, value.as_bytes());
}

/// Decode a non-negative integer value (1, 2, 4, or 8 bytes, big-endian).
pub fn read_uint(value: &[u8]) -> Result<u64> {
    match value.len() {
        1 => Ok(value[0] as u64),
        2 => Ok(u16::from_be_bytes([value[0], value[1]]) as u64),
        4 => Ok(u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as u64),
        8 => Ok(u64::from_be_bytes([
            value[0], value[1], value[2], value[3], value[4], value[5], value[6], value[7],
        ])),
        n => Err(Error::InvalidTlv(format!(
            "non-negative integer must be 1, 2, 4, or 8 bytes, got {}",
            n
        ))),
    }
}

/// Append a variable-size number (used for both type and length).
pub fn write_var_number(buf: &mut Vec<u8>, n: u64) {
    if n < 253 {
        buf.push(n as u8);
    } else if n <= u16::MAX as u64 {
        buf.push(253);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= u32::MAX as u64 {
        buf.push(254);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(255);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Read a variable-size number, advancing `offset`.
pub fn read_var_number(data: &[u8], offset: &mut usize) -> Result<u64> {
    let first = *data
        .get(*offset)
        .ok_or_else(|| Error::InvalidTlv("truncated var-number".into()))?;
    *offset += 1;
    let (n, width) = match first {
        0..=252 => return Ok(first as u64),
        253 => (take(data, offset, 2)?, 2),
        254 => (take(data, offset, 4)?, 4),
        255 => (take(data, offset, 8)?, 8),
    };
    let mut value: u64 = 0;
    for &b in n {
        value = (value << 8) | b as u64;
    }
    // Reject non-minimal encodings so every value has one wire form.
    let minimal = match width {
        2 => value >= 253,
        4 => value > u16::MAX as u64,
        _ => value > u32::MAX as u64,
    };
    if !minimal {
        return Err(Error::InvalidTlv(format!(
            "non-minimal var-number encoding of {}",
            value
        )));
    }
    Ok(value)
}

fn take<'a>(data: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8]> {
    if data.len() - *offset < n {
        return Err(Error::InvalidTlv("truncated var-number".into()));
    }
    let slice = &data[*offset..*offset + n];
    *offset += n;
    Ok(slice)
}
