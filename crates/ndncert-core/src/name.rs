//! Hierarchical names.
//!
//! A [`Name`] is an ordered list of byte-string components. The URI form
//! separates components with `/` and percent-escapes bytes outside the
//! unreserved set, so names survive JSON configuration files and logs
//! losslessly. Names are hashable and serve as keys for sessions, issued
//! certificates, and profile lookups.

use crate::tlv::{self, types};
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A hierarchical name: an ordered sequence of byte-string components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<Vec<u8>>,
}

impl Name {
    /// The empty name `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the root name `/`.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The component at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.components.get(index).map(Vec::as_slice)
    }

    /// Append one component, returning the extended name.
    pub fn append(mut self, component: impl AsRef<[u8]>) -> Self {
        self.components.push(component.as_ref().to_vec());
        self
    }

    /// Append every component of `suffix`.
    pub fn join(mut self, suffix: &Name) -> Self {
        self.components.extend(suffix.components.iter().cloned());
        self
    }

    /// True if `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }

    /// The first `n` components as a new name.
    ///
    /// # Panics
    ///
    /// Panics if `n > self.len()`.
    pub fn prefix(&self, n: usize) -> Name {
        Name {
            components: self.components[..n].to_vec(),
        }
    }

    /// Position of the first component equal to `component`, if any.
    pub fn position(&self, component: &[u8]) -> Option<usize> {
        self.components.iter().position(|c| c == component)
    }

    /// Encode as a Name TLV block (type, length, component children).
    pub fn encode(&self) -> Vec<u8> {
        let mut inner = Vec::new();
        for component in &self.components {
            tlv::write_tlv(&mut inner, types::GENERIC_NAME_COMPONENT, component);
        }
        let mut buf = Vec::new();
        tlv::write_tlv(&mut buf, types::NAME, &inner);
        buf
    }

    /// Decode from the *value* of a Name TLV block.
    pub fn decode_value(value: &[u8]) -> Result<Self> {
        let mut components = Vec::new();
        for element in tlv::Element::parse_all(value)? {
            if element.typ != types::GENERIC_NAME_COMPONENT {
                return Err(Error::InvalidTlv(format!(
                    "unexpected type {} inside Name",
                    element.typ
                )));
            }
            components.push(element.value.to_vec());
        }
        Ok(Name { components })
    }

    /// Decode a full Name TLV block (type and length included).
    pub fn decode(data: &[u8]) -> Result<Self> {
        let elements = tlv::Element::parse_all(data)?;
        let name = tlv::find(&elements, types::NAME)?;
        Self::decode_value(name.value)
    }

    /// The URI form, e.g. `/ndn/edu/ucla`.
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

fn is_unescaped(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'@' | b'=' | b'+')
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/")?;
            for &byte in component {
                if is_unescaped(byte) {
                    write!(f, "{}", byte as char)?;
                } else {
                    write!(f, "%{:02X}", byte)?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        let trimmed = uri.trim().trim_start_matches('/');
        let mut components = Vec::new();
        if trimmed.is_empty() {
            return Ok(Name { components });
        }
        for part in trimmed.split('/') {
            if part.is_empty() {
                return Err(Error::InvalidTlv(format!("empty component in name {uri:?}")));
            }
            let mut component = Vec::with_capacity(part.len());
            let bytes = part.as_bytes();
            let mut i = 0;
            while i < bytes.len() {
                if bytes[i] == b'%' {
                    if bytes.len() < i + 3 {
                        return Err(Error::InvalidTlv(format!(
                            "truncated percent escape in {uri:?}"
                        )));
                    }
                    let hex = core::str::from_utf8(&bytes[i + 1..i + 3])
                        .ok()
                        .and_then(|h| u8::from_str_radix(h, 16).ok())
                        .ok_or_else(|| {
                            Error::InvalidTlv(format!("bad percent escape in {uri:?}"))
                        })?;
                    component.push(hex);
                    i += 3;
                } else {
                    component.push(bytes[i]);
                    i += 1;
                }
            }
            components.push(component);
        }
        Ok(Name { components })
    }
}

impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        uri.parse().map_err(serde::de::Error::custom)
    }
}
