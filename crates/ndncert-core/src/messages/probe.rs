//! PROBE parameters and response content.

use crate::name::Name;
use crate::tlv::{self, types};
use crate::Result;

use super::{read_parameter_pairs, write_parameter_pairs};

/// Encode PROBE application parameters: `(key, value)` pairs.
pub fn encode_application_parameters(params: &[(String, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_parameter_pairs(&mut buf, params);
    buf
}

/// Decode PROBE application parameters.
pub fn decode_application_parameters(data: &[u8]) -> Result<Vec<(String, String)>> {
    let elements = tlv::Element::parse_all(data)?;
    read_parameter_pairs(&elements)
}

/// Encode PROBE response content.
///
/// Each candidate is a name the requester may apply for, paired with the
/// suffix budget still available below it; each redirect is the full name
/// of another CA's certificate. Both lists may be non-empty at once and
/// the requester chooses between them.
pub fn encode_data_content(candidates: &[(Name, Option<u64>)], redirects: &[Name]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (name, max_suffix_length) in candidates {
        let mut inner = name.encode();
        if let Some(max) = max_suffix_length {
            tlv::write_uint_tlv(&mut inner, types::MAX_SUFFIX_LENGTH, *max);
        }
        tlv::write_tlv(&mut buf, types::PROBE_RESPONSE, &inner);
    }
    for name in redirects {
        tlv::write_tlv(&mut buf, types::PROBE_REDIRECT, &name.encode());
    }
    buf
}

/// Decode PROBE response content into `(candidates, redirects)`.
pub fn decode_data_content(data: &[u8]) -> Result<(Vec<(Name, Option<u64>)>, Vec<Name>)> {
    let elements = tlv::Element::parse_all(data)?;

    let mut candidates = Vec::new();
    for entry in tlv::find_all(&elements, types::PROBE_RESPONSE) {
        let inner = tlv::Element::parse_all(entry.value)?;
        let name = Name::decode_value(tlv::find(&inner, types::NAME)?.value)?;
        let max_suffix_length = tlv::find_optional(&inner, types::MAX_SUFFIX_LENGTH)
            .map(|e| e.as_uint())
            .transpose()?;
        candidates.push((name, max_suffix_length));
    }

    let mut redirects = Vec::new();
    for entry in tlv::find_all(&elements, types::PROBE_REDIRECT) {
        redirects.push(Name::decode(entry.value)?);
    }

    Ok((candidates, redirects))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_roundtrip() {
        let params = vec![
            ("key1".to_string(), "value1".to_string()),
            ("key2".to_string(), "value2".to_string()),
        ];
        let encoded = encode_application_parameters(&params);
        assert_eq!(decode_application_parameters(&encoded).unwrap(), params);
    }

    #[test]
    fn test_value_without_key_rejected() {
        let mut buf = Vec::new();
        tlv::write_str_tlv(&mut buf, types::PARAMETER_VALUE, "orphan");
        assert!(decode_application_parameters(&buf).is_err());
    }

    #[test]
    fn test_trailing_key_rejected() {
        let mut buf = Vec::new();
        tlv::write_str_tlv(&mut buf, types::PARAMETER_KEY, "dangling");
        assert!(decode_application_parameters(&buf).is_err());
    }

    #[test]
    fn test_data_content_roundtrip() {
        let candidates = vec![
            ("/ndn/1".parse().unwrap(), Some(2)),
            ("/ndn/2".parse().unwrap(), Some(2)),
        ];
        let redirects: Vec<Name> = vec![
            "/ndn/edu/ucla/KEY/%08%98/self/v=1646441513929".parse().unwrap(),
            "/ndn/edu/memphis/KEY/%01%02/self/v=17".parse().unwrap(),
        ];

        let content = encode_data_content(&candidates, &redirects);
        let (decoded_candidates, decoded_redirects) = decode_data_content(&content).unwrap();

        assert_eq!(decoded_candidates, candidates);
        assert_eq!(decoded_redirects, redirects);
    }

    #[test]
    fn test_candidates_without_suffix_budget() {
        let candidates = vec![("/ndn/example".parse().unwrap(), None)];
        let content = encode_data_content(&candidates, &[]);
        let (decoded, redirects) = decode_data_content(&content).unwrap();
        assert_eq!(decoded, candidates);
        assert!(redirects.is_empty());
    }

    #[test]
    fn test_empty_content() {
        let (candidates, redirects) = decode_data_content(&[]).unwrap();
        assert!(candidates.is_empty());
        assert!(redirects.is_empty());
    }
}
