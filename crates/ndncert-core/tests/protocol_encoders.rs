//! Cross-module encoder scenarios: composed messages, envelope flows, and
//! wire shapes the unit suites do not cover in combination.

use ndncert_core::cert::ValidityPeriod;
use ndncert_core::keychain::KeyChain;
use ndncert_core::messages::{challenge, envelope, error as error_msg, info, new_renew_revoke, probe};
use ndncert_core::request::Status;
use ndncert_core::{ErrorCode, Name};
use ndncert_crypto::{kdf, EcdhState};

fn name(uri: &str) -> Name {
    uri.parse().unwrap()
}

#[test]
fn test_info_content_carries_certificate() {
    let mut chain = KeyChain::new();
    let ca_cert = chain.create_identity(&name("/ndn")).unwrap();

    let profile = ndncert_core::config::CaProfile {
        ca_prefix: name("/ndn"),
        ca_info: "ndn testbed ca".to_string(),
        probe_parameter_keys: vec!["full name".to_string()],
        max_validity_period: 864_000,
        max_suffix_length: Some(3),
        forwarding_hint: None,
        cert: None,
        supported_challenges: vec!["pin".to_string()],
    };
    let decoded = info::decode_data_content(&info::encode_data_content(&profile, &ca_cert)).unwrap();

    assert_eq!(decoded.cert.unwrap().encode(), ca_cert.encode());
    assert_eq!(decoded.ca_prefix, profile.ca_prefix);
    assert_eq!(decoded.max_validity_period, profile.max_validity_period);
}

#[test]
fn test_error_content_replaces_normal_content() {
    let error_content = error_msg::encode_data_content(ErrorCode::NameNotAllowed, "Just to test");
    let (code, info) = error_msg::decode_data_content(&error_content).unwrap();
    assert_eq!(code, ErrorCode::NameNotAllowed);
    assert_eq!(info, "Just to test");

    // A handshake content block is not mistaken for an error.
    let handshake = new_renew_revoke::encode_data_content(
        EcdhState::new().public_key(),
        &[101u8; 32],
        &[102u8; 8],
        Status::BeforeChallenge,
        &["abc".to_string(), "def".to_string()],
    );
    assert!(error_msg::try_decode(&handshake).unwrap().is_none());
}

#[test]
fn test_probe_content_with_redirects_only() {
    let redirects = vec![name("/ndn/edu/ucla/KEY/%01/self/v=1")];
    let content = probe::encode_data_content(&[], &redirects);
    let (candidates, decoded_redirects) = probe::decode_data_content(&content).unwrap();
    assert!(candidates.is_empty());
    assert_eq!(decoded_redirects, redirects);
}

#[test]
fn test_request_parameters_roundtrip_with_real_template() {
    let mut chain = KeyChain::new();
    let template = chain
        .make_cert_request(
            &name("/ndn/zhiyi"),
            ValidityPeriod {
                not_before: 1_700_000_000,
                not_after: 1_700_086_400,
            },
        )
        .unwrap();
    let ecdh = EcdhState::new();

    for request_type in [
        ndncert_core::RequestType::New,
        ndncert_core::RequestType::Renew,
        ndncert_core::RequestType::Revoke,
    ] {
        let params = new_renew_revoke::encode_application_parameters(
            request_type,
            ecdh.public_key(),
            &template,
        );
        let (pub_bytes, decoded) =
            new_renew_revoke::decode_application_parameters(&params, request_type).unwrap();
        assert_eq!(pub_bytes, ecdh.public_key());
        assert_eq!(decoded, template);
    }
}

#[test]
fn test_handshake_derivations_agree_across_the_wire() {
    // Requester and CA sides run the encode/decode path end to end and
    // land on the same key and request id.
    let requester = EcdhState::new();
    let ca = EcdhState::new();
    let salt = [0x5au8; 32];

    let ca_shared = ca.derive_secret(requester.public_key()).unwrap();
    let request_id = kdf::derive_request_id(ca_shared.as_slice(), &salt).unwrap();
    let content = new_renew_revoke::encode_data_content(
        ca.public_key(),
        &salt,
        &request_id,
        Status::BeforeChallenge,
        &["pin".to_string()],
    );

    let response = new_renew_revoke::decode_data_content(&content).unwrap();
    let requester_shared = requester.derive_secret(&response.ecdh_pub).unwrap();
    assert_eq!(
        kdf::derive_request_id(requester_shared.as_slice(), &response.salt).unwrap(),
        response.request_id
    );
    assert_eq!(
        *kdf::derive_session_key(requester_shared.as_slice(), &response.salt).unwrap(),
        *kdf::derive_session_key(ca_shared.as_slice(), &salt).unwrap()
    );
}

#[test]
fn test_challenge_round_through_envelope() {
    let key = [0x17u8; 16];
    let mut sender = 0u32;
    let mut receiver = 0u32;

    let plaintext = challenge::encode_application_parameters(
        "pin",
        &[("code".to_string(), "123456".to_string())],
    );
    let sealed = envelope::seal(&key, &mut sender, &plaintext).unwrap();
    let opened = envelope::open(&key, &mut receiver, &sealed).unwrap();
    let (selected, params) = challenge::decode_application_parameters(&opened).unwrap();

    assert_eq!(selected, "pin");
    assert_eq!(params, vec![("code".to_string(), "123456".to_string())]);
    assert_eq!(sender, receiver);
}

#[test]
fn test_challenge_content_with_issued_name() {
    let issued = name("/ndn/akdnsla/a/b/c");
    let content = challenge::encode_data_content(Status::Pending, "Just a test", 3, 321, Some(&issued));
    let decoded = challenge::decode_data_content(&content).unwrap();

    assert_eq!(decoded.status, Status::Pending);
    assert_eq!(decoded.challenge_status, "Just a test");
    assert_eq!(decoded.remaining_tries, 3);
    assert_eq!(decoded.remaining_time, 321);
    assert_eq!(decoded.issued_cert_name, Some(issued));
}

#[test]
fn test_encrypted_error_travels_inside_envelope() {
    let key = [0x33u8; 16];
    let mut counter = 0u32;

    let error_content = error_msg::encode_data_content(ErrorCode::OutOfTries, "no more");
    let sealed = envelope::seal(&key, &mut counter, &error_content).unwrap();
    let opened = envelope::open(&key, &mut counter, &sealed).unwrap();

    let (code, info) = error_msg::decode_data_content(&opened).unwrap();
    assert_eq!(code, ErrorCode::OutOfTries);
    assert_eq!(info, "no more");
}
