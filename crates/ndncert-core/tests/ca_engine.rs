//! End-to-end CA engine scenarios, driving both engines against each other.

use std::sync::Arc;

use ndncert_core::ca::CaEngine;
use ndncert_core::cert::{Certificate, ValidityPeriod};
use ndncert_core::challenge::{pin, ChallengeRegistry, NoopDelivery};
use ndncert_core::config::{CaConfig, CaProfile};
use ndncert_core::keychain::KeyChain;
use ndncert_core::messages::{error as error_msg, info};
use ndncert_core::request::{now_unix, RequestState, RequestType, Status};
use ndncert_core::requester::{
    self, gen_request_parameters, on_challenge_response, on_new_renew_revoke_response,
    select_or_continue_challenge,
};
use ndncert_core::store::MemoryStore;
use ndncert_core::{ErrorCode, Name};

const CONFIG_1: &str = r#"{
    "ca-prefix": "/ndn",
    "ca-info": "ndn testbed ca",
    "max-validity-period": 864000,
    "max-suffix-length": 3,
    "probe-parameters": ["full name"],
    "supported-challenges": [{"type": "pin"}, {"type": "email"}]
}"#;

const CONFIG_5: &str = r#"{
    "ca-prefix": "/ndn",
    "ca-info": "redirecting ca",
    "max-suffix-length": 2,
    "supported-challenges": [{"type": "pin"}],
    "redirection": [
        "/ndn/edu/ucla/KEY/m%08%98%C2xNZ%13/self/v=1646441513929",
        "/ndn/edu/memphis/KEY/%A1%B2/self/v=1646441513930"
    ],
    "name-assignment": [
        {"function": "param", "format": ["group", "email"]},
        {"function": "param", "format": ["group", "name"]},
        {"function": "random"}
    ]
}"#;

fn make_ca(config_json: &str) -> CaEngine {
    let registry = ChallengeRegistry::with_builtins();
    let config = CaConfig::from_json(config_json, &registry).expect("config loads");
    let mut keychain = KeyChain::new();
    let ca_cert = keychain
        .create_identity(&config.profile.ca_prefix.clone())
        .expect("ca identity");
    CaEngine::new(
        config,
        ca_cert,
        Arc::new(keychain),
        Box::new(MemoryStore::new()),
        ChallengeRegistry::with_builtins(),
        Box::new(NoopDelivery),
    )
    .expect("engine assembles")
}

fn requester_profile(ca: &CaEngine) -> CaProfile {
    let mut profile = ca.profile().clone();
    profile.cert = Some(ca.ca_cert().clone());
    profile
}

fn name(uri: &str) -> Name {
    uri.parse().unwrap()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn day_template(chain: &mut KeyChain, identity: &str) -> Certificate {
    let now = now_unix();
    chain
        .make_cert_request(
            &name(identity),
            ValidityPeriod {
                not_before: now,
                not_after: now + 86_400,
            },
        )
        .unwrap()
}

#[test]
fn test_info() {
    let mut ca = make_ca(CONFIG_1);
    let reply = ca.handle(&name("/ndn/CA/INFO"), &[]).unwrap();

    assert!(reply.verify(ca.ca_cert()));
    let decoded = info::decode_data_content(&reply.content).unwrap();
    assert_eq!(decoded.ca_prefix, name("/ndn"));
    assert_eq!(decoded.ca_info, "ndn testbed ca");
    assert_eq!(decoded.probe_parameter_keys, vec!["full name"]);
    assert_eq!(decoded.max_validity_period, 864_000);
    assert_eq!(decoded.max_suffix_length, Some(3));
    assert_eq!(decoded.cert.as_ref().unwrap(), ca.ca_cert());
}

#[test]
fn test_probe_with_parameters() {
    let mut ca = make_ca(CONFIG_5);
    let params = ndncert_core::messages::probe::encode_application_parameters(&pairs(&[
        ("email", "1@1.edu"),
        ("group", "irl"),
        ("name", "ndncert"),
    ]));
    let reply = ca.handle(&name("/ndn/CA/PROBE"), &params).unwrap();
    assert!(reply.verify(ca.ca_cert()));

    let (candidates, redirects) =
        ndncert_core::messages::probe::decode_data_content(&reply.content).unwrap();
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[0].0, name("/ndn/irl/1@1.edu"));
    assert_eq!(candidates[1].0, name("/ndn/irl/ndncert"));
    // Third candidate is the random strategy: one component under the prefix.
    assert_eq!(candidates[2].0.len(), 2);
    for (_, budget) in &candidates {
        assert_eq!(*budget, Some(2));
    }
    assert_eq!(redirects.len(), 2);
    assert_eq!(
        redirects[0],
        name("/ndn/edu/ucla/KEY/m%08%98%C2xNZ%13/self/v=1646441513929")
    );
}

#[test]
fn test_probe_missing_required_parameter() {
    let mut ca = make_ca(CONFIG_1);
    // CONFIG_1 requires the "full name" key.
    let params = ndncert_core::messages::probe::encode_application_parameters(&pairs(&[(
        "name", "zhiyi",
    )]));
    let reply = ca.handle(&name("/ndn/CA/PROBE"), &params).unwrap();

    let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
    assert_eq!(code, ErrorCode::BadInterestFormat);
}

#[test]
fn test_new_handshake() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/zhiyi");

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
    let params = gen_request_parameters(&ctx, &template);
    let reply = ca.handle(&ctx.request_name(), &params).unwrap();
    assert!(reply.verify(ca.ca_cert()));

    let challenges = on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
    assert!(!challenges.is_empty());
    assert_eq!(ctx.status, Some(Status::BeforeChallenge));

    // Both sides hold the same session key.
    let request_id = ctx.request_id.unwrap();
    let stored = ca.store().get_request(&request_id).unwrap();
    assert_eq!(&stored.encryption_key, ctx.session_key().unwrap());
    assert_eq!(stored.status, Status::BeforeChallenge);
}

#[test]
fn test_new_with_invalid_validity_periods() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let now = now_unix();

    let cases = [
        // not-after precedes not-before
        ValidityPeriod {
            not_before: now,
            not_after: now - 3_600,
        },
        // 361 days, far beyond the 10-day maximum
        ValidityPeriod {
            not_before: now,
            not_after: now + 361 * 86_400,
        },
        // not-before one hour in the past
        ValidityPeriod {
            not_before: now - 3_600,
            not_after: now + 7_200,
        },
    ];
    for validity in cases {
        let template = chain.make_cert_request(&name("/ndn/zhiyi"), validity).unwrap();
        let ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
        let reply = ca
            .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
            .unwrap();

        let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
        assert_ne!(code, ErrorCode::NoError);
    }
    assert!(ca.store().list_requests().unwrap().is_empty());
}

#[test]
fn test_new_with_bad_suffix_length() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();

    // Within the limit of 3.
    for identity in ["/ndn/a", "/ndn/a/b"] {
        let template = day_template(&mut chain, identity);
        let ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
        let reply = ca
            .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
            .unwrap();
        assert!(error_msg::try_decode(&reply.content).unwrap().is_none());
    }

    // Zero-length suffix and a four-component suffix both violate policy.
    for identity in ["/ndn", "/ndn/a/b/c/d"] {
        let template = day_template(&mut chain, identity);
        let ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
        let reply = ca
            .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
            .unwrap();
        let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
        assert_eq!(code, ErrorCode::NameNotAllowed);
    }
}

#[test]
fn test_pin_challenge_three_rounds() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/zhiyi");

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
        .unwrap();
    on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
    let request_id = ctx.request_id.unwrap();

    // Round 1: select the PIN challenge.
    let sealed = select_or_continue_challenge(&mut ctx, "pin", &Vec::new()).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
    assert!(reply.verify(ca.ca_cert()));
    on_challenge_response(&mut ctx, &reply).unwrap();
    assert_eq!(ctx.status, Some(Status::Challenge));
    assert_eq!(ctx.challenge_status.as_deref(), Some(pin::NEED_CODE));
    assert_eq!(ctx.remaining_tries, 3);

    // Round 2: wrong code.
    let wrong = pairs(&[(pin::PARAMETER_KEY_CODE, "000000!")]);
    let sealed = select_or_continue_challenge(&mut ctx, "pin", &wrong).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
    on_challenge_response(&mut ctx, &reply).unwrap();
    assert_eq!(ctx.status, Some(Status::Challenge));
    assert_eq!(ctx.challenge_status.as_deref(), Some(pin::WRONG_CODE));
    assert_eq!(ctx.remaining_tries, 2);

    // Round 3: the correct code, read from the CA's session record.
    let secret = ca
        .store()
        .get_request(&request_id)
        .unwrap()
        .challenge_state
        .get(pin::PARAMETER_KEY_CODE)
        .unwrap()
        .clone();
    let right = pairs(&[(pin::PARAMETER_KEY_CODE, &secret)]);
    let sealed = select_or_continue_challenge(&mut ctx, "pin", &right).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
    on_challenge_response(&mut ctx, &reply).unwrap();

    assert_eq!(ctx.status, Some(Status::Success));
    let issued_name = ctx.issued_cert_name.clone().unwrap();
    assert!(name("/ndn").is_prefix_of(&issued_name));
    assert!(name("/ndn/zhiyi").is_prefix_of(&issued_name));

    // Session destroyed, certificate persisted and CA-signed.
    assert!(ca.store().get_request(&request_id).is_err());
    let issued = ca.store().get_certificate(&issued_name.to_string()).unwrap();
    assert!(ndncert_core::keychain::verify(
        &issued.signed_portion(),
        &issued.signature,
        ca.ca_cert()
    ));
}

#[test]
fn test_pin_challenge_out_of_tries() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/unlucky");

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
        .unwrap();
    on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
    let request_id = ctx.request_id.unwrap();

    let sealed = select_or_continue_challenge(&mut ctx, "pin", &Vec::new()).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
    on_challenge_response(&mut ctx, &reply).unwrap();

    let wrong = pairs(&[(pin::PARAMETER_KEY_CODE, "not-a-code")]);
    for _ in 0..2 {
        let sealed = select_or_continue_challenge(&mut ctx, "pin", &wrong).unwrap();
        let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
        on_challenge_response(&mut ctx, &reply).unwrap();
    }
    assert_eq!(ctx.remaining_tries, 1);

    // The final wrong code exhausts the tries: encrypted error, session gone.
    let sealed = select_or_continue_challenge(&mut ctx, "pin", &wrong).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
    let err = on_challenge_response(&mut ctx, &reply).unwrap_err();
    match err {
        ndncert_core::Error::Rejection { code, .. } => assert_eq!(code, ErrorCode::OutOfTries),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(ctx.status, Some(Status::Failure));
    assert!(ca.store().get_request(&request_id).is_err());
}

#[test]
fn test_email_challenge_invalid_address() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/alice");

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
        .unwrap();
    on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
    let request_id = ctx.request_id.unwrap();

    let bad = pairs(&[("email", "not-an-address")]);
    let sealed = select_or_continue_challenge(&mut ctx, "email", &bad).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();
    let err = on_challenge_response(&mut ctx, &reply).unwrap_err();
    match err {
        ndncert_core::Error::Rejection { code, .. } => {
            assert_eq!(code, ErrorCode::BadParameterFormat)
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(ca.store().get_request(&request_id).is_err());
}

#[test]
fn test_revoke() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();

    // Manufacture an issued certificate the way a successful session would.
    let template = day_template(&mut chain, "/ndn/qwerty");
    let session = RequestState::new(
        name("/ndn"),
        [0x22u8; 8],
        RequestType::New,
        template,
        [0u8; 16],
        now_unix() + 300,
    );
    let issued = ca.issue_certificate(&session).unwrap();
    ca.store_mut()
        .add_certificate(&issued.name.to_string(), issued.clone())
        .unwrap();

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::Revoke);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &issued))
        .unwrap();
    assert!(reply.verify(ca.ca_cert()));

    let challenges = on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
    assert!(!challenges.is_empty());
    let stored = ca.store().get_request(&ctx.request_id.unwrap()).unwrap();
    assert_eq!(&stored.encryption_key, ctx.session_key().unwrap());
    assert_eq!(stored.request_type, RequestType::Revoke);
}

#[test]
fn test_revoke_with_unissued_certificate() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    // Self-signed, never issued by this CA.
    let stray = day_template(&mut chain, "/ndn/qwerty");

    let ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::Revoke);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &stray))
        .unwrap();

    let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
    assert_ne!(code, ErrorCode::NoError);
    assert!(ca.store().list_requests().unwrap().is_empty());
}

#[test]
fn test_challenge_with_unknown_request_id() {
    let mut ca = make_ca(CONFIG_1);
    let bogus = name("/ndn/CA/CHALLENGE").append([9u8; 8]);
    let reply = ca.handle(&bogus, &[]).unwrap();

    let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
    assert_eq!(code, ErrorCode::BadInterestFormat);
}

#[test]
fn test_challenge_on_expired_session() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/slowpoke");

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
        .unwrap();
    on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
    let request_id = ctx.request_id.unwrap();

    // Age the stored session past its deadline.
    let mut stored = ca.store().get_request(&request_id).unwrap();
    stored.fresh_before = now_unix() - 1;
    ca.store_mut().update_request(stored).unwrap();

    let sealed = select_or_continue_challenge(&mut ctx, "pin", &Vec::new()).unwrap();
    let reply = ca.handle(&ctx.challenge_name().unwrap(), &sealed).unwrap();

    let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
    assert_eq!(code, ErrorCode::OutOfTime);
    assert!(ca.store().get_request(&request_id).is_err());
}

#[test]
fn test_unsupported_challenge_selection() {
    let mut ca = make_ca(CONFIG_5); // only "pin"
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/picky");

    let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
    let reply = ca
        .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
        .unwrap();
    on_new_renew_revoke_response(&mut ctx, &reply).unwrap();

    // The requester-side guard refuses a challenge the CA never offered.
    assert!(select_or_continue_challenge(&mut ctx, "email", &Vec::new()).is_err());
}

#[test]
fn test_sweeper() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();

    for identity in ["/ndn/a", "/ndn/b"] {
        let template = day_template(&mut chain, identity);
        let ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
        ca.handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
            .unwrap();
    }
    let mut requests = ca.store().list_requests().unwrap();
    assert_eq!(requests.len(), 2);

    // Expire one of the two.
    requests.sort_by_key(|r| r.cert.name.clone());
    let mut expired = requests[0].clone();
    expired.fresh_before = now_unix() - 1;
    ca.store_mut().update_request(expired).unwrap();

    assert_eq!(ca.sweep_expired(now_unix()).unwrap(), 1);
    assert_eq!(ca.store().list_requests().unwrap().len(), 1);
}

#[test]
fn test_request_ids_are_unique() {
    let mut ca = make_ca(CONFIG_1);
    let mut chain = KeyChain::new();
    let template = day_template(&mut chain, "/ndn/many");

    let mut seen = std::collections::HashSet::new();
    for _ in 0..32 {
        let mut ctx = requester::RequesterContext::new(requester_profile(&ca), RequestType::New);
        let reply = ca
            .handle(&ctx.request_name(), &gen_request_parameters(&ctx, &template))
            .unwrap();
        on_new_renew_revoke_response(&mut ctx, &reply).unwrap();
        assert!(seen.insert(ctx.request_id.unwrap()));
    }
}

#[test]
fn test_unknown_endpoint() {
    let mut ca = make_ca(CONFIG_1);
    for uri in ["/ndn/CA/BOGUS", "/ndn/NOTCA/INFO", "/elsewhere/CA/INFO"] {
        let reply = ca.handle(&name(uri), &[]).unwrap();
        let (code, _) = error_msg::decode_data_content(&reply.content).unwrap();
        assert_eq!(code, ErrorCode::BadInterestFormat);
    }
}
