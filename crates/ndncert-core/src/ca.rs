//! CA engine.
//!
//! Dispatches inbound requests to the INFO/PROBE/NEW/RENEW/REVOKE/CHALLENGE
//! handlers, enforces the protocol invariants, drives each session through
//! its state machine, and issues certificates. The engine is logically
//! single-threaded: one message is processed to completion at a time, and
//! the store is the only shared mutable state.

use crate::assignment::{param, NameAssignment};
use crate::cert::{Certificate, ISSUER_NDNCERT, KEY_COMPONENT};
use crate::challenge::{ChallengeRegistry, CodeDelivery};
use crate::config::CaConfig;
use crate::keychain::{verify, verify_self_signed, Signer};
use crate::messages::{challenge, envelope, error as error_msg, info, new_renew_revoke, probe};
use crate::name::Name;
use crate::request::{now_unix, RequestId, RequestState, RequestType, Status};
use crate::store::RequestStore;
use crate::{Error, ErrorCode, Result};
use ndncert_crypto::{kdf, rng, EcdhState};
use std::sync::Arc;
use tracing::{debug, info as log_info, warn};

/// Accepted clock skew on a template's not-before, seconds.
const NOT_BEFORE_GRACE_SECS: u64 = 120;

/// Freshness granted to a session by the handshake, seconds.
const HANDSHAKE_FRESHNESS_SECS: u64 = 300;

/// A signed response ready for the delivery fabric.
#[derive(Debug, Clone)]
pub struct Reply {
    /// The request name this reply answers.
    pub name: Name,
    /// Response content (a normal content block or an Error content).
    pub content: Vec<u8>,
    /// Signature over name and content.
    pub signature: Vec<u8>,
}

impl Reply {
    fn signed_bytes(name: &Name, content: &[u8]) -> Vec<u8> {
        let mut buf = name.encode();
        buf.extend_from_slice(content);
        buf
    }

    /// Verify the signature against the CA certificate.
    pub fn verify(&self, ca_cert: &Certificate) -> bool {
        verify(
            &Self::signed_bytes(&self.name, &self.content),
            &self.signature,
            ca_cert,
        )
    }
}

/// The certificate authority engine.
pub struct CaEngine {
    config: CaConfig,
    ca_cert: Certificate,
    signer: Arc<dyn Signer>,
    store: Box<dyn RequestStore>,
    challenges: ChallengeRegistry,
    assignments: Vec<Box<dyn NameAssignment>>,
    delivery: Box<dyn CodeDelivery>,
}

impl CaEngine {
    /// Assemble an engine from its collaborators.
    ///
    /// The configuration has already validated its challenge and
    /// name-assignment references; this instantiates the strategies.
    pub fn new(
        config: CaConfig,
        ca_cert: Certificate,
        signer: Arc<dyn Signer>,
        store: Box<dyn RequestStore>,
        challenges: ChallengeRegistry,
        delivery: Box<dyn CodeDelivery>,
    ) -> Result<Self> {
        let assignments = config.build_assignments()?;
        Ok(CaEngine {
            config,
            ca_cert,
            signer,
            store,
            challenges,
            assignments,
            delivery,
        })
    }

    /// The CA profile this engine serves.
    pub fn profile(&self) -> &crate::config::CaProfile {
        &self.config.profile
    }

    /// The CA certificate replies are signed with.
    pub fn ca_cert(&self) -> &Certificate {
        &self.ca_cert
    }

    /// Read access to the backing store.
    pub fn store(&self) -> &dyn RequestStore {
        self.store.as_ref()
    }

    /// Mutable access to the backing store (hosts seed issued certificates
    /// through this).
    pub fn store_mut(&mut self) -> &mut dyn RequestStore {
        self.store.as_mut()
    }

    /// Process one inbound request and produce the signed reply.
    ///
    /// Protocol rejections become signed Error content; only store or
    /// signer failures surface as `Err`, in which case no reply is sent
    /// and the session (if any) is retained for a retry.
    pub fn handle(&mut self, name: &Name, app_params: &[u8]) -> Result<Reply> {
        debug!(name = %name, "inbound request");
        let content = match self.dispatch(name, app_params) {
            Ok(content) => content,
            Err(Error::Rejection { code, info }) => {
                warn!(name = %name, ?code, info, "request rejected");
                error_msg::encode_data_content(code, &info)
            }
            Err(other) => return Err(other),
        };
        self.reply(name, content)
    }

    fn dispatch(&mut self, name: &Name, app_params: &[u8]) -> Result<Vec<u8>> {
        let prefix_len = self.config.profile.ca_prefix.len();
        if !self.config.profile.ca_prefix.is_prefix_of(name)
            || name.get(prefix_len) != Some(&b"CA"[..])
        {
            return Err(Error::rejection(
                ErrorCode::BadInterestFormat,
                "request name is not under this CA",
            ));
        }
        match name.get(prefix_len + 1) {
            Some(b"INFO") => Ok(self.handle_info()),
            Some(b"PROBE") => self.handle_probe(app_params),
            Some(b"NEW") => self.handle_new_renew_revoke(RequestType::New, app_params),
            Some(b"RENEW") => self.handle_new_renew_revoke(RequestType::Renew, app_params),
            Some(b"REVOKE") => self.handle_new_renew_revoke(RequestType::Revoke, app_params),
            Some(b"CHALLENGE") => self.handle_challenge(name, prefix_len + 2, app_params),
            _ => Err(Error::rejection(
                ErrorCode::BadInterestFormat,
                "unknown endpoint",
            )),
        }
    }

    fn reply(&self, name: &Name, content: Vec<u8>) -> Result<Reply> {
        let signature = self
            .signer
            .sign(&Reply::signed_bytes(name, &content), &self.ca_cert.key_locator)?;
        Ok(Reply {
            name: name.clone(),
            content,
            signature,
        })
    }

    fn handle_info(&self) -> Vec<u8> {
        info::encode_data_content(&self.config.profile, &self.ca_cert)
    }

    fn handle_probe(&mut self, app_params: &[u8]) -> Result<Vec<u8>> {
        let params = probe::decode_application_parameters(app_params).map_err(|e| {
            Error::rejection(ErrorCode::BadInterestFormat, format!("bad PROBE parameters: {e}"))
        })?;
        for key in &self.config.profile.probe_parameter_keys {
            if param(&params, key).is_none() {
                return Err(Error::rejection(
                    ErrorCode::BadInterestFormat,
                    format!("missing probe parameter {key:?}"),
                ));
            }
        }

        let max_suffix = self.config.profile.max_suffix_length;
        let mut candidates = Vec::new();
        for strategy in &self.assignments {
            for suffix in strategy.assign(&params) {
                if suffix.is_empty() {
                    continue;
                }
                if let Some(max) = max_suffix {
                    if suffix.len() as u64 > max {
                        continue;
                    }
                }
                let mut name = self.config.profile.ca_prefix.clone();
                for component in &suffix {
                    name = name.append(component);
                }
                candidates.push((name, max_suffix));
            }
        }

        let redirects = self.config.redirection.clone();
        if candidates.is_empty() && redirects.is_empty() {
            return Err(Error::rejection(
                ErrorCode::NoAvailableNames,
                "no assignment strategy produced a candidate",
            ));
        }
        debug!(
            candidates = candidates.len(),
            redirects = redirects.len(),
            "probe answered"
        );
        Ok(probe::encode_data_content(&candidates, &redirects))
    }

    fn handle_new_renew_revoke(
        &mut self,
        request_type: RequestType,
        app_params: &[u8],
    ) -> Result<Vec<u8>> {
        let (peer_pub, certificate) =
            new_renew_revoke::decode_application_parameters(app_params, request_type).map_err(
                |e| {
                    Error::rejection(
                        ErrorCode::BadInterestFormat,
                        format!("bad {} parameters: {e}", request_type.verb()),
                    )
                },
            )?;

        self.validate_certificate(request_type, &certificate)?;

        let ecdh = EcdhState::new();
        let shared = ecdh.derive_secret(&peer_pub).map_err(|e| {
            Error::rejection(ErrorCode::BadParameterFormat, format!("bad ECDH key: {e}"))
        })?;
        let salt: [u8; 32] = rng::random_array();
        let request_id = kdf::derive_request_id(shared.as_slice(), &salt)?;
        let session_key = kdf::derive_session_key(shared.as_slice(), &salt)?;

        let state = RequestState::new(
            self.config.profile.ca_prefix.clone(),
            request_id,
            request_type,
            certificate,
            *session_key,
            now_unix() + HANDSHAKE_FRESHNESS_SECS,
        );
        self.store.add_request(state)?;
        log_info!(
            request_id = %hex::encode(request_id),
            verb = request_type.verb(),
            "session created"
        );

        Ok(new_renew_revoke::encode_data_content(
            ecdh.public_key(),
            &salt,
            &request_id,
            Status::BeforeChallenge,
            &self.config.profile.supported_challenges,
        ))
    }

    fn validate_certificate(
        &self,
        request_type: RequestType,
        certificate: &Certificate,
    ) -> Result<()> {
        match request_type {
            RequestType::New | RequestType::Renew => {
                if !verify_self_signed(certificate) {
                    return Err(Error::rejection(
                        ErrorCode::BadSignature,
                        "certificate request signature does not verify",
                    ));
                }
            }
            RequestType::Revoke => {
                // A certificate this CA issued verifies against the CA key.
                if !verify(
                    &certificate.signed_portion(),
                    &certificate.signature,
                    &self.ca_cert,
                ) {
                    return Err(Error::rejection(
                        ErrorCode::BadSignature,
                        "certificate was not signed by this CA",
                    ));
                }
            }
        }

        let prefix = &self.config.profile.ca_prefix;
        let identity = certificate.identity();
        if !prefix.is_prefix_of(&identity) || identity.len() == prefix.len() {
            return Err(Error::rejection(
                ErrorCode::NameNotAllowed,
                format!("{identity} is not strictly under {prefix}"),
            ));
        }
        let suffix_len = (identity.len() - prefix.len()) as u64;
        if let Some(max) = self.config.profile.max_suffix_length {
            if suffix_len > max {
                return Err(Error::rejection(
                    ErrorCode::NameNotAllowed,
                    format!("suffix of {suffix_len} components exceeds the limit of {max}"),
                ));
            }
        }

        match request_type {
            RequestType::New | RequestType::Renew => {
                let validity = &certificate.validity;
                let now = now_unix();
                if validity.not_after <= validity.not_before {
                    return Err(Error::rejection(
                        ErrorCode::BadValidityPeriod,
                        "not-after precedes not-before",
                    ));
                }
                if validity.not_before + NOT_BEFORE_GRACE_SECS < now {
                    return Err(Error::rejection(
                        ErrorCode::BadValidityPeriod,
                        "not-before is too far in the past",
                    ));
                }
                if validity.not_after - validity.not_before
                    > self.config.profile.max_validity_period
                {
                    return Err(Error::rejection(
                        ErrorCode::BadValidityPeriod,
                        "requested validity period exceeds the CA maximum",
                    ));
                }
            }
            RequestType::Revoke => {
                if self
                    .store
                    .get_certificate(&certificate.name.to_string())
                    .is_err()
                {
                    return Err(Error::rejection(
                        ErrorCode::InvalidParameters,
                        "certificate is not in the issued-certificate store",
                    ));
                }
            }
        }
        Ok(())
    }

    fn handle_challenge(
        &mut self,
        name: &Name,
        id_index: usize,
        app_params: &[u8],
    ) -> Result<Vec<u8>> {
        let request_id: RequestId = name
            .get(id_index)
            .and_then(|c| c.try_into().ok())
            .ok_or_else(|| {
                Error::rejection(ErrorCode::BadInterestFormat, "missing or malformed request id")
            })?;

        let mut request = self.store.get_request(&request_id).map_err(|_| {
            Error::rejection(ErrorCode::BadInterestFormat, "unknown request id")
        })?;

        let now = now_unix();
        if request.is_expired(now) {
            self.store.delete_request(&request_id)?;
            warn!(request_id = %hex::encode(request_id), "session expired");
            return Err(Error::rejection(ErrorCode::OutOfTime, "session expired"));
        }

        // Decrypt without touching the stored session, so a malformed or
        // forged message leaves it intact for a retry.
        let mut block_counter = request.aes_block_counter;
        let plaintext = match envelope::open(&request.encryption_key, &mut block_counter, app_params)
        {
            Ok(plaintext) => plaintext,
            Err(Error::Rejection { code, info }) => {
                // The block budget is gone; the session dies with it.
                self.store.delete_request(&request_id)?;
                return Err(Error::Rejection { code, info });
            }
            Err(e) => {
                return Err(Error::rejection(
                    ErrorCode::BadInterestFormat,
                    format!("cannot decrypt challenge parameters: {e}"),
                ));
            }
        };
        request.aes_block_counter = block_counter;

        let (selected, challenge_params) = challenge::decode_application_parameters(&plaintext)
            .map_err(|e| {
                Error::rejection(
                    ErrorCode::BadInterestFormat,
                    format!("bad challenge parameters: {e}"),
                )
            })?;

        match &request.challenge_type {
            None => {
                if !self.config.profile.supported_challenges.contains(&selected)
                    || !self.challenges.contains(&selected)
                {
                    return Err(Error::rejection(
                        ErrorCode::BadInterestFormat,
                        format!("challenge {selected:?} is not supported"),
                    ));
                }
                request.challenge_type = Some(selected.clone());
            }
            Some(chosen) if *chosen != selected => {
                return Err(Error::rejection(
                    ErrorCode::BadInterestFormat,
                    "challenge type may not change mid-session",
                ));
            }
            Some(_) => {}
        }

        let module = self.challenges.get(&selected).ok_or_else(|| {
            Error::rejection(
                ErrorCode::BadInterestFormat,
                format!("challenge {selected:?} is not registered"),
            )
        })?;
        let outcome = module.handle(&mut request, &challenge_params, self.delivery.as_ref());

        request.challenge_status = outcome.challenge_status.clone();
        request.remaining_tries = outcome.remaining_tries;
        request.fresh_before = now + outcome.remaining_time;
        request.advance(outcome.status)?;

        match outcome.status {
            Status::Success => {
                let issued = self.issue_certificate(&request)?;
                self.store
                    .add_certificate(&issued.name.to_string(), issued.clone())?;
                let content = challenge::encode_data_content(
                    Status::Success,
                    &outcome.challenge_status,
                    outcome.remaining_tries,
                    outcome.remaining_time,
                    Some(&issued.name),
                );
                let sealed = envelope::seal(
                    &request.encryption_key,
                    &mut request.aes_block_counter,
                    &content,
                )?;
                self.store.delete_request(&request_id)?;
                log_info!(
                    request_id = %hex::encode(request_id),
                    cert = %issued.name,
                    "certificate issued"
                );
                Ok(sealed)
            }
            Status::Failure => {
                let (code, info) = outcome
                    .error
                    .unwrap_or((ErrorCode::InvalidParameters, "challenge failed".to_string()));
                let content = error_msg::encode_data_content(code, &info);
                let sealed = envelope::seal(
                    &request.encryption_key,
                    &mut request.aes_block_counter,
                    &content,
                )?;
                self.store.delete_request(&request_id)?;
                warn!(request_id = %hex::encode(request_id), ?code, "challenge failed");
                Ok(sealed)
            }
            _ => {
                let content = challenge::encode_data_content(
                    outcome.status,
                    &outcome.challenge_status,
                    outcome.remaining_tries,
                    outcome.remaining_time,
                    None,
                );
                let sealed = envelope::seal(
                    &request.encryption_key,
                    &mut request.aes_block_counter,
                    &content,
                )?;
                self.store.update_request(request)?;
                Ok(sealed)
            }
        }
    }

    /// Build and sign the certificate for a successful session.
    ///
    /// The issued name is the validated identity extended with
    /// `KEY/<key-id>/NDNCERT/v=<version>`.
    pub fn issue_certificate(&self, request: &RequestState) -> Result<Certificate> {
        let template = &request.cert;
        let key_id = template
            .key_id()
            .map(<[u8]>::to_vec)
            .unwrap_or_else(|| rng::random_array::<8>().to_vec());
        let version = format!("v={}", u64::from_be_bytes(rng::random_array()));

        let name = template
            .identity()
            .append(KEY_COMPONENT)
            .append(key_id)
            .append(ISSUER_NDNCERT)
            .append(version.as_bytes());

        let mut issued = Certificate {
            name,
            public_key: template.public_key.clone(),
            validity: template.validity,
            key_locator: self.ca_cert.key_locator.clone(),
            signature: Vec::new(),
        };
        issued.signature = self
            .signer
            .sign(&issued.signed_portion(), &self.ca_cert.key_locator)?;
        Ok(issued)
    }

    /// Remove every session past its freshness deadline.
    ///
    /// Returns the number of sessions swept; each counts as a FAILURE for
    /// bookkeeping.
    pub fn sweep_expired(&mut self, now: u64) -> Result<usize> {
        let expired: Vec<RequestId> = self
            .store
            .list_requests()?
            .into_iter()
            .filter(|r| r.is_expired(now))
            .map(|r| r.request_id)
            .collect();
        for request_id in &expired {
            self.store.delete_request(request_id)?;
            warn!(request_id = %hex::encode(request_id), "expired session swept");
        }
        Ok(expired.len())
    }
}
