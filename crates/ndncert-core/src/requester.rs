//! Requester engine.
//!
//! Mirror of the CA side: builds NEW/RENEW/REVOKE parameters from a fresh
//! ECDH state, derives the same session key from the response, and runs
//! challenge rounds through the encrypted envelope. One
//! [`RequesterContext`] tracks one certificate transaction.

use crate::assignment::ParamList;
use crate::ca::Reply;
use crate::cert::Certificate;
use crate::config::CaProfile;
use crate::messages::{challenge, envelope, error as error_msg, new_renew_revoke};
use crate::name::Name;
use crate::request::{now_unix, RequestId, RequestType, Status};
use crate::{Error, ErrorCode, Result};
use ndncert_crypto::{kdf, EcdhState};
use zeroize::Zeroizing;

/// Requester-side state for one certificate transaction.
pub struct RequesterContext {
    /// The target CA's profile.
    pub profile: CaProfile,
    /// NEW, RENEW, or REVOKE.
    pub request_type: RequestType,
    ecdh: EcdhState,
    session_key: Option<Zeroizing<[u8; 16]>>,
    block_counter: u32,
    selected_challenge: Option<String>,
    /// Request id agreed with the CA, once the handshake reply arrives.
    pub request_id: Option<RequestId>,
    /// Mirrored session status.
    pub status: Option<Status>,
    /// Mirrored challenge sub-state.
    pub challenge_status: Option<String>,
    /// Mirrored remaining tries.
    pub remaining_tries: u64,
    /// Mirrored freshness deadline (seconds since epoch).
    pub fresh_before: u64,
    /// Challenges offered by the CA in the handshake reply.
    pub available_challenges: Vec<String>,
    /// Name of the issued certificate, set on success.
    pub issued_cert_name: Option<Name>,
}

impl RequesterContext {
    /// Start a transaction against `profile`.
    pub fn new(profile: CaProfile, request_type: RequestType) -> Self {
        RequesterContext {
            profile,
            request_type,
            ecdh: EcdhState::new(),
            session_key: None,
            block_counter: 0,
            selected_challenge: None,
            request_id: None,
            status: None,
            challenge_status: None,
            remaining_tries: 0,
            fresh_before: 0,
            available_challenges: Vec::new(),
            issued_cert_name: None,
        }
    }

    /// The request name for the handshake message,
    /// e.g. `/<ca-prefix>/CA/NEW`.
    pub fn request_name(&self) -> Name {
        self.profile
            .ca_prefix
            .clone()
            .append(b"CA")
            .append(self.request_type.verb())
    }

    /// The request name for a challenge round,
    /// `/<ca-prefix>/CA/CHALLENGE/<request-id>`.
    ///
    /// # Errors
    ///
    /// Fails before the handshake reply has been processed.
    pub fn challenge_name(&self) -> Result<Name> {
        let request_id = self
            .request_id
            .ok_or_else(|| Error::InvalidState("handshake not completed".into()))?;
        Ok(self
            .profile
            .ca_prefix
            .clone()
            .append(b"CA")
            .append(b"CHALLENGE")
            .append(request_id))
    }

    /// The session key, for tests that compare both sides.
    pub fn session_key(&self) -> Option<&[u8; 16]> {
        self.session_key.as_deref()
    }
}

/// Build the application parameters for the handshake message.
///
/// `certificate` is the signed request template for NEW/RENEW or the
/// certificate being revoked for REVOKE.
pub fn gen_request_parameters(ctx: &RequesterContext, certificate: &Certificate) -> Vec<u8> {
    new_renew_revoke::encode_application_parameters(
        ctx.request_type,
        ctx.ecdh.public_key(),
        certificate,
    )
}

/// Process the handshake reply: verify the CA signature, derive the
/// session key and request id, and return the offered challenge list.
pub fn on_new_renew_revoke_response(
    ctx: &mut RequesterContext,
    reply: &Reply,
) -> Result<Vec<String>> {
    verify_reply(ctx, reply)?;
    if let Some((code, info)) = error_msg::try_decode(&reply.content)? {
        return Err(Error::Rejection { code, info });
    }

    let response = new_renew_revoke::decode_data_content(&reply.content)?;
    let shared = ctx.ecdh.derive_secret(&response.ecdh_pub)?;
    let session_key = kdf::derive_session_key(shared.as_slice(), &response.salt)?;
    let request_id = kdf::derive_request_id(shared.as_slice(), &response.salt)?;
    if request_id != response.request_id {
        return Err(Error::InvalidState(
            "request id does not match the handshake derivation".into(),
        ));
    }

    ctx.session_key = Some(session_key);
    ctx.request_id = Some(request_id);
    ctx.status = Some(response.status);
    ctx.available_challenges = response.challenges.clone();
    Ok(response.challenges)
}

/// Build encrypted challenge parameters: select `challenge_type` on the
/// first round, then keep submitting module parameters.
pub fn select_or_continue_challenge(
    ctx: &mut RequesterContext,
    challenge_type: &str,
    params: &ParamList,
) -> Result<Vec<u8>> {
    let session_key = *ctx
        .session_key
        .as_deref()
        .ok_or_else(|| Error::InvalidState("handshake not completed".into()))?;
    match &ctx.selected_challenge {
        None => {
            if !ctx.available_challenges.iter().any(|c| c == challenge_type) {
                return Err(Error::InvalidState(format!(
                    "CA does not offer challenge {challenge_type:?}"
                )));
            }
            ctx.selected_challenge = Some(challenge_type.to_string());
        }
        Some(selected) if selected != challenge_type => {
            return Err(Error::InvalidState(
                "challenge type may not change mid-session".into(),
            ));
        }
        Some(_) => {}
    }

    let plaintext = challenge::encode_application_parameters(challenge_type, params);
    envelope::seal(&session_key, &mut ctx.block_counter, &plaintext)
}

/// Process an encrypted challenge reply, updating the mirrored session
/// fields and recording the issued certificate name on success.
pub fn on_challenge_response(ctx: &mut RequesterContext, reply: &Reply) -> Result<()> {
    verify_reply(ctx, reply)?;
    let session_key = *ctx
        .session_key
        .as_deref()
        .ok_or_else(|| Error::InvalidState("handshake not completed".into()))?;

    let plaintext = envelope::open(&session_key, &mut ctx.block_counter, &reply.content)?;
    if let Some((code, info)) = error_msg::try_decode(&plaintext)? {
        ctx.status = Some(Status::Failure);
        return Err(Error::Rejection { code, info });
    }

    let content = challenge::decode_data_content(&plaintext)?;
    ctx.status = Some(content.status);
    ctx.challenge_status = Some(content.challenge_status);
    ctx.remaining_tries = content.remaining_tries;
    ctx.fresh_before = now_unix() + content.remaining_time;
    if let Some(name) = content.issued_cert_name {
        ctx.issued_cert_name = Some(name);
    }
    Ok(())
}

/// Translate unencrypted Error content into a domain failure, if present.
pub fn on_error_content(content: &[u8]) -> Result<Option<(ErrorCode, String)>> {
    error_msg::try_decode(content)
}

fn verify_reply(ctx: &RequesterContext, reply: &Reply) -> Result<()> {
    let Some(ca_cert) = ctx.profile.cert.as_ref() else {
        // A profile without a pinned certificate cannot authenticate
        // replies; accept them as-is.
        return Ok(());
    };
    if !reply.verify(ca_cert) {
        return Err(Error::InvalidState(
            "reply signature does not verify against the CA certificate".into(),
        ));
    }
    Ok(())
}
