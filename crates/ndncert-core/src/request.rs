//! Session state for in-flight certificate requests.
//!
//! A [`RequestState`] is created by a NEW/RENEW/REVOKE handshake, mutated
//! only by the CA engine and the selected challenge module, and destroyed
//! when it reaches a terminal status or outlives its freshness deadline.

use crate::cert::Certificate;
use crate::name::Name;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque 8-byte request identifier, derived from the handshake.
pub type RequestId = [u8; 8];

/// Current wall-clock time in seconds since the UNIX epoch.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// What the requester is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    /// Issue a certificate for a new name.
    New,
    /// Re-issue an existing certificate.
    Renew,
    /// Revoke an issued certificate.
    Revoke,
}

impl RequestType {
    /// The endpoint verb for this request type.
    pub fn verb(self) -> &'static str {
        match self {
            RequestType::New => "NEW",
            RequestType::Renew => "RENEW",
            RequestType::Revoke => "REVOKE",
        }
    }
}

/// Session status. Advances forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u64)]
pub enum Status {
    /// Handshake done, no challenge selected yet.
    BeforeChallenge = 0,
    /// A challenge is in progress.
    Challenge = 1,
    /// Intermediate state used inside a challenge module step.
    Pending = 2,
    /// Certificate issued (terminal).
    Success = 3,
    /// Request refused (terminal).
    Failure = 4,
}

impl Status {
    /// Convert to wire format.
    pub fn to_u64(self) -> u64 {
        self as u64
    }

    /// Convert from wire format.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::BeforeChallenge),
            1 => Some(Self::Challenge),
            2 => Some(Self::Pending),
            3 => Some(Self::Success),
            4 => Some(Self::Failure),
            _ => None,
        }
    }

    /// True for SUCCESS and FAILURE.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }
}

/// One in-flight certificate transaction on the CA side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    /// Prefix of the owning CA.
    pub ca_prefix: Name,
    /// Unique id shared with the requester.
    pub request_id: RequestId,
    /// NEW, RENEW, or REVOKE.
    pub request_type: RequestType,
    /// Where the session stands.
    pub status: Status,
    /// The requester-supplied template (or the certificate being revoked).
    pub cert: Certificate,
    /// AES-128 session key, derived exactly once at handshake time.
    pub encryption_key: [u8; 16],
    /// AES blocks processed under `encryption_key` so far.
    pub aes_block_counter: u32,
    /// Selected challenge type, once the first CHALLENGE message arrives.
    pub challenge_type: Option<String>,
    /// Secrets bag owned by the selected challenge module.
    pub challenge_state: BTreeMap<String, String>,
    /// Challenge-defined sub-state string.
    pub challenge_status: String,
    /// Attempts the challenge module will still accept.
    pub remaining_tries: u64,
    /// Seconds-since-epoch deadline after which the session is dead.
    pub fresh_before: u64,
    /// When the session was created (seconds since epoch).
    pub request_time: u64,
}

impl RequestState {
    /// A fresh session in `BeforeChallenge`, created at handshake time.
    pub fn new(
        ca_prefix: Name,
        request_id: RequestId,
        request_type: RequestType,
        cert: Certificate,
        encryption_key: [u8; 16],
        fresh_before: u64,
    ) -> Self {
        RequestState {
            ca_prefix,
            request_id,
            request_type,
            status: Status::BeforeChallenge,
            cert,
            encryption_key,
            aes_block_counter: 0,
            challenge_type: None,
            challenge_state: BTreeMap::new(),
            challenge_status: String::new(),
            remaining_tries: 0,
            fresh_before,
            request_time: now_unix(),
        }
    }

    /// True once the freshness deadline has passed.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.fresh_before
    }

    /// Advance the status, rejecting any backward move.
    pub fn advance(&mut self, next: Status) -> Result<()> {
        if next < self.status {
            return Err(Error::InvalidState(format!(
                "status may not move backwards ({:?} -> {:?})",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

}
