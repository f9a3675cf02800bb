//! Pluggable challenge framework.
//!
//! A challenge is a named sub-protocol that proves the requester's
//! entitlement to a name. Modules are pure over the session record: they
//! read and write only the `RequestState` handed to them, and every side
//! effect (sending a code over email, SMS, ...) goes through the injected
//! [`CodeDelivery`] collaborator.

pub mod email;
pub mod pin;

use crate::assignment::ParamList;
use crate::request::{RequestId, RequestState, Status};
use crate::{ErrorCode, Result};
use std::collections::BTreeMap;

pub use email::ChallengeEmail;
pub use pin::ChallengePin;

/// Result of one challenge module step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOutcome {
    /// Session status after the step.
    pub status: Status,
    /// Challenge-defined sub-state string.
    pub challenge_status: String,
    /// Attempts the module will still accept.
    pub remaining_tries: u64,
    /// Seconds of freshness granted from now.
    pub remaining_time: u64,
    /// Set when the step is a refusal the peer should learn about.
    pub error: Option<(ErrorCode, String)>,
}

impl ChallengeOutcome {
    /// An in-progress step: the session stays in `Challenge`.
    pub fn in_progress(challenge_status: &str, remaining_tries: u64, remaining_time: u64) -> Self {
        ChallengeOutcome {
            status: Status::Challenge,
            challenge_status: challenge_status.to_string(),
            remaining_tries,
            remaining_time,
            error: None,
        }
    }

    /// A successful terminal step.
    pub fn success() -> Self {
        ChallengeOutcome {
            status: Status::Success,
            challenge_status: "success".to_string(),
            remaining_tries: 0,
            remaining_time: 0,
            error: None,
        }
    }

    /// A failed terminal step carrying a wire error.
    pub fn failure(code: ErrorCode, info: impl Into<String>) -> Self {
        let info = info.into();
        ChallengeOutcome {
            status: Status::Failure,
            challenge_status: "failure".to_string(),
            remaining_tries: 0,
            remaining_time: 0,
            error: Some((code, info)),
        }
    }
}

/// One pluggable challenge.
pub trait ChallengeModule: Send + Sync {
    /// The type string requesters select this challenge by.
    fn challenge_type(&self) -> &'static str;

    /// Run one step of the sub-protocol.
    ///
    /// The module owns `request.challenge_state` (its secrets bag) and may
    /// update `challenge_status`, `remaining_tries`, and `fresh_before`
    /// through the returned outcome; the engine applies it.
    fn handle(
        &self,
        request: &mut RequestState,
        params: &ParamList,
        delivery: &dyn CodeDelivery,
    ) -> ChallengeOutcome;
}

/// Out-of-band delivery of challenge secrets.
pub trait CodeDelivery: Send + Sync {
    /// Deliver `payload` for the session `request_id`.
    ///
    /// The channel (email, SMS, printout) is the implementor's business.
    fn deliver(&self, request_id: &RequestId, payload: &str) -> Result<()>;
}

/// Discards every payload. Suitable for tests and PIN-on-screen setups
/// where the CA operator reads the code out of the session store.
pub struct NoopDelivery;

impl CodeDelivery for NoopDelivery {
    fn deliver(&self, _request_id: &RequestId, _payload: &str) -> Result<()> {
        Ok(())
    }
}

/// Registry of challenge modules, keyed by type string.
#[derive(Default)]
pub struct ChallengeRegistry {
    modules: BTreeMap<&'static str, Box<dyn ChallengeModule>>,
}

impl ChallengeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with every built-in module.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ChallengePin));
        registry.register(Box::new(ChallengeEmail));
        registry
    }

    /// Add a module, replacing any module of the same type.
    pub fn register(&mut self, module: Box<dyn ChallengeModule>) {
        self.modules.insert(module.challenge_type(), module);
    }

    /// Look up a module by type string.
    pub fn get(&self, challenge_type: &str) -> Option<&dyn ChallengeModule> {
        self.modules.get(challenge_type).map(|m| m.as_ref())
    }

    /// True if `challenge_type` is registered.
    pub fn contains(&self, challenge_type: &str) -> bool {
        self.modules.contains_key(challenge_type)
    }
}

/// Generate a secret numeric code of `digits` decimal digits.
pub(crate) fn secret_code(digits: usize) -> String {
    ndncert_crypto::rng::random_bytes(digits)
        .iter()
        .map(|b| char::from(b'0' + b % 10))
        .collect()
}
