//! PIN challenge.
//!
//! On the first step the module generates a secret 6-digit code, stores it
//! in the session's secrets bag, and hands it to the delivery collaborator
//! for the out-of-band channel. Each later step compares the submitted
//! code: a match succeeds, a mismatch burns one of three tries.

use super::{secret_code, ChallengeModule, ChallengeOutcome, CodeDelivery};
use crate::assignment::{param, ParamList};
use crate::request::RequestState;
use crate::ErrorCode;
use tracing::debug;

/// Sub-state: waiting for the first code submission.
pub const NEED_CODE: &str = "need-code";
/// Sub-state: last submission was wrong, tries remain.
pub const WRONG_CODE: &str = "wrong-code";
/// Parameter key carrying the submitted code.
pub const PARAMETER_KEY_CODE: &str = "code";

/// Attempts granted per session.
const MAX_TRIES: u64 = 3;
/// Freshness granted per step, seconds.
const FRESHNESS_SECS: u64 = 300;
/// Decimal digits in the secret code.
const CODE_DIGITS: usize = 6;

/// The PIN challenge module.
pub struct ChallengePin;

impl ChallengeModule for ChallengePin {
    fn challenge_type(&self) -> &'static str {
        "pin"
    }

    fn handle(
        &self,
        request: &mut RequestState,
        params: &ParamList,
        delivery: &dyn CodeDelivery,
    ) -> ChallengeOutcome {
        let Some(expected) = request.challenge_state.get(PARAMETER_KEY_CODE).cloned() else {
            // First step: mint and deliver the secret.
            let code = secret_code(CODE_DIGITS);
            request
                .challenge_state
                .insert(PARAMETER_KEY_CODE.to_string(), code.clone());
            if delivery.deliver(&request.request_id, &code).is_err() {
                return ChallengeOutcome::failure(
                    ErrorCode::InvalidParameters,
                    "secret code could not be delivered",
                );
            }
            debug!(request_id = %hex::encode(request.request_id), "pin challenge started");
            return ChallengeOutcome::in_progress(NEED_CODE, MAX_TRIES, FRESHNESS_SECS);
        };

        let Some(submitted) = param(params, PARAMETER_KEY_CODE) else {
            return ChallengeOutcome::failure(
                ErrorCode::BadInterestFormat,
                "missing code parameter",
            );
        };

        if submitted == expected {
            return ChallengeOutcome::success();
        }
        if request.remaining_tries > 1 {
            return ChallengeOutcome::in_progress(
                WRONG_CODE,
                request.remaining_tries - 1,
                FRESHNESS_SECS,
            );
        }
        ChallengeOutcome::failure(ErrorCode::OutOfTries, "wrong code and no tries remain")
    }
}
