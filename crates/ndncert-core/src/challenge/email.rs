//! Email challenge.
//!
//! The first step takes the requester's email address, checks its shape,
//! and delivers a secret code to it through the injected collaborator.
//! From there the sub-protocol is the PIN flow: submit the code, three
//! tries, five-minute freshness.

use super::pin::{NEED_CODE, PARAMETER_KEY_CODE, WRONG_CODE};
use super::{secret_code, ChallengeModule, ChallengeOutcome, CodeDelivery};
use crate::assignment::{param, ParamList};
use crate::request::{RequestState, Status};
use crate::ErrorCode;
use tracing::debug;

/// Sub-state: the supplied address failed validation (terminal).
pub const INVALID_EMAIL: &str = "invalid-email";
/// Parameter key carrying the email address on the first step.
pub const PARAMETER_KEY_EMAIL: &str = "email";

const MAX_TRIES: u64 = 3;
const FRESHNESS_SECS: u64 = 300;
const CODE_DIGITS: usize = 6;

/// The email challenge module.
pub struct ChallengeEmail;

fn plausible_email(address: &str) -> bool {
    let mut halves = address.splitn(2, '@');
    match (halves.next(), halves.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        _ => false,
    }
}

impl ChallengeModule for ChallengeEmail {
    fn challenge_type(&self) -> &'static str {
        "email"
    }

    fn handle(
        &self,
        request: &mut RequestState,
        params: &ParamList,
        delivery: &dyn CodeDelivery,
    ) -> ChallengeOutcome {
        let Some(expected) = request.challenge_state.get(PARAMETER_KEY_CODE).cloned() else {
            let Some(address) = param(params, PARAMETER_KEY_EMAIL) else {
                return ChallengeOutcome::failure(
                    ErrorCode::BadInterestFormat,
                    "missing email parameter",
                );
            };
            if !plausible_email(address) {
                return ChallengeOutcome {
                    status: Status::Failure,
                    challenge_status: INVALID_EMAIL.to_string(),
                    remaining_tries: 0,
                    remaining_time: 0,
                    error: Some((
                        ErrorCode::BadParameterFormat,
                        "not a valid email address".to_string(),
                    )),
                };
            }

            let code = secret_code(CODE_DIGITS);
            request
                .challenge_state
                .insert(PARAMETER_KEY_CODE.to_string(), code.clone());
            request
                .challenge_state
                .insert(PARAMETER_KEY_EMAIL.to_string(), address.to_string());
            if delivery.deliver(&request.request_id, &code).is_err() {
                return ChallengeOutcome::failure(
                    ErrorCode::InvalidParameters,
                    "secret code could not be delivered",
                );
            }
            debug!(
                request_id = %hex::encode(request.request_id),
                "email challenge started"
            );
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
