//! Error types for protocol operations.

use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Protocol operation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or truncated TLV input.
    #[error("Invalid TLV: {0}")]
    InvalidTlv(String),

    /// A protocol-level rejection that is reported to the peer on the wire.
    #[error("Protocol rejection ({code:?}): {info}")]
    Rejection {
        /// Wire error code sent back to the peer.
        code: ErrorCode,
        /// Human-readable diagnostic carried in ErrorInfo.
        info: String,
    },

    /// Configuration document failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request or certificate not found in the store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A session with the same request id already exists.
    #[error("Duplicate request id")]
    DuplicateRequestId,

    /// Signing failed or no key matched the locator.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Engine asked to do something its state forbids.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Cryptographic error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] ndncert_crypto::Error),

    /// Store persistence error.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store or configuration (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a wire-visible rejection.
    pub fn rejection(code: ErrorCode, info: impl Into<String>) -> Self {
        Error::Rejection {
            code,
            info: info.into(),
        }
    }
}

/// On-wire error codes carried in Error content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ErrorCode {
    /// Normal completion.
    NoError = 0,
    /// Malformed TLV, missing required parameter, or unsupported challenge
    /// selection.
    BadInterestFormat = 1,
    /// Parameter value failed module-specific validation.
    BadParameterFormat = 2,
    /// Signature on the embedded certificate does not verify.
    BadSignature = 3,
    /// Semantic validation failed.
    InvalidParameters = 4,
    /// Requested or probed name violates CA policy.
    NameNotAllowed = 5,
    /// Not-before/not-after fail the validity policy.
    BadValidityPeriod = 6,
    /// Challenge module exhausted the remaining tries.
    OutOfTries = 7,
    /// Session past its freshness deadline.
    OutOfTime = 8,
    /// PROBE produced no candidates and no redirects.
    NoAvailableNames = 9,
}

impl ErrorCode {
    /// Convert to wire format.
    pub fn to_u64(self) -> u64 {
        self as u64
    }

    /// Convert from wire format.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::NoError),
            1 => Some(Self::BadInterestFormat),
            2 => Some(Self::BadParameterFormat),
            3 => Some(Self::BadSignature),
            4 => Some(Self::InvalidParameters),
            5 => Some(Self::NameNotAllowed),
            6 => Some(Self::BadValidityPeriod),
            7 => Some(Self::OutOfTries),
            8 => Some(Self::OutOfTime),
            9 => Some(Self::NoAvailableNames),
            _ => None,
        }
    }
}
