//! Protocol engine for NDNCERT, a certificate management system for
//! named-data networks.
//!
//! The crate implements both halves of the challenge-based issuance
//! protocol:
//! - TLV wire codec for every interaction (INFO, PROBE, NEW/RENEW/REVOKE,
//!   CHALLENGE) plus the encrypted envelope protecting challenge traffic
//! - the CA engine: request validation, ECDH handshake, session state
//!   machine, certificate issuance and revocation
//! - the requester engine mirroring the CA side
//! - the pluggable challenge framework (PIN and email modules included)
//! - configuration loading and name-assignment policies
//! - the request/certificate store seam with in-memory and JSON-file
//!   implementations
//!
//! The packet-delivery fabric and the host's key store stay outside: the
//! engines consume decoded request names and parameter bytes and produce
//! signed reply content through an injected [`keychain::Signer`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assignment;
pub mod ca;
pub mod cert;
pub mod challenge;
pub mod config;
pub mod error;
pub mod keychain;
pub mod messages;
pub mod name;
pub mod request;
pub mod requester;
pub mod store;
pub mod tlv;

pub use error::{Error, ErrorCode, Result};
pub use name::Name;
pub use request::{RequestId, RequestState, RequestType, Status};
