//! Cryptographic primitives for the NDNCERT certificate management protocol.
//!
//! This crate implements the key-agreement and envelope ciphers the protocol
//! requires:
//! - Ephemeral ECDH over NIST P-256 for the NEW/RENEW/REVOKE handshake
//! - HKDF-SHA256 session-key and request-id derivation
//! - AES-128-CBC with PKCS#7 padding for the encrypted challenge envelope
//! - CSPRNG helpers for salts, IVs, and request ids
//!
//! Signing and verification of protocol replies are deliberately absent:
//! they belong to the key chain the host injects into the engines.
//!
//! All private scalars, shared secrets, and derived keys are wrapped in
//! `Zeroizing` so they are cleared from memory when dropped. Key material is
//! never logged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod ecdh;
pub mod error;
pub mod kdf;
pub mod rng;

pub use ecdh::EcdhState;
pub use error::{Error, Result};
