//! Name-assignment strategies for PROBE.
//!
//! A strategy maps the requester's PROBE parameters to candidate suffixes;
//! the CA engine joins each suffix under the CA prefix and enforces the
//! suffix-length budget. Strategies are looked up by the `function` field
//! of the `name-assignment` configuration entries.

use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// PROBE parameters as an ordered multimap.
pub type ParamList = Vec<(String, String)>;

/// Look up the first value for `key`.
pub fn param<'a>(params: &'a ParamList, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A strategy producing candidate suffixes from PROBE parameters.
///
/// Each suffix is a list of components to append below the CA prefix. An
/// empty return means the strategy has no candidate for these parameters.
pub trait NameAssignment: Send + Sync {
    /// Compute candidate suffixes, best first.
    fn assign(&self, params: &ParamList) -> Vec<Vec<String>>;
}

/// One fresh pseudorandom component per call.
pub struct RandomAssignment;

impl NameAssignment for RandomAssignment {
    fn assign(&self, _params: &ParamList) -> Vec<Vec<String>> {
        let nonce: [u8; 8] = ndncert_crypto::rng::random_array();
        vec![vec![hex::encode(nonce)]]
    }
}

/// One deterministic component: SHA-256 over all parameter values.
pub struct HashAssignment;

impl NameAssignment for HashAssignment {
    fn assign(&self, params: &ParamList) -> Vec<Vec<String>> {
        if params.is_empty() {
            return Vec::new();
        }
        let mut hasher = Sha256::new();
        for (_, value) in params {
            hasher.update(value.as_bytes());
        }
        let digest = hasher.finalize();
        vec![vec![hex::encode(&digest[..8])]]
    }
}

/// Emit the values of the configured keys as successive components.
///
/// The candidate is skipped when any required key is absent or empty.
pub struct ParamAssignment {
    format: Vec<String>,
}

impl ParamAssignment {
    /// Build from the configured `format` key list.
    pub fn new(format: Vec<String>) -> Self {
        Self { format }
    }
}

impl NameAssignment for ParamAssignment {
    fn assign(&self, params: &ParamList) -> Vec<Vec<String>> {
        if self.format.is_empty() {
            return Vec::new();
        }
        let mut components = Vec::with_capacity(self.format.len());
        for key in &self.format {
            match param(params, key) {
                Some(value) if !value.is_empty() => components.push(value.to_string()),
                _ => return Vec::new(),
            }
        }
        vec![components]
    }
}

/// Instantiate the strategy registered under `function`.
///
/// # Errors
///
/// Fails when `function` names no registered strategy; configuration
/// loading surfaces this as a load error.
pub fn make_assignment(function: &str, format: Vec<String>) -> Result<Box<dyn NameAssignment>> {
    match function {
        "random" => Ok(Box::new(RandomAssignment)),
        "hash" => Ok(Box::new(HashAssignment)),
        "param" => Ok(Box::new(ParamAssignment::new(format))),
        other => Err(Error::Config(format!(
            "unknown name-assignment function {:?}",
            other
        ))),
    }
}
