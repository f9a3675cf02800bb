//! Configuration documents.
//!
//! The CA and the requester are parametrized by JSON documents. Loading
//! cross-validates every reference: a CA config naming an unregistered
//! challenge or name-assignment function fails to load rather than failing
//! at the first PROBE.

use crate::assignment::{make_assignment, NameAssignment};
use crate::cert::Certificate;
use crate::challenge::ChallengeRegistry;
use crate::name::Name;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default `max-validity-period` in seconds (one day).
pub const DEFAULT_MAX_VALIDITY_SECS: u64 = 86_400;

/// A CA's published profile.
///
/// Built once from configuration (or decoded from INFO content on the
/// requester side) and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaProfile {
    /// Prefix every issued name falls under.
    pub ca_prefix: Name,
    /// Free-form description shown to requesters.
    pub ca_info: String,
    /// Parameter keys PROBE requests are expected to carry.
    pub probe_parameter_keys: Vec<String>,
    /// Longest validity period the CA grants, seconds.
    pub max_validity_period: u64,
    /// Longest suffix granted under the prefix, if bounded.
    pub max_suffix_length: Option<u64>,
    /// Routing hint for reaching the CA, if any.
    pub forwarding_hint: Option<Name>,
    /// The CA certificate. Present on the requester side and in decoded
    /// INFO content; the CA itself gets its certificate from the key chain.
    pub cert: Option<Certificate>,
    /// Challenge types the CA accepts, in configuration order.
    pub supported_challenges: Vec<String>,
}

#[derive(Deserialize)]
struct ChallengeEntry {
    #[serde(rename = "type")]
    challenge_type: String,
}

#[derive(Deserialize)]
struct AssignmentEntry {
    function: String,
    #[serde(default)]
    format: Vec<String>,
}

fn default_max_validity() -> u64 {
    DEFAULT_MAX_VALIDITY_SECS
}

#[derive(Deserialize)]
struct RawCaConfig {
    #[serde(rename = "ca-prefix")]
    ca_prefix: Name,
    #[serde(rename = "ca-info", default)]
    ca_info: String,
    #[serde(rename = "max-validity-period", default = "default_max_validity")]
    max_validity_period: u64,
    #[serde(rename = "max-suffix-length", default)]
    max_suffix_length: Option<u64>,
    #[serde(rename = "probe-parameters", default)]
    probe_parameters: Vec<String>,
    #[serde(rename = "forwarding-hint", default)]
    forwarding_hint: Option<Name>,
    #[serde(rename = "supported-challenges", default)]
    supported_challenges: Vec<ChallengeEntry>,
    #[serde(rename = "name-assignment", default)]
    name_assignment: Vec<AssignmentEntry>,
    #[serde(rename = "redirection", default)]
    redirection: Vec<Name>,
}

/// Validated CA-side configuration.
pub struct CaConfig {
    /// The CA profile assembled from the document.
    pub profile: CaProfile,
    /// Certificate names of CAs to redirect PROBE traffic to.
    pub redirection: Vec<Name>,
    /// `(function, format)` pairs, validated against the strategy registry.
    pub name_assignment: Vec<(String, Vec<String>)>,
}

impl CaConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>, challenges: &ChallengeRegistry) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&text, challenges)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(text: &str, challenges: &ChallengeRegistry) -> Result<Self> {
        let raw: RawCaConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("bad document: {e}")))?;

        if raw.supported_challenges.is_empty() {
            return Err(Error::Config(
                "supported-challenges must list at least one challenge".into(),
            ));
        }
        let mut supported = Vec::with_capacity(raw.supported_challenges.len());
        for entry in &raw.supported_challenges {
            if !challenges.contains(&entry.challenge_type) {
                return Err(Error::Config(format!(
                    "challenge {:?} is not registered",
                    entry.challenge_type
                )));
            }
            supported.push(entry.challenge_type.clone());
        }

        let mut name_assignment = Vec::with_capacity(raw.name_assignment.len());
        for entry in raw.name_assignment {
            // Instantiating validates the function name.
            make_assignment(&entry.function, entry.format.clone())?;
            name_assignment.push((entry.function, entry.format));
        }

        Ok(CaConfig {
            profile: CaProfile {
                ca_prefix: raw.ca_prefix,
                ca_info: raw.ca_info,
                probe_parameter_keys: raw.probe_parameters,
                max_validity_period: raw.max_validity_period,
                max_suffix_length: raw.max_suffix_length,
                forwarding_hint: raw.forwarding_hint,
                cert: None,
                supported_challenges: supported,
            },
            redirection: raw.redirection,
            name_assignment,
        })
    }

    /// Instantiate the configured name-assignment strategies, in order.
    ///
    /// A config without `name-assignment` entries falls back to the
    /// `random` strategy so PROBE always has a candidate source.
    pub fn build_assignments(&self) -> Result<Vec<Box<dyn NameAssignment>>> {
        if self.name_assignment.is_empty() {
            return Ok(vec![make_assignment("random", Vec::new())?]);
        }
        self.name_assignment
            .iter()
            .map(|(function, format)| make_assignment(function, format.clone()))
            .collect()
    }
}

#[derive(Deserialize)]
struct RawProfile {
    #[serde(rename = "ca-prefix")]
    ca_prefix: Name,
    certificate: Certificate,
    #[serde(rename = "ca-info", default)]
    ca_info: String,
    #[serde(rename = "max-validity-period", default = "default_max_validity")]
    max_validity_period: u64,
    #[serde(rename = "max-suffix-length", default)]
    max_suffix_length: Option<u64>,
    #[serde(rename = "probe-parameters", default)]
    probe_parameters: Vec<String>,
    #[serde(rename = "forwarding-hint", default)]
    forwarding_hint: Option<Name>,
}

#[derive(Deserialize)]
struct RawProfileStorage {
    #[serde(rename = "known-profiles")]
    known_profiles: Vec<RawProfile>,
}

/// The requester's collection of known CA profiles.
#[derive(Default)]
pub struct ProfileStorage {
    profiles: Vec<CaProfile>,
}

impl ProfileStorage {
    /// Load a `known-profiles` document.
    ///
    /// Every profile must carry `ca-prefix` and `certificate`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&text)
    }

    /// Parse a `known-profiles` document.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawProfileStorage =
            serde_json::from_str(text).map_err(|e| Error::Config(format!("bad document: {e}")))?;
        let profiles = raw
            .known_profiles
            .into_iter()
            .map(|p| CaProfile {
                ca_prefix: p.ca_prefix,
                ca_info: p.ca_info,
                probe_parameter_keys: p.probe_parameters,
                max_validity_period: p.max_validity_period,
                max_suffix_length: p.max_suffix_length,
                forwarding_hint: p.forwarding_hint,
                cert: Some(p.certificate),
                supported_challenges: Vec::new(),
            })
            .collect();
        Ok(ProfileStorage { profiles })
    }

    /// Every known profile, in document order.
    pub fn known_profiles(&self) -> &[CaProfile] {
        &self.profiles
    }

    /// The profile for `ca_prefix`, if known.
    pub fn find(&self, ca_prefix: &Name) -> Option<&CaProfile> {
        self.profiles.iter().find(|p| &p.ca_prefix == ca_prefix)
    }

    /// Add a profile (e.g. learned from an INFO exchange).
    pub fn add_profile(&mut self, profile: CaProfile) {
        self.profiles.push(profile);
    }

    /// Remove every profile under `ca_prefix`.
    pub fn remove_profile(&mut self, ca_prefix: &Name) {
        self.profiles.retain(|p| &p.ca_prefix != ca_prefix);
    }
}
