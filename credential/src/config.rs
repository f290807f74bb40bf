//! Configuration management for the credential service.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::environment::{IssuancePolicy, IssuerOnlyPolicy, RelayPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which [`IssuancePolicy`] to install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Any sender may issue for a named origin (automated relay)
    #[default]
    Relay,
    /// Only the issuer may issue
    IssuerOnly,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relay" => Ok(Self::Relay),
            "issuer-only" | "issuer_only" => Ok(Self::IssuerOnly),
            other => Err(format!("unknown issuance policy: {other}")),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay => write!(f, "relay"),
            Self::IssuerOnly => write!(f, "issuer-only"),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Log filter used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub log_level: String,
    /// Maximum actions applied per fold commit; `None` folds everything at once
    pub max_fold_batch: Option<usize>,
    /// Who may dispatch an issuance
    pub issuance_policy: PolicyKind,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            max_fold_batch: None,
            issuance_policy: PolicyKind::Relay,
        }
    }
}

impl CredentialConfig {
    /// Load configuration from `SOULBOUND_*` environment variables.
    ///
    /// - `SOULBOUND_LOG_LEVEL` (default `info`)
    /// - `SOULBOUND_MAX_FOLD_BATCH` (default unlimited; `0` also means unlimited)
    /// - `SOULBOUND_ISSUANCE_POLICY`: `relay` or `issuer-only` (default `relay`)
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("SOULBOUND_LOG_LEVEL").unwrap_or(defaults.log_level),
            max_fold_batch: lookup("SOULBOUND_MAX_FOLD_BATCH")
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|&n| n > 0),
            issuance_policy: lookup("SOULBOUND_ISSUANCE_POLICY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.issuance_policy),
        }
    }

    /// The configured issuance policy
    #[must_use]
    pub fn policy(&self) -> Arc<dyn IssuancePolicy> {
        match self.issuance_policy {
            PolicyKind::Relay => Arc::new(RelayPolicy),
            PolicyKind::IssuerOnly => Arc::new(IssuerOnlyPolicy),
        }
    }
}
