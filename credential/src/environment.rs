//! Injected dependencies for credential operations.

use crate::types::{AccountId, CredentialProperties};
use soulbound_core::environment::Clock;
use std::fmt;
use std::sync::Arc;

/// Decides who may dispatch an issuance.
///
/// Issuance is typically relayed by an automated origin service rather than
/// sent by the issuer itself, so the check is a deployment choice.
pub trait IssuancePolicy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// `Ok(())` if `sender` may issue `props`, otherwise the reason it may not.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason on refusal.
    fn authorize(&self, sender: &AccountId, props: &CredentialProperties) -> Result<(), String>;
}

/// Any sender may issue on behalf of a named origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayPolicy;

impl IssuancePolicy for RelayPolicy {
    fn name(&self) -> &'static str {
        "relay"
    }

    fn authorize(&self, _sender: &AccountId, props: &CredentialProperties) -> Result<(), String> {
        if props.origin_id.is_empty() {
            Err("relayed issuance requires an origin".to_string())
        } else {
            Ok(())
        }
    }
}

/// Only the issuer may issue.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssuerOnlyPolicy;

impl IssuancePolicy for IssuerOnlyPolicy {
    fn name(&self) -> &'static str {
        "issuer-only"
    }

    fn authorize(&self, sender: &AccountId, props: &CredentialProperties) -> Result<(), String> {
        if *sender == props.issuer_id {
            Ok(())
        } else {
            Err(format!("sender is not issuer {}", props.issuer_id))
        }
    }
}

/// Environment for credential operations
#[derive(Clone)]
pub struct CredentialEnvironment {
    /// Clock for live status views
    pub clock: Arc<dyn Clock>,
    /// Issuance authorization
    pub policy: Arc<dyn IssuancePolicy>,
}

impl CredentialEnvironment {
    /// Creates a new credential environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: Arc<dyn IssuancePolicy>) -> Self {
        Self { clock, policy }
    }
}

impl fmt::Debug for CredentialEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEnvironment")
            .field("now", &self.clock.now())
            .field("policy", &self.policy.name())
            .finish()
    }
}
