//! Transition attestations.
//!
//! Every proposal to the ledger carries a [`TransitionProof`] binding the
//! operation, the prior and next aggregate, and the dispatched action bytes.
//! The ledger recomputes it and rejects any mismatch. The attestation is a
//! SHA-256 digest; a zero-knowledge prover would sit behind the same type.

use crate::types::CredentialAggregate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use soulbound_core::event::SerializedEvent;
use std::fmt;
use thiserror::Error;

const DOMAIN_TAG: &[u8] = b"soulbound.transition.v1";

/// Which operation a proposal performs
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// First issuance; dispatches ISSUED
    Issue,
    /// Revocation; dispatches REVOKED
    Revoke,
    /// Ownership change; dispatches TRANSFERRED
    Transfer,
    /// Folds pending actions; dispatches nothing
    Fold,
}

impl TransitionKind {
    /// Stable lowercase name, used in logs and metric labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Revoke => "revoke",
            Self::Transfer => "transfer",
            Self::Fold => "fold",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition could not be encoded for attestation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to encode transition for attestation: {0}")]
pub struct AttestationError(String);

/// Digest attesting to one transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionProof {
    kind: TransitionKind,
    digest: [u8; 32],
}

impl TransitionProof {
    /// Attest to `prior → next` under `kind`, dispatching `action` if any.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError`] if either aggregate fails to encode.
    pub fn attest(
        kind: TransitionKind,
        prior: &CredentialAggregate,
        next: &CredentialAggregate,
        action: Option<&SerializedEvent>,
    ) -> Result<Self, AttestationError> {
        let states =
            bincode::serialize(&(kind, prior, next)).map_err(|e| AttestationError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(&states);
        match action {
            Some(event) => {
                hasher.update([1]);
                hasher.update(event.event_type.as_bytes());
                hasher.update([0]);
                hasher.update(&event.data);
            }
            None => hasher.update([0]),
        }

        Ok(Self {
            kind,
            digest: hasher.finalize().into(),
        })
    }

    /// Whether this proof attests to exactly the given transition.
    #[must_use]
    pub fn verify(
        &self,
        kind: TransitionKind,
        prior: &CredentialAggregate,
        next: &CredentialAggregate,
        action: Option<&SerializedEvent>,
    ) -> bool {
        Self::attest(kind, prior, next, action).is_ok_and(|expected| expected == *self)
    }

    /// The operation this proof covers
    #[must_use]
    pub const fn kind(&self) -> TransitionKind {
        self.kind
    }
}

impl fmt::Display for TransitionProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, hex::encode(&self.digest[..8]))
    }
}
