//! The commitment platform boundary.
//!
//! A [`CredentialLedger`] stores one [`CredentialAggregate`] per credential
//! account alongside that account's action log. State only changes through
//! [`CredentialLedger::propose_transition`], which checks the proposal's
//! prior snapshot, its proof and the account permissions, then dispatches the
//! action and writes the next state as one atomic commit.

use crate::proof::{AttestationError, TransitionKind, TransitionProof};
use crate::types::CredentialAggregate;
use soulbound_core::action_log::{ActionLog, ActionLogError};
use soulbound_core::event::{EventError, SerializedEvent};
use soulbound_core::pointer::FoldPointer;
use soulbound_core::stream::AggregateId;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A proposed state transition for one credential.
#[derive(Clone, Debug)]
pub struct Proposal {
    /// Operation performed
    pub kind: TransitionKind,
    /// State the transition was computed from
    pub prior: CredentialAggregate,
    /// State to commit
    pub next: CredentialAggregate,
    /// Log head the action must be appended after
    pub expected_head: FoldPointer,
    /// Action to dispatch, absent for folds
    pub action: Option<SerializedEvent>,
    /// Attestation over all of the above except `expected_head`
    pub proof: TransitionProof,
}

impl Proposal {
    /// Builds a proposal and attests to it.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError`] if the transition cannot be encoded.
    pub fn new(
        kind: TransitionKind,
        prior: CredentialAggregate,
        next: CredentialAggregate,
        expected_head: FoldPointer,
        action: Option<SerializedEvent>,
    ) -> Result<Self, AttestationError> {
        let proof = TransitionProof::attest(kind, &prior, &next, action.as_ref())?;
        Ok(Self {
            kind,
            prior,
            next,
            expected_head,
            action,
            proof,
        })
    }
}

/// Result of an accepted proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// The committed state
    pub state: CredentialAggregate,
    /// Log head after the commit
    pub head: FoldPointer,
}

/// Why the platform refused a proposal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The proposal's prior snapshot is not the stored state
    #[error("prior state is stale")]
    StaleState,
    /// The proof does not match the proposal
    #[error("proof does not match the proposed transition")]
    InvalidProof,
    /// Owner changed outside Transfer after issuance
    #[error("owner is frozen outside transfer")]
    OwnerFrozen,
    /// Issuer changed after issuance
    #[error("issuer is frozen after issuance")]
    IssuerFrozen,
    /// Derived fields changed outside a fold, or regressed in one
    #[error("derived fields changed illegally")]
    DerivedMutation,
    /// An Issue, Revoke or Transfer carried no action
    #[error("operation must dispatch an action")]
    MissingAction,
    /// A fold tried to dispatch an action
    #[error("fold must not dispatch an action")]
    UnexpectedAction,
    /// The fold pointer moved backwards or off the log
    #[error("fold pointer does not advance along the log")]
    PointerRegressed,
}

/// Errors from ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The platform refused the proposal
    #[error("Transition rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Action log failure
    #[error(transparent)]
    Log(#[from] ActionLogError),

    /// Proposal could not be attested
    #[error(transparent)]
    Attestation(#[from] AttestationError),

    /// Action could not be encoded
    #[error(transparent)]
    Encoding(#[from] EventError),
}

/// Account permission rules applied to every proposal.
///
/// `head` is the current log head; a fold may advance the pointer up to it.
///
/// # Errors
///
/// Returns the first [`Rejection`] that applies.
pub fn check_permissions(proposal: &Proposal, head: FoldPointer) -> Result<(), Rejection> {
    let Proposal {
        kind, prior, next, ..
    } = proposal;

    match (kind, proposal.action.is_some()) {
        (TransitionKind::Fold, true) => return Err(Rejection::UnexpectedAction),
        (TransitionKind::Fold, false) => {}
        (_, false) => return Err(Rejection::MissingAction),
        (_, true) => {}
    }

    if prior.is_issued() {
        if next.issuer_id != prior.issuer_id {
            return Err(Rejection::IssuerFrozen);
        }
        if next.owner_id != prior.owner_id && *kind != TransitionKind::Transfer {
            return Err(Rejection::OwnerFrozen);
        }
    } else if *kind != TransitionKind::Issue && next != prior {
        return Err(Rejection::OwnerFrozen);
    }

    if *kind == TransitionKind::Fold {
        let from = prior.last_fold_pointer.position();
        let to = next.last_fold_pointer.position();
        if to < from || to > head.position() {
            return Err(Rejection::PointerRegressed);
        }
        let regressed = (prior.was_revoked && !next.was_revoked)
            || (prior.was_transferred && !next.was_transferred)
            || (prior.has_expired && !next.has_expired);
        if regressed {
            return Err(Rejection::DerivedMutation);
        }
    } else {
        let derived_changed = next.last_fold_pointer != prior.last_fold_pointer
            || next.has_expired != prior.has_expired
            || next.was_revoked != prior.was_revoked
            || next.was_transferred != prior.was_transferred
            || next.who_transferred_id != prior.who_transferred_id;
        if derived_changed {
            return Err(Rejection::DerivedMutation);
        }
    }

    Ok(())
}

/// The platform: aggregate storage plus the action log.
///
/// # Design Note
///
/// Like [`ActionLog`], methods return boxed futures so the ledger can be
/// shared as `Arc<dyn CredentialLedger>`.
pub trait CredentialLedger: ActionLog {
    /// Current committed state; unissued if nothing was ever committed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Log`] if backing storage failed.
    fn read_state(
        &self,
        aggregate_id: AggregateId,
    ) -> Pin<Box<dyn Future<Output = Result<CredentialAggregate, LedgerError>> + Send + '_>>;

    /// Atomically validate and commit a transition.
    ///
    /// Either the action is dispatched and `next` stored, or nothing changes.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Rejected`]: stale prior, bad proof or permission failure
    /// - [`LedgerError::Log`]: the log head moved or storage failed
    fn propose_transition(
        &self,
        aggregate_id: AggregateId,
        proposal: Proposal,
    ) -> Pin<Box<dyn Future<Output = Result<Commit, LedgerError>> + Send + '_>>;
}
