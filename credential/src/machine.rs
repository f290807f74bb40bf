//! Credential state machine.
//!
//! Pure decision logic: given the committed aggregate, the newest pending
//! action and a requested operation, decide whether the operation is legal and
//! compute the action to dispatch and the next aggregate. No I/O.
//!
//! ```text
//! Unissued ──Issue──► Issued ─┬─ Revoke   (issuer, revocable, not yet revoked)
//!                             ├─ Transfer (owner, transferable, not revoked)
//!                             └─ expiry   (evaluated at every dispatch)
//! ```

use crate::environment::IssuancePolicy;
use crate::error::{Corruption, IssueError, RevokeError, TransferError};
use crate::types::{AccountId, ActionKind, CredentialAction, CredentialAggregate, CredentialProperties, Timestamp};

/// An accepted operation: the action to dispatch and the state to commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Action to append to the log
    pub action: CredentialAction,
    /// Aggregate after the synchronous field updates
    pub next: CredentialAggregate,
}

/// Validates operations and builds their transitions.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialMachine;

impl CredentialMachine {
    /// Issue a credential.
    ///
    /// Checks, in order: not yet issued, both identities present, policy.
    ///
    /// # Errors
    ///
    /// [`IssueError::AlreadyIssued`], [`IssueError::MissingIdentity`] or
    /// [`IssueError::Unauthorized`].
    pub fn issue(
        state: &CredentialAggregate,
        sender: &AccountId,
        props: &CredentialProperties,
        policy: &dyn IssuancePolicy,
    ) -> Result<Transition, IssueError> {
        if state.is_issued() {
            return Err(IssueError::AlreadyIssued);
        }
        if props.owner_id.is_empty() || props.issuer_id.is_empty() {
            return Err(IssueError::MissingIdentity);
        }
        policy
            .authorize(sender, props)
            .map_err(|reason| IssueError::Unauthorized {
                sender: sender.to_string(),
                reason,
            })?;

        let action = CredentialAction {
            kind: ActionKind::Issued,
            action_utc: props.issued_utc,
            sender_id: sender.clone(),
            origin_id: props.origin_id.clone(),
            issued_utc: props.issued_utc,
            expires_utc: props.expires_utc,
            is_revocable: props.is_revocable,
            is_transferable: props.is_transferable,
            has_expired: false,
            was_revoked: false,
            was_transferred: false,
            who_transferred_id: AccountId::EMPTY,
        };

        let next = CredentialAggregate {
            owner_id: props.owner_id.clone(),
            issuer_id: props.issuer_id.clone(),
            ..state.clone()
        };

        Ok(Transition { action, next })
    }

    /// Revoke a credential at `now`.
    ///
    /// Checks, in order: issued, sender is issuer, revocable, not yet revoked.
    ///
    /// # Errors
    ///
    /// [`RevokeError::NotIssued`], [`RevokeError::NotIssuer`],
    /// [`RevokeError::NotRevocable`], [`RevokeError::AlreadyRevoked`], or
    /// [`RevokeError::CorruptActionLog`] if an issued credential has no actions.
    pub fn revoke(
        state: &CredentialAggregate,
        latest: Option<&CredentialAction>,
        sender: &AccountId,
        now: Timestamp,
    ) -> Result<Transition, RevokeError> {
        if !state.is_issued() {
            return Err(RevokeError::NotIssued);
        }
        if *sender != state.issuer_id {
            return Err(RevokeError::NotIssuer(sender.to_string()));
        }
        let head = latest.ok_or(Corruption::MissingHistory)?;
        if !head.is_revocable {
            return Err(RevokeError::NotRevocable);
        }
        if head.was_revoked || state.was_revoked {
            return Err(RevokeError::AlreadyRevoked);
        }

        let mut action = carry_forward(head, ActionKind::Revoked, sender, now);
        action.was_revoked = true;

        Ok(Transition {
            action,
            next: state.clone(),
        })
    }

    /// Transfer a credential to `new_owner` at `now`.
    ///
    /// Checks, in order: issued, sender is owner, transferable, not revoked,
    /// recipient present.
    ///
    /// # Errors
    ///
    /// [`TransferError::NotIssued`], [`TransferError::NotOwner`],
    /// [`TransferError::NotTransferable`], [`TransferError::Revoked`],
    /// [`TransferError::EmptyRecipient`], or
    /// [`TransferError::CorruptActionLog`] if an issued credential has no actions.
    pub fn transfer(
        state: &CredentialAggregate,
        latest: Option<&CredentialAction>,
        sender: &AccountId,
        new_owner: &AccountId,
        now: Timestamp,
    ) -> Result<Transition, TransferError> {
        if !state.is_issued() {
            return Err(TransferError::NotIssued);
        }
        if *sender != state.owner_id {
            return Err(TransferError::NotOwner(sender.to_string()));
        }
        let head = latest.ok_or(Corruption::MissingHistory)?;
        if !head.is_transferable {
            return Err(TransferError::NotTransferable);
        }
        if head.was_revoked || state.was_revoked {
            return Err(TransferError::Revoked);
        }
        if new_owner.is_empty() {
            return Err(TransferError::EmptyRecipient);
        }

        let mut action = carry_forward(head, ActionKind::Transferred, sender, now);
        action.was_transferred = true;
        action.who_transferred_id = sender.clone();

        let next = CredentialAggregate {
            owner_id: new_owner.clone(),
            ..state.clone()
        };

        Ok(Transition { action, next })
    }
}

/// A new action with fixed fields and cumulative flags copied from `head` and
/// expiry re-evaluated at `now`.
fn carry_forward(
    head: &CredentialAction,
    kind: ActionKind,
    sender: &AccountId,
    now: Timestamp,
) -> CredentialAction {
    CredentialAction {
        kind,
        action_utc: now,
        sender_id: sender.clone(),
        has_expired: head.has_expired || head.expired_at(now),
        ..head.clone()
    }
}
