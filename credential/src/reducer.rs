//! Action-log folding.
//!
//! [`CredentialReducer`] is the fold step: it merges one action's derived
//! flags into the aggregate. [`fold`] verifies a log segment against the
//! aggregate's pointer, decodes it and folds it onto a copy, so a failure
//! anywhere leaves the input untouched.

use crate::error::Corruption;
use crate::types::{ActionKind, CredentialAction, CredentialAggregate};
use soulbound_core::action_log::LoggedAction;
use soulbound_core::event::EventError;
use soulbound_core::pointer::{FoldPointer, verify_segment};
use soulbound_core::reducer::Reducer;
use tracing::debug;

/// Folds lifecycle actions into the aggregate's derived fields.
///
/// Every flag is OR-accumulated, so folding is monotone and the order of
/// batches does not matter as long as log order is kept within them.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialReducer;

impl CredentialReducer {
    /// Creates a new credential reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CredentialReducer {
    type State = CredentialAggregate;
    type Action = CredentialAction;
    type Environment = ();

    fn reduce(&self, state: &mut Self::State, action: &Self::Action, _env: &Self::Environment) {
        state.was_revoked |= action.kind == ActionKind::Revoked;
        state.was_transferred |= action.kind == ActionKind::Transferred;
        state.has_expired |= action.expired_at(action.action_utc);
        if action.kind == ActionKind::Transferred {
            state.who_transferred_id = action.who_transferred_id.clone();
        }
    }
}

/// Decode a stored entry as a credential action.
///
/// # Errors
///
/// [`Corruption::Undecodable`] if the payload does not decode, or
/// [`Corruption::KindMismatch`] if its kind disagrees with the stored type name.
pub fn decode(logged: &LoggedAction) -> Result<CredentialAction, Corruption> {
    let position = logged.pointer.position();
    logged
        .event
        .decode::<CredentialAction>()
        .map_err(|error| match error {
            EventError::UnknownEventType(_) => Corruption::KindMismatch {
                position,
                event_type: logged.event.event_type.clone(),
            },
            other => Corruption::Undecodable {
                position,
                reason: other.to_string(),
            },
        })
}

/// Verify and decode an entire segment starting at `start`.
///
/// # Errors
///
/// Any [`Corruption`] found in the segment.
pub fn replay(start: FoldPointer, segment: &[LoggedAction]) -> Result<Vec<CredentialAction>, Corruption> {
    verify_segment(start, segment)?;
    segment.iter().map(decode).collect()
}

/// Result of one fold pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldOutcome {
    /// Aggregate with the folded actions applied and the pointer advanced
    pub state: CredentialAggregate,
    /// Actions applied in this pass
    pub folded: usize,
    /// Actions left in the segment because of the batch limit
    pub remaining: usize,
}

/// Fold `segment`, the entries after `state.last_fold_pointer`, onto a copy of
/// `state`. At most `limit` entries are applied when a limit is given.
///
/// # Errors
///
/// Any [`Corruption`] in the applied entries. No partial result is returned.
pub fn fold(
    state: &CredentialAggregate,
    segment: &[LoggedAction],
    limit: Option<usize>,
) -> Result<FoldOutcome, Corruption> {
    let take = limit.map_or(segment.len(), |limit| limit.min(segment.len()));
    let (batch, rest) = segment.split_at(take);

    let pointer = verify_segment(state.last_fold_pointer, batch)?;
    let actions = batch.iter().map(decode).collect::<Result<Vec<_>, _>>()?;

    let mut next = state.clone();
    for (action, logged) in actions.iter().zip(batch) {
        debug!(
            position = logged.pointer.position(),
            kind = %action.kind,
            "folding action"
        );
        CredentialReducer.reduce(&mut next, action, &());
    }
    next.last_fold_pointer = pointer;

    Ok(FoldOutcome {
        state: next,
        folded: batch.len(),
        remaining: rest.len(),
    })
}
