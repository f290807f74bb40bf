//! Credential service: the caller-facing operations for one credential.
//!
//! Each operation reads the committed aggregate and the newest action of the
//! verified log, asks the [`CredentialMachine`] for a transition and proposes
//! it to the ledger. Folding reads the unfolded log segment, folds it with
//! [`reducer::fold`] and commits the result as a Fold transition.

use crate::environment::CredentialEnvironment;
use crate::error::{Corruption, ErrorKind, FoldError, IssueError, RevokeError, TransferError};
use crate::ledger::{Commit, CredentialLedger, LedgerError, Proposal};
use crate::machine::{CredentialMachine, Transition};
use crate::metrics::CredentialMetrics;
use crate::proof::TransitionKind;
use crate::reducer;
use crate::types::{
    AccountId, CredentialAction, CredentialAggregate, CredentialProperties, CredentialStatus,
    Timestamp,
};
use soulbound_core::action_log::{ActionLogError, LoggedAction, entries_after};
use soulbound_core::event::SerializedEvent;
use soulbound_core::pointer::{FoldPointer, verify_segment};
use soulbound_core::stream::AggregateId;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Operations on one credential account.
///
/// Operations are serialized through an internal async mutex, so one service
/// never races itself; the ledger's optimistic checks catch anyone else.
pub struct CredentialService {
    aggregate_id: AggregateId,
    ledger: Arc<dyn CredentialLedger>,
    env: CredentialEnvironment,
    max_fold_batch: Option<usize>,
    writer: Mutex<()>,
}

/// Snapshot of where the committed state and the log stand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingHead {
    /// Committed aggregate
    pub state: CredentialAggregate,
    /// Current log head
    pub head: FoldPointer,
    /// Newest action, if any
    pub latest: Option<CredentialAction>,
}

impl CredentialService {
    /// Creates a service for `aggregate_id`
    #[must_use]
    pub fn new(
        aggregate_id: AggregateId,
        ledger: Arc<dyn CredentialLedger>,
        env: CredentialEnvironment,
    ) -> Self {
        Self {
            aggregate_id,
            ledger,
            env,
            max_fold_batch: None,
            writer: Mutex::new(()),
        }
    }

    /// Limit how many actions one fold commit applies; `Some(0)` means no limit
    #[must_use]
    pub const fn with_max_fold_batch(mut self, max_fold_batch: Option<usize>) -> Self {
        self.max_fold_batch = match max_fold_batch {
            Some(0) => None,
            other => other,
        };
        self
    }

    /// The credential account this service operates on
    #[must_use]
    pub const fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    /// Issue the credential.
    ///
    /// # Errors
    ///
    /// See [`IssueError`]. Nothing changes on error.
    #[instrument(skip(self, props), fields(aggregate_id = %self.aggregate_id, owner = %props.owner_id))]
    pub async fn issue(&self, sender: &AccountId, props: CredentialProperties) -> Result<(), IssueError> {
        let _guard = self.writer.lock().await;

        let result = async {
            let prior = self.ledger.read_state(self.aggregate_id.clone()).await?;
            let head = self.head().await?;
            let transition = CredentialMachine::issue(&prior, sender, &props, self.env.policy.as_ref())?;
            self.commit(TransitionKind::Issue, prior, head, transition, sender).await?;
            Ok::<(), IssueError>(())
        }
        .await;

        self.observe(TransitionKind::Issue, &result, IssueError::kind);
        result
    }

    /// Revoke the credential at `now`.
    ///
    /// # Errors
    ///
    /// See [`RevokeError`]. Nothing changes on error.
    #[instrument(skip(self), fields(aggregate_id = %self.aggregate_id))]
    pub async fn revoke(&self, sender: &AccountId, now: Timestamp) -> Result<(), RevokeError> {
        let _guard = self.writer.lock().await;

        let result = async {
            let pending = self.load_pending().await?;
            let transition =
                CredentialMachine::revoke(&pending.state, pending.latest.as_ref(), sender, now)?;
            self.commit(TransitionKind::Revoke, pending.state, pending.head, transition, sender)
                .await?;
            Ok::<(), RevokeError>(())
        }
        .await;

        self.observe(TransitionKind::Revoke, &result, RevokeError::kind);
        result
    }

    /// Transfer the credential to `new_owner` at `now`.
    ///
    /// # Errors
    ///
    /// See [`TransferError`]. Nothing changes on error.
    #[instrument(skip(self), fields(aggregate_id = %self.aggregate_id))]
    pub async fn transfer(
        &self,
        sender: &AccountId,
        new_owner: &AccountId,
        now: Timestamp,
    ) -> Result<(), TransferError> {
        let _guard = self.writer.lock().await;

        let result = async {
            let pending = self.load_pending().await?;
            let transition = CredentialMachine::transfer(
                &pending.state,
                pending.latest.as_ref(),
                sender,
                new_owner,
                now,
            )?;
            self.commit(TransitionKind::Transfer, pending.state, pending.head, transition, sender)
                .await?;
            Ok::<(), TransferError>(())
        }
        .await;

        self.observe(TransitionKind::Transfer, &result, TransferError::kind);
        result
    }

    /// Fold all pending actions, commit, and return the resulting aggregate.
    ///
    /// # Errors
    ///
    /// [`FoldError::CorruptActionLog`] if the unfolded segment is missing or
    /// fails verification; the committed aggregate is left as it was.
    #[instrument(skip(self), fields(aggregate_id = %self.aggregate_id))]
    pub async fn current_state(&self) -> Result<CredentialAggregate, FoldError> {
        let _guard = self.writer.lock().await;

        let started = Instant::now();
        let result = self.fold_pending().await;
        match &result {
            Ok((state, folded)) => {
                CredentialMetrics::record_fold(*folded, started.elapsed());
                if *folded > 0 {
                    info!(folded, pointer = %state.last_fold_pointer, "folded pending actions");
                }
            }
            Err(e) => {
                CredentialMetrics::record_rejected(TransitionKind::Fold, e.kind());
                error!(error = %e, "fold failed");
            }
        }
        result.map(|(state, _)| state)
    }

    /// Every action ever dispatched, verified against the hash chain.
    ///
    /// Waits for any in-flight operation so the log is read between commits.
    ///
    /// # Errors
    ///
    /// [`FoldError::CorruptActionLog`] if any entry fails verification.
    pub async fn history(&self) -> Result<Vec<CredentialAction>, FoldError> {
        let _guard = self.writer.lock().await;
        let segment = self.segment_since(FoldPointer::EMPTY).await?;
        Ok(reducer::replay(FoldPointer::EMPTY, &segment)?)
    }

    /// Live view of the credential at the environment clock's current time.
    ///
    /// Reads only; nothing is folded or dispatched. Waits for any in-flight
    /// operation so state and log come from the same commit.
    ///
    /// # Errors
    ///
    /// [`FoldError`] if the state or newest action cannot be read.
    pub async fn status(&self) -> Result<CredentialStatus, FoldError> {
        let _guard = self.writer.lock().await;
        let pending = self.load_pending().await?;
        let now = Timestamp::from_datetime(self.env.clock.now());
        let state = &pending.state;
        let latest = pending.latest.as_ref();

        Ok(CredentialStatus {
            issued: state.is_issued(),
            owner_id: state.owner_id.clone(),
            issuer_id: state.issuer_id.clone(),
            revoked: state.was_revoked || latest.is_some_and(|a| a.was_revoked),
            transferred: state.was_transferred || latest.is_some_and(|a| a.was_transferred),
            expired: state.has_expired
                || latest.is_some_and(|a| a.has_expired || a.expired_at(now)),
            who_transferred_id: latest
                .map_or_else(|| state.who_transferred_id.clone(), |a| a.who_transferred_id.clone()),
            pending_actions: pending
                .head
                .position()
                .saturating_sub(state.last_fold_pointer.position()),
            as_of: now,
        })
    }

    /// Committed state, log head and decoded newest action.
    ///
    /// The whole log is verified against the hash chain before the newest
    /// entry is trusted, and the committed fold pointer must lie on it.
    ///
    /// # Errors
    ///
    /// [`Corruption`] if the log fails verification or the newest entry does
    /// not decode, or a [`LedgerError`] if storage fails; both surface through
    /// `FoldError`.
    pub async fn load_pending(&self) -> Result<PendingHead, FoldError> {
        let state = self.ledger.read_state(self.aggregate_id.clone()).await?;
        let log = self.segment_since(FoldPointer::EMPTY).await?;

        let head = verify_segment(FoldPointer::EMPTY, &log).map_err(Corruption::from)?;
        if entries_after(&log, state.last_fold_pointer).is_none() {
            return Err(Corruption::UnknownPointer(state.last_fold_pointer).into());
        }
        let latest = log.last().map(reducer::decode).transpose()?;

        Ok(PendingHead {
            state,
            head,
            latest,
        })
    }

    async fn head(&self) -> Result<FoldPointer, LedgerError> {
        Ok(self.ledger.head(self.aggregate_id.clone()).await?)
    }

    async fn segment_since(
        &self,
        pointer: FoldPointer,
    ) -> Result<Vec<LoggedAction>, Corruption> {
        self.ledger
            .actions_since(self.aggregate_id.clone(), pointer)
            .await
            .map_err(|e| match e {
                ActionLogError::UnknownPointer { pointer, .. } => Corruption::UnknownPointer(pointer),
                other => Corruption::Unavailable(other.to_string()),
            })
    }

    /// Fold in batches until the log is exhausted, committing each batch.
    async fn fold_pending(&self) -> Result<(CredentialAggregate, usize), FoldError> {
        let mut total = 0;
        loop {
            let prior = self.ledger.read_state(self.aggregate_id.clone()).await?;
            let segment = self.segment_since(prior.last_fold_pointer).await?;
            if segment.is_empty() {
                return Ok((prior, total));
            }

            let outcome = reducer::fold(&prior, &segment, self.max_fold_batch)?;
            if outcome.folded == 0 {
                return Ok((prior, total));
            }
            let proposal = Proposal::new(
                TransitionKind::Fold,
                prior,
                outcome.state,
                FoldPointer::EMPTY,
                None,
            )
            .map_err(LedgerError::from)?;
            let commit = self
                .ledger
                .propose_transition(self.aggregate_id.clone(), proposal)
                .await?;

            total += outcome.folded;
            if outcome.remaining == 0 {
                return Ok((commit.state, total));
            }
        }
    }

    async fn commit(
        &self,
        kind: TransitionKind,
        prior: CredentialAggregate,
        expected_head: FoldPointer,
        transition: Transition,
        sender: &AccountId,
    ) -> Result<Commit, LedgerError> {
        let metadata = serde_json::json!({
            "aggregate_id": self.aggregate_id.as_str(),
            "sender_id": sender.as_str(),
        });
        let event = SerializedEvent::from_event(&transition.action, Some(metadata))?;
        let proposal = Proposal::new(kind, prior, transition.next, expected_head, Some(event))?;
        let commit = self
            .ledger
            .propose_transition(self.aggregate_id.clone(), proposal)
            .await?;

        info!(
            operation = %kind,
            action = %transition.action.kind,
            head = %commit.head,
            "operation committed"
        );
        Ok(commit)
    }

    fn observe<E: fmt::Display>(
        &self,
        operation: TransitionKind,
        result: &Result<(), E>,
        kind: impl Fn(&E) -> ErrorKind,
    ) {
        match result {
            Ok(()) => CredentialMetrics::record_accepted(operation),
            Err(e) => {
                let kind = kind(e);
                CredentialMetrics::record_rejected(operation, kind);
                warn!(
                    aggregate_id = %self.aggregate_id,
                    operation = %operation,
                    kind = %kind,
                    error = %e,
                    "operation rejected"
                );
            }
        }
    }
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("aggregate_id", &self.aggregate_id)
            .field("env", &self.env)
            .field("max_fold_batch", &self.max_fold_batch)
            .finish_non_exhaustive()
    }
}
