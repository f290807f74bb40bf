//! In-process commitment platform.
//!
//! [`InMemoryLedger`] keeps aggregates and action logs in one map behind a
//! single `tokio` lock. A commit checks everything first and only then
//! appends and stores, so a rejected proposal never leaves a trace.

use crate::ledger::{Commit, CredentialLedger, LedgerError, Proposal, Rejection, check_permissions};
use crate::types::CredentialAggregate;
use soulbound_core::action_log::{ActionLog, ActionLogError, LoggedAction, entries_after};
use soulbound_core::event::SerializedEvent;
use soulbound_core::pointer::FoldPointer;
use soulbound_core::stream::AggregateId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Account {
    state: CredentialAggregate,
    log: Vec<LoggedAction>,
}

impl Account {
    fn head(&self) -> FoldPointer {
        self.log.last().map_or(FoldPointer::EMPTY, |entry| entry.pointer)
    }

    fn append(
        &mut self,
        aggregate_id: &AggregateId,
        expected_head: Option<FoldPointer>,
        event: SerializedEvent,
    ) -> Result<FoldPointer, ActionLogError> {
        let head = self.head();
        if let Some(expected) = expected_head {
            if expected != head {
                return Err(ActionLogError::HeadMismatch {
                    aggregate_id: aggregate_id.clone(),
                    expected,
                    actual: head,
                });
            }
        }
        let pointer = head.advance(&event);
        self.log.push(LoggedAction { pointer, event });
        Ok(pointer)
    }
}

/// In-memory credential ledger.
///
/// Clones share storage.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    accounts: Arc<RwLock<HashMap<AggregateId, Account>>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of log entries for `aggregate_id`
    pub async fn log_len(&self, aggregate_id: &AggregateId) -> usize {
        self.accounts
            .read()
            .await
            .get(aggregate_id)
            .map_or(0, |account| account.log.len())
    }

    /// Overwrite the payload of the entry at zero-based `index`, leaving its
    /// pointer as it was. Returns `false` if there is no such entry.
    ///
    /// Fault injection for tests.
    pub async fn tamper_action(&self, aggregate_id: &AggregateId, index: usize, data: Vec<u8>) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts
            .get_mut(aggregate_id)
            .and_then(|account| account.log.get_mut(index))
        {
            Some(entry) => {
                entry.event.data = data;
                true
            }
            None => false,
        }
    }

    /// Drop every log entry from zero-based `index` onwards.
    ///
    /// Fault injection for tests.
    pub async fn truncate_log(&self, aggregate_id: &AggregateId, index: usize) {
        if let Some(account) = self.accounts.write().await.get_mut(aggregate_id) {
            account.log.truncate(index);
        }
    }

    async fn commit(&self, aggregate_id: AggregateId, proposal: Proposal) -> Result<Commit, LedgerError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.entry(aggregate_id.clone()).or_default();

        if proposal.prior != account.state {
            return Err(Rejection::StaleState.into());
        }
        if !proposal.proof.verify(
            proposal.kind,
            &proposal.prior,
            &proposal.next,
            proposal.action.as_ref(),
        ) {
            return Err(Rejection::InvalidProof.into());
        }
        check_permissions(&proposal, account.head())?;
        if entries_after(&account.log, proposal.next.last_fold_pointer).is_none() {
            return Err(Rejection::PointerRegressed.into());
        }

        let Proposal {
            kind,
            next,
            expected_head,
            action,
            ..
        } = proposal;

        let head = match action {
            Some(event) => account.append(&aggregate_id, Some(expected_head), event)?,
            None => account.head(),
        };
        account.state = next;

        debug!(
            aggregate_id = %aggregate_id,
            kind = %kind,
            head = %head,
            "transition committed"
        );

        Ok(Commit {
            state: account.state.clone(),
            head,
        })
    }
}

impl ActionLog for InMemoryLedger {
    fn dispatch_action(
        &self,
        aggregate_id: AggregateId,
        expected_head: Option<FoldPointer>,
        action: SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<FoldPointer, ActionLogError>> + Send + '_>> {
        Box::pin(async move {
            let mut accounts = self.accounts.write().await;
            let account = accounts.entry(aggregate_id.clone()).or_default();
            account.append(&aggregate_id, expected_head, action)
        })
    }

    fn actions_since(
        &self,
        aggregate_id: AggregateId,
        pointer: FoldPointer,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<LoggedAction>, ActionLogError>> + Send + '_>> {
        Box::pin(async move {
            let accounts = self.accounts.read().await;
            let log = accounts
                .get(&aggregate_id)
                .map_or(&[][..], |account| account.log.as_slice());
            entries_after(log, pointer)
                .map(<[LoggedAction]>::to_vec)
                .ok_or(ActionLogError::UnknownPointer {
                    aggregate_id,
                    pointer,
                })
        })
    }

    fn head(
        &self,
        aggregate_id: AggregateId,
    ) -> Pin<Box<dyn Future<Output = Result<FoldPointer, ActionLogError>> + Send + '_>> {
        Box::pin(async move {
            let accounts = self.accounts.read().await;
            Ok(accounts
                .get(&aggregate_id)
                .map_or(FoldPointer::EMPTY, Account::head))
        })
    }
}

impl CredentialLedger for InMemoryLedger {
    fn read_state(
        &self,
        aggregate_id: AggregateId,
    ) -> Pin<Box<dyn Future<Output = Result<CredentialAggregate, LedgerError>> + Send + '_>> {
        Box::pin(async move {
            let accounts = self.accounts.read().await;
            Ok(accounts
                .get(&aggregate_id)
                .map(|account| account.state.clone())
                .unwrap_or_default())
        })
    }

    fn propose_transition(
        &self,
        aggregate_id: AggregateId,
        proposal: Proposal,
    ) -> Pin<Box<dyn Future<Output = Result<Commit, LedgerError>> + Send + '_>> {
        Box::pin(self.commit(aggregate_id, proposal))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proof::TransitionKind;
    use crate::types::AccountId;

    fn issued() -> CredentialAggregate {
        CredentialAggregate {
            owner_id: AccountId::new("owner"),
            issuer_id: AccountId::new("issuer"),
            ..CredentialAggregate::new()
        }
    }

    fn event(byte: u8) -> SerializedEvent {
        SerializedEvent::new("CredentialIssued.v1".to_string(), vec![byte], None)
    }

    #[tokio::test]
    async fn unknown_account_reads_as_unissued() {
        let ledger = InMemoryLedger::new();
        let state = ledger.read_state(AggregateId::new("nobody")).await.unwrap();
        assert_eq!(state, CredentialAggregate::new());
    }

    #[tokio::test]
    async fn commit_appends_and_stores_together() {
        let ledger = InMemoryLedger::new();
        let id = AggregateId::new("c-1");
        let proposal = Proposal::new(
            TransitionKind::Issue,
            CredentialAggregate::new(),
            issued(),
            FoldPointer::EMPTY,
            Some(event(1)),
        )
        .unwrap();

        let commit = ledger.propose_transition(id.clone(), proposal).await.unwrap();

        assert_eq!(commit.state, issued());
        assert_eq!(commit.head.position(), 1);
        assert_eq!(ledger.read_state(id.clone()).await.unwrap(), issued());
        assert_eq!(ledger.head(id).await.unwrap(), commit.head);
    }

    #[tokio::test]
    async fn head_mismatch_leaves_nothing_behind() {
        let ledger = InMemoryLedger::new();
        let id = AggregateId::new("c-1");
        ledger.dispatch_action(id.clone(), None, event(9)).await.unwrap();

        let proposal = Proposal::new(
            TransitionKind::Issue,
            CredentialAggregate::new(),
            issued(),
            FoldPointer::EMPTY,
            Some(event(1)),
        )
        .unwrap();
        let result = ledger.propose_transition(id.clone(), proposal).await;

        assert!(matches!(
            result,
            Err(LedgerError::Log(ActionLogError::HeadMismatch { .. }))
        ));
        assert_eq!(ledger.read_state(id.clone()).await.unwrap(), CredentialAggregate::new());
        assert_eq!(ledger.log_len(&id).await, 1);
    }

    #[tokio::test]
    async fn forged_proof_is_rejected() {
        let ledger = InMemoryLedger::new();
        let id = AggregateId::new("c-1");
        let mut proposal = Proposal::new(
            TransitionKind::Issue,
            CredentialAggregate::new(),
            issued(),
            FoldPointer::EMPTY,
            Some(event(1)),
        )
        .unwrap();
        proposal.next.owner_id = AccountId::new("mallory");

        let result = ledger.propose_transition(id.clone(), proposal).await;
        assert!(matches!(result, Err(LedgerError::Rejected(Rejection::InvalidProof))));
        assert_eq!(ledger.log_len(&id).await, 0);
    }

    #[tokio::test]
    async fn fold_to_foreign_pointer_is_rejected() {
        let ledger = InMemoryLedger::new();
        let id = AggregateId::new("c-1");
        ledger.dispatch_action(id.clone(), None, event(1)).await.unwrap();

        let mut next = CredentialAggregate::new();
        next.last_fold_pointer = FoldPointer::EMPTY.advance(&event(2));
        let proposal = Proposal::new(
            TransitionKind::Fold,
            CredentialAggregate::new(),
            next,
            FoldPointer::EMPTY,
            None,
        )
        .unwrap();

        let result = ledger.propose_transition(id, proposal).await;
        assert!(matches!(result, Err(LedgerError::Rejected(Rejection::PointerRegressed))));
    }

    #[tokio::test]
    async fn fault_hooks_modify_the_log() {
        let ledger = InMemoryLedger::new();
        let id = AggregateId::new("c-1");
        ledger.dispatch_action(id.clone(), None, event(1)).await.unwrap();
        ledger.dispatch_action(id.clone(), None, event(2)).await.unwrap();

        assert!(ledger.tamper_action(&id, 1, vec![7]).await);
        assert!(!ledger.tamper_action(&id, 2, vec![7]).await);

        ledger.truncate_log(&id, 1).await;
        assert_eq!(ledger.log_len(&id).await, 1);
    }
}
