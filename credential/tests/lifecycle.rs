//! Integration tests for the credential lifecycle
//!
//! Drives [`CredentialService`] against the in-memory ledger through issue,
//! revoke, transfer and fold.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use soulbound_core::environment::Clock;
use soulbound_core::stream::AggregateId;
use soulbound_credential::{
    AccountId, ActionKind, CredentialEnvironment, CredentialProperties, CredentialService,
    ErrorKind, InMemoryLedger, IssueError, IssuerOnlyPolicy, RelayPolicy, RevokeError, Timestamp,
    TransferError,
};
use soulbound_testing::{FixedClock, test_clock};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

const ISSUED_AT: u64 = 1_000;
const EXPIRES_AT: u64 = 5_000;

fn id(s: &str) -> AccountId {
    AccountId::new(s)
}

fn env_with(clock: FixedClock) -> CredentialEnvironment {
    CredentialEnvironment::new(Arc::new(clock), Arc::new(RelayPolicy))
}

fn service() -> CredentialService {
    CredentialService::new(
        AggregateId::new("credential-1"),
        Arc::new(InMemoryLedger::new()),
        env_with(test_clock()),
    )
}

fn props() -> CredentialProperties {
    CredentialProperties::new(id("issuer"), id("alice"), id("relay-app"), Timestamp::from_millis(ISSUED_AT))
        .revocable(true)
        .transferable(true)
}

async fn issued(props: CredentialProperties) -> CredentialService {
    let service = service();
    service.issue(&id("relay"), props).await.unwrap();
    service
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn issue_sets_identities_and_leaves_flags_clear() {
    let service = issued(props()).await;

    let state = service.current_state().await.unwrap();

    assert_eq!(state.owner_id, id("alice"));
    assert_eq!(state.issuer_id, id("issuer"));
    assert!(!state.has_expired);
    assert!(!state.was_revoked);
    assert!(!state.was_transferred);
    assert!(state.who_transferred_id.is_empty());
    assert_eq!(state.last_fold_pointer.position(), 1);
}

#[tokio::test]
async fn revoke_then_transfer_is_refused() {
    let service = issued(props()).await;

    service.revoke(&id("issuer"), Timestamp::from_millis(2_000)).await.unwrap();
    let state = service.current_state().await.unwrap();
    assert!(state.was_revoked);

    let result = service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(3_000)).await;
    assert!(matches!(result, Err(TransferError::Revoked)));
}

#[tokio::test]
async fn non_transferable_credential_stays_with_owner() {
    let service = issued(props().transferable(false)).await;

    let result = service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_000)).await;

    assert!(matches!(result, Err(TransferError::NotTransferable)));
    let state = service.current_state().await.unwrap();
    assert_eq!(state.owner_id, id("alice"));
    assert!(!state.was_transferred);
}

#[tokio::test]
async fn chained_transfers_track_previous_owner() {
    let service = issued(props()).await;

    service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_000)).await.unwrap();
    let state = service.current_state().await.unwrap();
    assert_eq!(state.owner_id, id("bob"));
    assert_eq!(state.who_transferred_id, id("alice"));
    assert!(state.was_transferred);

    service.transfer(&id("bob"), &id("carol"), Timestamp::from_millis(3_000)).await.unwrap();
    let state = service.current_state().await.unwrap();
    assert_eq!(state.owner_id, id("carol"));
    assert_eq!(state.who_transferred_id, id("bob"));
}

#[tokio::test]
async fn expiry_is_decided_by_the_action_time() {
    let expiring = props().expires_at(Timestamp::from_millis(EXPIRES_AT));

    let late = issued(expiring.clone()).await;
    late.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(EXPIRES_AT)).await.unwrap();
    assert!(late.current_state().await.unwrap().has_expired);

    let early = issued(expiring).await;
    early.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(EXPIRES_AT - 1)).await.unwrap();
    assert!(!early.current_state().await.unwrap().has_expired);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn only_one_issue_succeeds() {
    let service = issued(props()).await;

    for sender in ["relay", "issuer", "alice"] {
        let result = service.issue(&id(sender), props()).await;
        assert!(matches!(result, Err(IssueError::AlreadyIssued)));
    }

    let history = service.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, ActionKind::Issued);
}

#[tokio::test]
async fn revoke_never_moves_the_owner() {
    let service = issued(props()).await;

    service.revoke(&id("issuer"), Timestamp::from_millis(2_000)).await.unwrap();

    assert_eq!(service.current_state().await.unwrap().owner_id, id("alice"));
}

#[tokio::test]
async fn revocation_survives_later_folds() {
    let service = issued(props()).await;
    service.revoke(&id("issuer"), Timestamp::from_millis(2_000)).await.unwrap();
    assert!(service.current_state().await.unwrap().was_revoked);

    assert!(service.revoke(&id("issuer"), Timestamp::from_millis(3_000)).await.is_err());
    let state = service.current_state().await.unwrap();
    assert!(state.was_revoked);
    assert_eq!(state.last_fold_pointer.position(), 2);
}

#[tokio::test]
async fn pending_revocation_blocks_transfer_before_any_fold() {
    let service = issued(props()).await;

    service.revoke(&id("issuer"), Timestamp::from_millis(2_000)).await.unwrap();
    let result = service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_500)).await;

    assert!(matches!(result, Err(TransferError::Revoked)));
    assert!(matches!(
        service.revoke(&id("issuer"), Timestamp::from_millis(2_600)).await,
        Err(RevokeError::AlreadyRevoked)
    ));
}

#[tokio::test]
async fn failed_transfer_leaves_state_and_log_untouched() {
    let ledger = Arc::new(InMemoryLedger::new());
    let aggregate_id = AggregateId::new("credential-untouched");
    let service = CredentialService::new(aggregate_id.clone(), ledger.clone(), env_with(test_clock()));
    service.issue(&id("relay"), props().transferable(false)).await.unwrap();
    let before = service.load_pending().await.unwrap();

    let result = service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_000)).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotTransferable);
    assert_eq!(service.load_pending().await.unwrap(), before);
    assert_eq!(ledger.log_len(&aggregate_id).await, 1);
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn only_the_issuer_revokes() {
    let service = issued(props()).await;

    let result = service.revoke(&id("alice"), Timestamp::from_millis(2_000)).await;

    assert!(matches!(result, Err(RevokeError::NotIssuer(sender)) if sender == "alice"));
}

#[tokio::test]
async fn non_revocable_credential_cannot_be_revoked() {
    let service = issued(props().revocable(false)).await;

    let result = service.revoke(&id("issuer"), Timestamp::from_millis(2_000)).await;

    assert!(matches!(result, Err(RevokeError::NotRevocable)));
}

#[tokio::test]
async fn previous_owner_loses_transfer_rights() {
    let service = issued(props()).await;
    service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_000)).await.unwrap();

    let result = service.transfer(&id("alice"), &id("carol"), Timestamp::from_millis(3_000)).await;

    assert!(matches!(result, Err(TransferError::NotOwner(_))));
}

#[tokio::test]
async fn operations_on_unissued_credential_fail() {
    let service = service();

    assert!(matches!(
        service.revoke(&id("issuer"), Timestamp::from_millis(1)).await,
        Err(RevokeError::NotIssued)
    ));
    assert!(matches!(
        service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(1)).await,
        Err(TransferError::NotIssued)
    ));
    assert_eq!(service.current_state().await.unwrap().last_fold_pointer.position(), 0);
}

#[tokio::test]
async fn issuer_only_policy_refuses_relays() {
    let env = CredentialEnvironment::new(Arc::new(test_clock()), Arc::new(IssuerOnlyPolicy));
    let service = CredentialService::new(AggregateId::new("strict"), Arc::new(InMemoryLedger::new()), env);

    let result = service.issue(&id("relay"), props()).await;
    assert!(matches!(result, Err(IssueError::Unauthorized { .. })));

    service.issue(&id("issuer"), props()).await.unwrap();
    assert!(service.current_state().await.unwrap().is_issued());
}

#[tokio::test]
async fn transfer_to_empty_account_is_refused() {
    let service = issued(props()).await;

    let result = service.transfer(&id("alice"), &AccountId::EMPTY, Timestamp::from_millis(2_000)).await;

    assert!(matches!(result, Err(TransferError::EmptyRecipient)));
}

// ============================================================================
// Read views
// ============================================================================

#[tokio::test]
async fn status_reports_live_expiry_without_folding() {
    let clock = test_clock();
    let now = Timestamp::from_datetime(clock.now());
    let service = CredentialService::new(
        AggregateId::new("credential-status"),
        Arc::new(InMemoryLedger::new()),
        env_with(clock),
    );
    let props = CredentialProperties::new(id("issuer"), id("alice"), id("relay-app"), Timestamp::from_millis(ISSUED_AT))
        .revocable(true)
        .expires_at(now);
    service.issue(&id("relay"), props).await.unwrap();

    let status = service.status().await.unwrap();

    assert!(status.issued);
    assert!(status.expired);
    assert!(!status.is_valid());
    assert_eq!(status.pending_actions, 1);
    assert_eq!(status.as_of, now);
    // Dispatch-time flag is untouched until an action lands after expiry.
    assert!(!service.current_state().await.unwrap().has_expired);
}

#[tokio::test]
async fn status_counts_pending_revocation() {
    let service = issued(props()).await;
    service.current_state().await.unwrap();
    service.revoke(&id("issuer"), Timestamp::from_millis(2_000)).await.unwrap();

    let status = service.status().await.unwrap();

    assert!(status.revoked);
    assert_eq!(status.pending_actions, 1);
    assert!(!service.load_pending().await.unwrap().state.was_revoked);
}

#[tokio::test]
async fn history_lists_every_action_in_order() {
    let service = issued(props()).await;
    service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_000)).await.unwrap();
    service.revoke(&id("issuer"), Timestamp::from_millis(3_000)).await.unwrap();

    let history = service.history().await.unwrap();

    let kinds: Vec<_> = history.iter().map(|action| action.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Issued, ActionKind::Transferred, ActionKind::Revoked]);
    assert_eq!(history[0].action_utc, Timestamp::from_millis(ISSUED_AT));
    assert_eq!(history[0].sender_id, id("relay"));
    assert!(history[2].was_transferred && history[2].was_revoked);
    assert_eq!(history[2].who_transferred_id, id("alice"));
}

// ============================================================================
// Fold batching and concurrent reads
// ============================================================================

#[tokio::test]
async fn zero_batch_limit_folds_everything() {
    let service = service().with_max_fold_batch(Some(0));
    service.issue(&id("relay"), props()).await.unwrap();
    service.transfer(&id("alice"), &id("bob"), Timestamp::from_millis(2_000)).await.unwrap();

    let state = tokio::time::timeout(Duration::from_secs(5), service.current_state())
        .await
        .expect("fold should terminate")
        .unwrap();

    assert_eq!(state.last_fold_pointer.position(), 2);
    assert!(state.was_transferred);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn status_never_mixes_commits() {
    let service = Arc::new(issued(props()).await);

    let writer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let owners = [id("alice"), id("bob")];
            for step in 0..40_u64 {
                let (from, to) = if step % 2 == 0 { (&owners[0], &owners[1]) } else { (&owners[1], &owners[0]) };
                service
                    .transfer(from, to, Timestamp::from_millis(2_000 + step))
                    .await
                    .unwrap();
            }
        })
    };

    for _ in 0..100 {
        let status = service.status().await.unwrap();
        if status.transferred {
            assert_ne!(status.owner_id, status.who_transferred_id);
        }
        tokio::task::yield_now().await;
    }

    writer.await.unwrap();
    assert_eq!(service.history().await.unwrap().len(), 41);
}
