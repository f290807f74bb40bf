//! Walks one credential through its lifecycle against the in-memory ledger.
//!
//! Configuration comes from `SOULBOUND_*` environment variables; `RUST_LOG`
//! overrides the log level.

use anyhow::Context;
use soulbound_core::environment::SystemClock;
use soulbound_core::stream::AggregateId;
use soulbound_credential::metrics::MetricsRecorder;
use soulbound_credential::{
    AccountId, CredentialConfig, CredentialEnvironment, CredentialProperties, CredentialService,
    InMemoryLedger, Timestamp,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CredentialConfig::from_env();
    init_tracing(&config.log_level);

    let recorder = MetricsRecorder::install().context("installing metrics recorder")?;

    let env = CredentialEnvironment::new(Arc::new(SystemClock), config.policy());
    let aggregate_id = AggregateId::new(format!("credential-{}", uuid::Uuid::new_v4()));
    let service = CredentialService::new(aggregate_id, Arc::new(InMemoryLedger::new()), env)
        .with_max_fold_batch(config.max_fold_batch);

    info!(
        aggregate_id = %service.aggregate_id(),
        policy = %config.issuance_policy,
        "starting credential lifecycle demo"
    );

    let issuer = AccountId::new("university");
    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");
    let now = Timestamp::from_datetime(chrono::Utc::now());

    let props = CredentialProperties::new(issuer.clone(), alice.clone(), AccountId::new("registrar-app"), now)
        .revocable(true)
        .transferable(true)
        .with_metadata_uri("ipfs://diploma/2025");

    // The issuer dispatches directly so both policies accept it.
    service.issue(&issuer, props).await.context("issuing credential")?;
    service
        .transfer(&alice, &bob, now.plus_millis(1_000))
        .await
        .context("transferring credential")?;

    if let Err(e) = service.transfer(&alice, &bob, now.plus_millis(2_000)).await {
        warn!(error = %e, "second transfer by the old owner was rejected");
    }

    let state = service.current_state().await.context("folding action log")?;
    info!(
        owner = %state.owner_id,
        transferred = state.was_transferred,
        pointer = %state.last_fold_pointer,
        "after transfer"
    );

    service
        .revoke(&issuer, now.plus_millis(3_000))
        .await
        .context("revoking credential")?;

    let status = service.status().await.context("reading status")?;
    info!(
        revoked = status.revoked,
        pending = status.pending_actions,
        valid = status.is_valid(),
        "status before fold"
    );

    let state = service.current_state().await.context("folding action log")?;
    info!(revoked = state.was_revoked, pointer = %state.last_fold_pointer, "after revoke");

    for (index, action) in service.history().await.context("replaying history")?.iter().enumerate() {
        info!(index, kind = %action.kind, sender = %action.sender_id, utc = %action.action_utc, "history");
    }

    if let Some(rendered) = recorder.render() {
        println!("{rendered}");
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
