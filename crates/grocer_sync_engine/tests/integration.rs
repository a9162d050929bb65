//! Integration tests for the orchestrator against mock and loopback servers.

use grocer_sync_engine::{
    FileStateStore, HttpGateway, InMemoryStateServer, LocalState, LocalStateStore, LoopbackClient,
    MemoryStateStore, MockGateway, RetryConfig, StaticConnectivity, SyncConfig, SyncError,
    SyncOrchestrator,
};
use grocer_sync_protocol::{
    ConflictAction, EntityKind, EntityPayload, ReconcileOutcome, ResolveConflictResponse,
    Timestamp,
};
use grocer_sync_testkit::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

type LoopbackGateway = HttpGateway<LoopbackClient<Arc<InMemoryStateServer>>>;

fn fast_config(max_attempts: u32) -> SyncConfig {
    SyncConfig::new("https://api.grocer.test")
        .with_retry(RetryConfig::new(max_attempts).with_base_delay(Duration::ZERO))
}

fn loopback(server: &Arc<InMemoryStateServer>) -> Arc<LoopbackGateway> {
    Arc::new(HttpGateway::new(
        "https://api.grocer.test",
        LoopbackClient::new(Arc::clone(server)),
    ))
}

#[test]
fn second_pass_over_loopback_is_idempotent() {
    let server = Arc::new(InMemoryStateServer::new(ServerStateBuilder::new().build()));
    let store = Arc::new(MemoryStateStore::new());
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        loopback(&server),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let first = orchestrator.perform_full_sync().unwrap();
    assert!(first.is_complete());
    let saves_after_first = store.total_saves();
    assert_eq!(saves_after_first, 3);

    let second = orchestrator.perform_full_sync().unwrap();
    assert_eq!(second.cart_action(), Some(ReconcileOutcome::NoConflict));
    assert_eq!(second.orders_action(), Some(ReconcileOutcome::NoConflict));
    assert_eq!(second.profile_action(), Some(ReconcileOutcome::NoConflict));
    assert_eq!(store.total_saves(), saves_after_first);
    assert_eq!(server.resolve_count(), 0);
}

#[test]
fn matching_state_writes_nothing() {
    let remote = ServerStateBuilder::new().build();
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        cart: Some(remote.cart.clone()),
        orders: Some(remote.orders.clone()),
        profile: Some(remote.profile.clone()),
    }));
    let gateway = Arc::new(MockGateway::with_state(remote));
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        Arc::clone(&gateway),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert!(summary.is_complete());
    assert_eq!(store.total_saves(), 0);
    assert_eq!(gateway.fetch_calls(), 1);
    assert_eq!(gateway.resolve_calls(), 0);
}

#[test]
fn offline_cart_edit_is_confirmed_by_server() {
    let (remote, local_cart) = scenarios::offline_cart_edit();
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        cart: Some(local_cart.clone()),
        orders: Some(remote.orders.clone()),
        profile: Some(remote.profile.clone()),
    }));
    let gateway = Arc::new(MockGateway::with_state(remote));
    gateway.set_resolve_response(ResolveConflictResponse::new(
        ConflictAction::LocalWins,
        EntityPayload::Cart(local_cart.data.clone()),
        "200",
    ));
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        Arc::clone(&gateway),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert_eq!(
        summary.cart_action(),
        Some(ReconcileOutcome::LocalWinsConfirmed)
    );
    assert_eq!(store.saves(EntityKind::Cart), 0);
    assert_eq!(store.state().cart, Some(local_cart));

    let requests = gateway.resolve_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].entity(), EntityKind::Cart);
    assert_eq!(requests[0].local_timestamp, Timestamp::new("200"));
}

#[test]
fn fresh_install_pulls_profile() {
    let remote = scenarios::fresh_install_profile();
    let store = Arc::new(MemoryStateStore::new());
    let gateway = Arc::new(MockGateway::with_state(remote));
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        Arc::clone(&gateway),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert_eq!(summary.profile_action(), Some(ReconcileOutcome::ServerWins));
    assert_eq!(store.saves(EntityKind::Profile), 1);
    let profile = store.state().profile.unwrap();
    assert_eq!(profile.data, sample_profile());
    assert_eq!(profile.updated_at, Timestamp::new("2024-01-01"));
    assert_eq!(gateway.resolve_calls(), 0);
}

#[test]
fn orders_are_pulled_even_when_local_is_newer() {
    let remote = ServerStateBuilder::new().build();
    let mut edited = sample_orders();
    edited.truncate(1);
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        cart: Some(remote.cart.clone()),
        orders: Some(snapshot(edited, "999999")),
        profile: Some(remote.profile.clone()),
    }));
    let server = Arc::new(InMemoryStateServer::new(remote));
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        loopback(&server),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert_eq!(summary.orders_action(), Some(ReconcileOutcome::ServerWins));
    assert_eq!(server.resolve_count(), 0);
    assert_eq!(store.state().orders.unwrap().data, sample_orders());
}

#[test]
fn local_newer_profile_is_adopted_by_loopback_server() {
    let remote = ServerStateBuilder::new().build();
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        profile: Some(snapshot(renamed_profile("Ada King"), "300")),
        ..Default::default()
    }));
    let server = Arc::new(InMemoryStateServer::new(remote));
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        loopback(&server),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert_eq!(
        summary.profile_action(),
        Some(ReconcileOutcome::LocalWinsConfirmed)
    );
    assert_eq!(store.saves(EntityKind::Profile), 0);
    let server_state = server.state();
    assert_eq!(server_state.profile.data.full_name, "Ada King");
    assert_eq!(server_state.profile.updated_at, Timestamp::new("300"));

    // both sides now agree
    let again = orchestrator.perform_full_sync().unwrap();
    assert_eq!(again.profile_action(), Some(ReconcileOutcome::NoConflict));
    assert_eq!(server.resolve_count(), 1);
}

#[test]
fn older_local_cart_is_pulled() {
    let (remote, local_cart) = scenarios::offline_cart_edit();
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        cart: Some(local_cart),
        ..Default::default()
    }));
    let server = Arc::new(InMemoryStateServer::new(remote));
    // the server saw a newer edit from another device in the meantime
    server.set_state(
        ServerStateBuilder::new()
            .cart(sample_cart(), "500")
            .build(),
    );
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        loopback(&server),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    // "200" is older than "500", so the cart is pulled without a push
    assert_eq!(summary.cart_action(), Some(ReconcileOutcome::ServerWins));
    assert_eq!(server.resolve_count(), 0);
    assert_eq!(store.state().cart.unwrap().data, sample_cart());
}

#[test]
fn dropped_connections_are_retried_within_bound() {
    let server = Arc::new(InMemoryStateServer::new(ServerStateBuilder::new().build()));
    let gateway = loopback(&server);
    gateway.client().drop_next(2);
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        Arc::clone(&gateway),
        MemoryStateStore::new(),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert!(summary.is_complete());
    assert_eq!(server.fetch_count(), 1);
    assert_eq!(orchestrator.stats().retries, 2);
}

#[test]
fn retries_stop_at_max_attempts() {
    let server = Arc::new(InMemoryStateServer::new(ServerStateBuilder::new().build()));
    let gateway = loopback(&server);
    gateway.client().drop_next(10);
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        Arc::clone(&gateway),
        MemoryStateStore::new(),
        StaticConnectivity::online(),
    );

    let err = orchestrator.perform_full_sync().unwrap_err();

    match err {
        SyncError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, SyncError::Transport { retryable: true, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.fetch_count(), 0);
    assert_eq!(gateway.last_error().as_deref(), Some("connection reset by peer"));
}

#[test]
fn failed_push_is_isolated_from_other_entities() {
    let (remote, local_cart) = scenarios::offline_cart_edit();
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        cart: Some(local_cart.clone()),
        ..Default::default()
    }));
    let gateway = Arc::new(MockGateway::with_state(remote));
    gateway.fail_all_resolves(SyncError::transport_retryable("503 upstream"));
    let orchestrator = SyncOrchestrator::new(
        fast_config(2),
        Arc::clone(&gateway),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert!(!summary.cart_synced());
    assert_eq!(summary.cart_action(), None);
    assert!(summary.orders_synced());
    assert!(summary.profile_synced());
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("cart: gave up after 2 attempts"));
    assert_eq!(gateway.resolve_calls(), 2);
    assert_eq!(store.state().cart, Some(local_cart));
}

#[test]
fn unreadable_cart_does_not_block_orders_or_profile() {
    let store = Arc::new(MemoryStateStore::new());
    store.fail_reads(EntityKind::Cart, "database locked");
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        MockGateway::with_state(ServerStateBuilder::new().build()),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert_eq!(
        summary.errors,
        vec!["cart: local store error: database locked".to_string()]
    );
    assert_eq!(summary.orders_action(), Some(ReconcileOutcome::ServerWins));
    assert_eq!(summary.profile_action(), Some(ReconcileOutcome::ServerWins));
}

#[test]
fn offline_pass_touches_nothing() {
    let server = Arc::new(InMemoryStateServer::new(ServerStateBuilder::new().build()));
    let store = Arc::new(MemoryStateStore::new());
    let connectivity = Arc::new(StaticConnectivity::offline());
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        loopback(&server),
        Arc::clone(&store),
        Arc::clone(&connectivity),
    );

    assert!(matches!(
        orchestrator.perform_full_sync(),
        Err(SyncError::NetworkUnavailable)
    ));
    assert_eq!(server.fetch_count(), 0);
    assert_eq!(store.total_saves(), 0);

    connectivity.set_available(true);
    assert!(orchestrator.perform_full_sync().is_ok());
}

#[test]
fn server_rejection_is_not_retried() {
    let gateway = Arc::new(MockGateway::with_state(ServerStateBuilder::new().build()));
    gateway.fail_all_fetches(SyncError::ServerRejected {
        status: 401,
        message: "token expired".into(),
    });
    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        Arc::clone(&gateway),
        MemoryStateStore::new(),
        StaticConnectivity::online(),
    );

    let err = orchestrator.perform_full_sync().unwrap_err();

    assert!(matches!(err, SyncError::ServerRejected { status: 401, .. }));
    assert_eq!(gateway.fetch_calls(), 1);
}

#[test]
fn file_store_survives_restart_between_passes() {
    let file = TempStateFile::new("grocer-state.json");
    let server = Arc::new(InMemoryStateServer::new(ServerStateBuilder::new().build()));

    {
        let orchestrator = SyncOrchestrator::new(
            fast_config(3),
            loopback(&server),
            FileStateStore::open(file.path()).unwrap(),
            StaticConnectivity::online(),
        );
        assert!(orchestrator.perform_full_sync().unwrap().is_complete());
    }

    let persisted = file.read_json();
    assert_eq!(persisted["cart"]["updatedAt"], "100");
    assert_eq!(persisted["profile"]["data"]["fullName"], "Ada Lovelace");

    let store = FileStateStore::open(file.path()).unwrap();
    assert_eq!(store.get_cart_state().unwrap().data, sample_cart());

    let orchestrator = SyncOrchestrator::new(
        fast_config(3),
        loopback(&server),
        store,
        StaticConnectivity::online(),
    );
    let summary = orchestrator.perform_full_sync().unwrap();
    assert_eq!(summary.cart_action(), Some(ReconcileOutcome::NoConflict));
    assert_eq!(summary.orders_action(), Some(ReconcileOutcome::NoConflict));
}

#[test]
fn concurrent_entities_over_loopback() {
    let server = Arc::new(InMemoryStateServer::new(ServerStateBuilder::new().build()));
    let store = Arc::new(MemoryStateStore::with_state(LocalState {
        cart: Some(snapshot(alternate_cart(), "900")),
        ..Default::default()
    }));
    let orchestrator = SyncOrchestrator::new(
        fast_config(3).with_concurrent_entities(true),
        loopback(&server),
        Arc::clone(&store),
        StaticConnectivity::online(),
    );

    let summary = orchestrator.perform_full_sync().unwrap();

    assert_eq!(
        summary.cart_action(),
        Some(ReconcileOutcome::LocalWinsConfirmed)
    );
    assert_eq!(summary.orders_action(), Some(ReconcileOutcome::ServerWins));
    assert_eq!(summary.profile_action(), Some(ReconcileOutcome::ServerWins));
    assert_eq!(server.state().cart.data, alternate_cart());
    assert_eq!(store.saves(EntityKind::Cart), 0);
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn any_server_state_converges_in_one_pass(
        cart in cart_strategy(4),
        profile in profile_strategy(),
        cart_ts in numeric_timestamp_strategy(),
        profile_ts in rfc3339_timestamp_strategy(),
    ) {
        let remote = ServerStateBuilder::new()
            .cart(cart, cart_ts.as_str())
            .profile(profile, profile_ts.as_str())
            .build();
        let store = Arc::new(MemoryStateStore::new());
        let gateway = Arc::new(MockGateway::with_state(remote));
        let orchestrator = SyncOrchestrator::new(
            fast_config(1),
            Arc::clone(&gateway),
            Arc::clone(&store),
            StaticConnectivity::online(),
        );

        prop_assert!(orchestrator.perform_full_sync().unwrap().is_complete());
        let saves = store.total_saves();

        let second = orchestrator.perform_full_sync().unwrap();
        prop_assert_eq!(second.cart_action(), Some(ReconcileOutcome::NoConflict));
        prop_assert_eq!(second.profile_action(), Some(ReconcileOutcome::NoConflict));
        prop_assert_eq!(store.total_saves(), saves);
        prop_assert_eq!(gateway.resolve_calls(), 0);
    }
}
