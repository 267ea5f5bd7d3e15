use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use super::*;
use crate::{
    test_support::{scripted_transport, test_url, wait_until, DropFlag, Plan, ScriptedConnector},
    transport::MissingConnector,
};
use shared::ConnectionStatus;

fn start(connector: Arc<ScriptedConnector>, store: &Arc<Store>) -> ConnectionGuard {
    ConnectionManager::new(connector, Arc::clone(store), ManagerConfig::new(test_url())).start()
}

fn start_with_limit(
    connector: Arc<ScriptedConnector>,
    store: &Arc<Store>,
    limit: u32,
) -> ConnectionGuard {
    let config = ManagerConfig {
        socket_url: test_url(),
        malformed_frame_limit: Some(limit),
    };
    ConnectionManager::new(connector, Arc::clone(store), config).start()
}

#[tokio::test(start_paused = true)]
async fn opens_immediately_on_start() {
    let (transport, _peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());

    let guard = start(Arc::clone(&connector), &store);
    wait_until(|| guard.is_running()).await;

    assert_eq!(connector.attempts(), 1);
    assert_eq!(guard.state(), ConnectionState::Connected);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failing_transport_is_retried_every_period_without_backoff() {
    let connector = ScriptedConnector::new(Vec::new());
    let store = Arc::new(Store::new());
    let guard = start(Arc::clone(&connector), &store);

    let offset = Duration::from_millis(100);
    tokio::time::sleep(offset).await;
    assert_eq!(connector.attempts(), 1);
    assert_eq!(guard.state(), ConnectionState::Failed);

    for window in 1..=15 {
        tokio::time::sleep(HEALTH_CHECK_PERIOD).await;
        assert_eq!(connector.attempts(), window + 1, "window {window}");
        assert!(!guard.is_running());
    }
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn handshake_slower_than_health_check_still_connects() {
    let (transport, _peer) = scripted_transport();
    let handshake = Duration::from_millis(2500);
    let connector = ScriptedConnector::new(vec![Plan::Slow(handshake, transport)]);
    let store = Arc::new(Store::new());
    let started = tokio::time::Instant::now();
    let guard = start(Arc::clone(&connector), &store);

    wait_until(|| guard.is_running()).await;
    assert!(started.elapsed() >= handshake);
    assert_eq!(connector.attempts(), 1);

    tokio::time::sleep(HEALTH_CHECK_PERIOD * 3).await;
    assert!(guard.is_running());
    assert_eq!(connector.attempts(), 1);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stalled_open_attempt_is_replaced_after_timeout() {
    let abandoned = Arc::new(AtomicBool::new(false));
    let still_pending = Arc::new(AtomicBool::new(false));
    let connector = ScriptedConnector::new(vec![
        Plan::Hang(DropFlag(Arc::clone(&abandoned))),
        Plan::Hang(DropFlag(Arc::clone(&still_pending))),
    ]);
    let store = Arc::new(Store::new());
    let guard = start(Arc::clone(&connector), &store);

    // every tick before the timeout leaves the pending attempt alone
    let before_timeout = OPEN_ATTEMPT_TIMEOUT - HEALTH_CHECK_PERIOD;
    tokio::time::sleep(Duration::from_millis(100) + before_timeout).await;
    assert_eq!(guard.state(), ConnectionState::Connecting);
    assert!(!abandoned.load(Ordering::SeqCst));
    assert_eq!(connector.attempts(), 1);

    tokio::time::sleep(HEALTH_CHECK_PERIOD).await;
    assert!(abandoned.load(Ordering::SeqCst));
    assert!(!still_pending.load(Ordering::SeqCst));
    assert_eq!(connector.attempts(), 2);
    assert_eq!(guard.state(), ConnectionState::Connecting);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn inbound_frames_are_dispatched_in_arrival_order() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let _subscription = {
        let seen = Arc::clone(&seen);
        store.subscribe(move |tree| seen.lock().expect("seen").push(tree.status.latency))
    };

    let guard = start(connector, &store);
    wait_until(|| guard.is_running()).await;

    peer.text(r#"{"type":"SET_LATENCY","payload":10}"#);
    peer.text(r#"{"type":"SET_LATENCY","payload":20}"#);
    wait_until(|| seen.lock().expect("seen").len() == 2).await;

    assert_eq!(*seen.lock().expect("seen"), vec![10.0, 20.0]);
    assert_eq!(store.get_state().status.latency, 20.0);

    // health ticks while running never disturb the session
    tokio::time::sleep(HEALTH_CHECK_PERIOD * 3).await;
    assert_eq!(store.get_state().status.latency, 20.0);
    assert!(guard.is_running());
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_leaves_tree_untouched() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let guard = start(connector, &store);
    wait_until(|| guard.is_running()).await;

    peer.text(r#"{"type":"SET_SERVER_TIME","payload":5}"#);
    wait_until(|| store.get_state().status.server_time == 5.0).await;
    let before = store.get_state();

    peer.text("{not json");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(Arc::ptr_eq(&before, &store.get_state()));
    assert!(guard.is_running());

    peer.text(r#"{"type":"SET_SERVER_TIME","payload":6}"#);
    wait_until(|| store.get_state().status.server_time == 6.0).await;
    assert!(!store.get_state().status.fatal_error);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn binary_utf8_frames_decode_like_text() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let guard = start(connector, &store);
    wait_until(|| guard.is_running()).await;

    peer.frame(Frame::Binary(vec![0xff, 0xfe]));
    peer.frame(Frame::Binary(
        br#"{"type":"SET_CONNECTION_STATUS","payload":"CONNECTING"}"#.to_vec(),
    ));
    wait_until(|| {
        store.get_state().status.connection_status == ConnectionStatus::Connecting
    })
    .await;
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_never_escalate_without_limit() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let guard = start(connector, &store);
    wait_until(|| guard.is_running()).await;

    let before = store.get_state();
    for _ in 0..20 {
        peer.text("garbage");
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(Arc::ptr_eq(&before, &store.get_state()));
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn consecutive_malformed_frames_escalate_at_limit() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let guard = start_with_limit(connector, &store, 3);
    wait_until(|| guard.is_running()).await;

    peer.text("bad");
    peer.text("bad");
    peer.text(r#"{"type":"SET_LATENCY","payload":1}"#);
    peer.text("bad");
    peer.text("bad");
    wait_until(|| store.get_state().status.latency == 1.0).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!store.get_state().status.fatal_error);

    peer.text("bad");
    wait_until(|| store.get_state().status.fatal_error).await;
    assert!(store
        .get_state()
        .status
        .error_msg
        .contains("3 consecutive malformed frames"));
    // the socket itself stays up
    assert!(guard.is_running());
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn close_clears_running_and_next_tick_reconnects() {
    let (first, first_peer) = scripted_transport();
    let (second, _second_peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(first), Plan::Open(second)]);
    let store = Arc::new(Store::new());
    let guard = start(Arc::clone(&connector), &store);
    wait_until(|| guard.is_running()).await;

    let before = store.get_state();
    drop(first_peer);
    wait_until(|| guard.state() == ConnectionState::Disconnected).await;
    // the transition itself is not announced through the store
    assert!(Arc::ptr_eq(&before, &store.get_state()));

    wait_until(|| guard.is_running()).await;
    assert_eq!(connector.attempts(), 2);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transport_error_is_handled_like_close() {
    let (first, first_peer) = scripted_transport();
    let (second, _second_peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(first), Plan::Open(second)]);
    let store = Arc::new(Store::new());
    let guard = start(Arc::clone(&connector), &store);
    wait_until(|| guard.is_running()).await;

    first_peer.fail("reset by peer");
    wait_until(|| !guard.is_running()).await;
    assert_eq!(guard.state(), ConnectionState::Disconnected);

    wait_until(|| guard.is_running()).await;
    assert_eq!(connector.attempts(), 2);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fatal_error_survives_reconnect() {
    let (first, first_peer) = scripted_transport();
    let (second, _second_peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(first), Plan::Open(second)]);
    let store = Arc::new(Store::new());
    let guard = start(connector, &store);
    wait_until(|| guard.is_running()).await;

    first_peer.text(r#"{"type":"SET_FATAL_ERROR","payload":true}"#);
    first_peer.text(r#"{"type":"SET_ERROR_MSG","payload":"exchange rejected key"}"#);
    wait_until(|| store.get_state().status.error_msg == "exchange rejected key").await;
    drop(first_peer);

    wait_until(|| !guard.is_running()).await;
    wait_until(|| guard.is_running()).await;
    assert!(store.get_state().status.fatal_error);
    guard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_transport_and_stops_health_check() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let guard = start(Arc::clone(&connector), &store);
    wait_until(|| guard.is_running()).await;

    let state = guard.subscribe_state();
    guard.shutdown().await;
    assert!(peer.closed.load(Ordering::SeqCst));
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);

    tokio::time::sleep(HEALTH_CHECK_PERIOD * 5).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_guard_discards_in_flight_attempt() {
    let abandoned = Arc::new(AtomicBool::new(false));
    let connector = ScriptedConnector::new(vec![Plan::Hang(DropFlag(Arc::clone(&abandoned)))]);
    let store = Arc::new(Store::new());
    let guard = start(Arc::clone(&connector), &store);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connector.attempts(), 1);

    drop(guard);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(abandoned.load(Ordering::SeqCst));

    tokio::time::sleep(HEALTH_CHECK_PERIOD * 5).await;
    assert_eq!(connector.attempts(), 1);
}

#[test]
fn malformed_run_saturates_and_escalates_once() {
    let store = Arc::new(Store::new());
    let config = ManagerConfig {
        socket_url: test_url(),
        malformed_frame_limit: Some(u32::MAX),
    };
    let manager = ConnectionManager::new(Arc::new(MissingConnector), Arc::clone(&store), config);

    let mut run = u32::MAX - 1;
    manager.handle_frame(Frame::Text("bad".to_string()), &mut run);
    assert_eq!(run, u32::MAX);
    assert!(store.get_state().status.fatal_error);

    store.dispatch(shared::action::set_fatal_error(false));
    manager.handle_frame(Frame::Text("bad".to_string()), &mut run);
    assert_eq!(run, u32::MAX);
    assert!(!store.get_state().status.fatal_error);
}
