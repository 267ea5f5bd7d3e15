use std::{sync::atomic::Ordering, time::Duration};

use super::*;
use crate::{
    connection::HEALTH_CHECK_PERIOD,
    test_support::{scripted_transport, test_url, wait_until, Plan, ScriptedConnector},
    transport::MissingConnector,
};
use shared::{action::set_sidebar_shown, ConnectionStatus};

#[tokio::test(start_paused = true)]
async fn mount_opens_socket_and_renders_live_status() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());

    let mut view = DashboardView::mount(&store, ManagerConfig::new(test_url()), connector);
    assert_eq!(view.title(), "Trading Dashboard");
    assert!(matches!(view.render(), RenderDecision::Waiting { .. }));

    while !view.is_running() {
        assert!(view.changed().await);
    }
    peer.text(r#"{"type":"SET_CONNECTION_STATUS","payload":"CONNECTED"}"#);
    peer.text(r#"{"type":"SET_LATENCY","payload":8}"#);
    wait_until(|| store.get_state().status.latency == 8.0).await;

    assert_eq!(
        view.render(),
        RenderDecision::Live {
            server_time: 0.0,
            latency: 8.0,
            connection_status: ConnectionStatus::Connected,
        }
    );

    view.unmount().await;
    assert!(peer.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn fatal_error_is_shown_once_socket_drops() {
    let (transport, peer) = scripted_transport();
    let connector = ScriptedConnector::new(vec![Plan::Open(transport)]);
    let store = Arc::new(Store::new());
    let view = DashboardView::mount(&store, ManagerConfig::new(test_url()), connector);
    wait_until(|| view.is_running()).await;

    peer.text(r#"{"type":"SET_ERROR_MSG","payload":"order book desynced"}"#);
    peer.text(r#"{"type":"SET_FATAL_ERROR","payload":true}"#);
    wait_until(|| store.get_state().status.fatal_error).await;
    assert!(matches!(view.render(), RenderDecision::Live { .. }));

    drop(peer);
    wait_until(|| !view.is_running()).await;
    assert_eq!(
        view.render(),
        RenderDecision::FatalError {
            title: "Fatal error".to_string(),
            message: "order book desynced".to_string(),
        }
    );
    view.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn view_without_backend_keeps_waiting() {
    let store = Arc::new(Store::new());
    let view = DashboardView::mount(
        &store,
        ManagerConfig::new(test_url()),
        Arc::new(MissingConnector),
    );

    tokio::time::sleep(HEALTH_CHECK_PERIOD * 3).await;
    assert!(!view.is_running());
    assert_eq!(view.render().to_string(), "Waiting for server...");
    view.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn dispatcher_changes_wake_the_view_only_for_selected_state() {
    let store = Arc::new(Store::new());
    let mut view = DashboardView::mount(
        &store,
        ManagerConfig::new(test_url()),
        Arc::new(MissingConnector),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(view.connection_state(), ConnectionState::Failed);
    // consume the pending connecting/failed transition
    assert!(view.changed().await);

    view.dispatcher().dispatch(set_sidebar_shown(true));
    let woke = tokio::time::timeout(Duration::from_millis(500), view.changed()).await;
    assert!(woke.is_err(), "layout change must not wake the dashboard");

    view.unmount().await;
}

#[tokio::test]
async fn dropping_mounted_view_unsubscribes_from_store() {
    let store = Arc::new(Store::new());
    let view = DashboardView::mount(
        &store,
        ManagerConfig::new(test_url()),
        Arc::new(MissingConnector),
    );
    assert_eq!(store.listener_count(), 1);
    drop(view);
    assert_eq!(store.listener_count(), 0);
}
