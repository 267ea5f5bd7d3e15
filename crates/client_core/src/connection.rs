//! Connection lifecycle: open, feed inbound frames into the store, and reconcile.
//!
//! A single supervisor task owns the transport. It reacts to four sources, one at a
//! time: the health-check ticker, the in-flight open attempt, inbound frames, and the
//! shutdown signal. Whenever a tick finds the manager not running and no attempt in
//! flight it opens a fresh transport, whatever the reason for the outage was. There
//! is no backoff and no attempt cap.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use shared::{
    action::{set_error_msg, set_fatal_error},
    decode_frame, FrameError,
};
use store::Store;
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    error::TransportError,
    transport::{Connector, Frame, Transport},
};

pub const HEALTH_CHECK_PERIOD: Duration = Duration::from_millis(2000);
/// An open attempt still pending this long is dropped by the next health check.
pub const OPEN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The last open attempt failed; the next tick retries.
    Failed,
}

impl ConnectionState {
    pub fn is_running(self) -> bool {
        self == Self::Connected
    }
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub socket_url: Url,
    /// Consecutive malformed frames tolerated before the session is marked fatal.
    /// `None` drops malformed frames forever.
    pub malformed_frame_limit: Option<u32>,
}

impl ManagerConfig {
    pub fn new(socket_url: Url) -> Self {
        Self {
            socket_url,
            malformed_frame_limit: None,
        }
    }
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    store: Arc<Store>,
    config: ManagerConfig,
}

type OpenAttempt = BoxFuture<'static, Result<Box<dyn Transport>, TransportError>>;

enum Link {
    Idle,
    Opening { attempt: OpenAttempt, started: Instant },
    Open(Box<dyn Transport>),
}

enum LinkEvent {
    Opened(Box<dyn Transport>),
    OpenFailed(TransportError),
    Frame(Frame),
    Closed,
    Failed(TransportError),
}

async fn next_event(link: &mut Link) -> LinkEvent {
    match link {
        Link::Idle => std::future::pending().await,
        Link::Opening { attempt, .. } => match attempt.await {
            Ok(transport) => LinkEvent::Opened(transport),
            Err(err) => LinkEvent::OpenFailed(err),
        },
        Link::Open(transport) => match transport.recv().await {
            Some(Ok(frame)) => LinkEvent::Frame(frame),
            Some(Err(err)) => LinkEvent::Failed(err),
            None => LinkEvent::Closed,
        },
    }
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, store: Arc<Store>, config: ManagerConfig) -> Self {
        Self {
            connector,
            store,
            config,
        }
    }

    /// Opens the transport immediately and starts the health check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> ConnectionGuard {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.supervise(state_tx, shutdown_rx));
        ConnectionGuard {
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn supervise(
        self,
        state: watch::Sender<ConnectionState>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(HEALTH_CHECK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; mounting already opens
        ticker.tick().await;

        let mut link = self.open(&state);
        let mut malformed_run = 0u32;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if !state.borrow().is_running() {
                        let pending_for = match &link {
                            Link::Opening { started, .. } => Some(started.elapsed()),
                            _ => None,
                        };
                        match pending_for {
                            Some(age) if age < OPEN_ATTEMPT_TIMEOUT => {
                                debug!(?age, "open attempt still pending");
                            }
                            Some(age) => {
                                warn!(
                                    url = %self.config.socket_url,
                                    ?age,
                                    "abandoning stalled open attempt"
                                );
                                link = self.open(&state);
                            }
                            None => link = self.open(&state),
                        }
                    }
                }
                event = next_event(&mut link) => match event {
                    LinkEvent::Opened(transport) => {
                        info!(url = %self.config.socket_url, "socket connected");
                        malformed_run = 0;
                        link = Link::Open(transport);
                        state.send_replace(ConnectionState::Connected);
                    }
                    LinkEvent::OpenFailed(err) => {
                        warn!(error = %err, "socket open failed");
                        link = Link::Idle;
                        state.send_replace(ConnectionState::Failed);
                    }
                    LinkEvent::Frame(frame) => self.handle_frame(frame, &mut malformed_run),
                    LinkEvent::Closed => {
                        info!(url = %self.config.socket_url, "socket closed");
                        link = Link::Idle;
                        state.send_replace(ConnectionState::Disconnected);
                    }
                    LinkEvent::Failed(err) => {
                        warn!(error = %err, "socket failed");
                        link = Link::Idle;
                        state.send_replace(ConnectionState::Disconnected);
                    }
                }
            }
        }

        if let Link::Open(mut transport) = link {
            if tokio::time::timeout(CLOSE_TIMEOUT, transport.close())
                .await
                .is_err()
            {
                debug!("socket close timed out");
            }
        }
        state.send_replace(ConnectionState::Disconnected);
        info!(url = %self.config.socket_url, "connection manager stopped");
    }

    fn open(&self, state: &watch::Sender<ConnectionState>) -> Link {
        debug!(url = %self.config.socket_url, "opening socket");
        state.send_replace(ConnectionState::Connecting);
        let connector = Arc::clone(&self.connector);
        let url = self.config.socket_url.clone();
        Link::Opening {
            attempt: Box::pin(async move { connector.connect(&url).await }),
            started: Instant::now(),
        }
    }

    fn handle_frame(&self, frame: Frame, malformed_run: &mut u32) {
        let decoded = match frame {
            Frame::Text(text) => decode_frame(&text),
            Frame::Binary(bytes) => String::from_utf8(bytes)
                .map_err(|_| FrameError::NonTextBinary)
                .and_then(|text| decode_frame(&text)),
        };

        match decoded {
            Ok(action) => {
                *malformed_run = 0;
                self.store.dispatch(action);
            }
            Err(err) => {
                let previous = *malformed_run;
                *malformed_run = previous.saturating_add(1);
                warn!(error = %err, consecutive = *malformed_run, "dropping malformed frame");
                if *malformed_run != previous
                    && self.config.malformed_frame_limit == Some(*malformed_run)
                {
                    error!(
                        consecutive = *malformed_run,
                        "malformed frame limit reached; marking session fatal"
                    );
                    self.store.dispatch(set_error_msg(format!(
                        "received {} consecutive malformed frames, last: {err}",
                        *malformed_run
                    )));
                    self.store.dispatch(set_fatal_error(true));
                }
            }
        }
    }
}

/// Owns the supervisor task started by [`ConnectionManager::start`].
///
/// [`ConnectionGuard::shutdown`] closes the transport and waits for the task.
/// Dropping the guard signals the same shutdown without waiting; either way the
/// health check stops and any in-flight open attempt is discarded.
pub struct ConnectionGuard {
    state: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionGuard {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "connection supervisor ended abnormally");
            }
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
