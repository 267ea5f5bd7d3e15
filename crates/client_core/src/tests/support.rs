//! Scripted transports for exercising the connection manager without sockets.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::{
    error::TransportError,
    transport::{Connector, Frame, Transport},
};

pub fn test_url() -> Url {
    Url::parse("ws://127.0.0.1:9/socket").expect("url")
}

pub enum Plan {
    Fail,
    Hang(DropFlag),
    Open(ScriptedTransport),
    /// Opens after the handshake takes the given time.
    Slow(Duration, ScriptedTransport),
}

/// Sets its flag when dropped.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct ScriptedTransport {
    frames: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    closed: Arc<AtomicBool>,
}

/// Test-side handle of a [`ScriptedTransport`]. Dropping it closes the peer side.
pub struct Peer {
    frames: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    pub closed: Arc<AtomicBool>,
}

impl Peer {
    pub fn text(&self, text: &str) {
        self.frames
            .send(Ok(Frame::Text(text.to_string())))
            .expect("transport alive");
    }

    pub fn frame(&self, frame: Frame) {
        self.frames.send(Ok(frame)).expect("transport alive");
    }

    pub fn fail(&self, reason: &str) {
        self.frames
            .send(Err(TransportError::Unavailable(reason.to_string())))
            .expect("transport alive");
    }
}

pub fn scripted_transport() -> (ScriptedTransport, Peer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        ScriptedTransport {
            frames: rx,
            closed: Arc::clone(&closed),
        },
        Peer { frames: tx, closed },
    )
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.frames.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out planned outcomes in order; once the plan runs out every attempt fails.
#[derive(Default)]
pub struct ScriptedConnector {
    plan: Mutex<VecDeque<Plan>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(plan: Vec<Plan>) -> Arc<Self> {
        Arc::new(Self {
            plan: Mutex::new(plan.into()),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.plan.lock().expect("plan").pop_front();
        match next {
            Some(Plan::Open(transport)) => Ok(Box::new(transport)),
            Some(Plan::Slow(delay, transport)) => {
                tokio::time::sleep(delay).await;
                Ok(Box::new(transport))
            }
            Some(Plan::Hang(flag)) => {
                let _flag = flag;
                std::future::pending().await
            }
            Some(Plan::Fail) | None => Err(TransportError::Unavailable("refused".to_string())),
        }
    }
}

/// Polls `condition` every few milliseconds of (possibly paused) time.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
