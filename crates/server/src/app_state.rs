use std::collections::HashSet;

use shared::Action;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::status::StatusModel;

pub(crate) struct AppState {
    pub(crate) status: Mutex<StatusModel>,
    pub(crate) events: broadcast::Sender<Action>,
    pub(crate) clients: Mutex<HashSet<Uuid>>,
}

impl AppState {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            status: Mutex::new(StatusModel::default()),
            events,
            clients: Mutex::new(HashSet::new()),
        }
    }

    /// Broadcasts the fields changed since the last publish.
    pub(crate) async fn publish_updates(&self) -> usize {
        // held while sending so a socket opening concurrently sees either the
        // snapshot with these values or the updates, never neither
        let mut status = self.status.lock().await;
        let updates = status.take_updates();
        for action in &updates {
            let _ = self.events.send(action.clone());
        }
        updates.len()
    }
}
