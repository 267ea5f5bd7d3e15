use std::sync::Arc;

use store::{language::NAME, Store};
use tokio::sync::watch;
use tracing::info;

use crate::{
    binding::{
        connect, render_decision, select_dashboard, Binding, DashboardProps, Dispatcher,
        RenderDecision,
    },
    connection::{ConnectionGuard, ConnectionManager, ConnectionState, ManagerConfig},
    transport::Connector,
};

/// The mounted dashboard: its store binding plus the connection it supervises.
///
/// Unmount with [`DashboardView::unmount`]; dropping the view also stops the
/// connection, without waiting for the socket to close.
pub struct DashboardView {
    binding: Binding<DashboardProps>,
    connection: ConnectionGuard,
    connection_state: watch::Receiver<ConnectionState>,
    title: String,
}

impl DashboardView {
    pub fn mount(store: &Arc<Store>, config: ManagerConfig, connector: Arc<dyn Connector>) -> Self {
        let binding = connect(store, select_dashboard);
        let title = binding.props().strings.text(NAME).to_string();
        info!(title = %title, url = %config.socket_url, "mounting dashboard view");

        let connection = ConnectionManager::new(connector, Arc::clone(store), config).start();
        let connection_state = connection.subscribe_state();
        Self {
            binding,
            connection,
            connection_state,
            title,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_running(&self) -> bool {
        self.connection.is_running()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn render(&self) -> RenderDecision {
        render_decision(&self.binding.props(), self.is_running())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.binding.dispatcher()
    }

    /// Waits for either the selected props or the connection state to change.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            changed = self.binding.changed() => changed,
            changed = self.connection_state.changed() => changed.is_ok(),
        }
    }

    pub async fn unmount(self) {
        info!(title = %self.title, "unmounting dashboard view");
        self.connection.shutdown().await;
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
