use std::sync::Arc;

use shared::{Action, ConnectionStatus};

/// Backend link and error status as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusState {
    pub latency: f64,
    pub server_time: f64,
    pub connect_time: f64,
    pub connection_status: ConnectionStatus,
    pub fatal_error: bool,
    pub error_msg: String,
}

pub fn reducer(state: Option<&Arc<StatusState>>, action: &Action) -> Arc<StatusState> {
    let current = state
        .cloned()
        .unwrap_or_else(|| Arc::new(StatusState::default()));

    let next = match action {
        Action::SetLatency(latency) => StatusState {
            latency: *latency,
            ..(*current).clone()
        },
        Action::SetServerTime(server_time) => StatusState {
            server_time: *server_time,
            ..(*current).clone()
        },
        Action::SetConnectTime(connect_time) => StatusState {
            connect_time: *connect_time,
            ..(*current).clone()
        },
        Action::SetConnectionStatus(status) => StatusState {
            connection_status: status.clone(),
            ..(*current).clone()
        },
        Action::SetFatalError(fatal_error) => StatusState {
            fatal_error: *fatal_error,
            ..(*current).clone()
        },
        Action::SetErrorMsg(msg) => StatusState {
            error_msg: msg.clone(),
            ..(*current).clone()
        },
        _ => return current,
    };
    Arc::new(next)
}
