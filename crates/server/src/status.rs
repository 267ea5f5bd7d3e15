//! Backend status model pushed to dashboard sockets.
//!
//! Every setter marks its field dirty when the value changes; the publisher drains
//! dirty fields each update period and broadcasts one action per field. Newly
//! opened sockets get the full snapshot instead.

use std::collections::BTreeSet;

use shared::{
    action::{
        set_connect_time, set_connection_status, set_error_msg, set_fatal_error, set_latency,
        set_server_time,
    },
    Action, ConnectionStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Latency,
    ServerTime,
    ConnectTime,
    ConnectionStatus,
    FatalError,
    ErrorMsg,
}

const ALL_FIELDS: [Field; 6] = [
    Field::Latency,
    Field::ServerTime,
    Field::ConnectTime,
    Field::ConnectionStatus,
    Field::FatalError,
    Field::ErrorMsg,
];

#[derive(Debug, Default)]
pub struct StatusModel {
    latency: f64,
    server_time: f64,
    connect_time: f64,
    connection_status: ConnectionStatus,
    fatal_error: bool,
    error_msg: String,
    dirty: BTreeSet<Field>,
}

impl StatusModel {
    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection_status
    }

    pub fn fatal_error(&self) -> bool {
        self.fatal_error
    }

    pub fn set_latency(&mut self, latency: f64) {
        if self.latency != latency {
            self.latency = latency;
            self.dirty.insert(Field::Latency);
        }
    }

    pub fn set_server_time(&mut self, server_time: f64) {
        if self.server_time != server_time {
            self.server_time = server_time;
            self.dirty.insert(Field::ServerTime);
        }
    }

    pub fn set_connect_time(&mut self, connect_time: f64) {
        if self.connect_time != connect_time {
            self.connect_time = connect_time;
            self.dirty.insert(Field::ConnectTime);
        }
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        if self.connection_status != status {
            self.connection_status = status;
            self.dirty.insert(Field::ConnectionStatus);
        }
    }

    pub fn set_fatal_error(&mut self, fatal_error: bool) {
        if self.fatal_error != fatal_error {
            self.fatal_error = fatal_error;
            self.dirty.insert(Field::FatalError);
        }
    }

    pub fn set_error_msg(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if self.error_msg != msg {
            self.error_msg = msg;
            self.dirty.insert(Field::ErrorMsg);
        }
    }

    /// Advances the simulated upstream link by one update period.
    ///
    /// The link walks `NOT_CONNECTED -> CONNECTING -> CONNECTED`, stamping the
    /// connect time when it comes up. It stays down while a fatal error is set.
    pub fn advance(&mut self, now_ms: f64) {
        self.set_server_time(now_ms);
        if self.fatal_error {
            return;
        }
        match self.connection_status {
            ConnectionStatus::NotConnected => {
                self.set_connection_status(ConnectionStatus::Connecting);
            }
            ConnectionStatus::Connecting => {
                self.set_connect_time(now_ms);
                self.set_connection_status(ConnectionStatus::Connected);
            }
            _ => {}
        }
    }

    pub fn raise_fatal(&mut self, msg: impl Into<String>) {
        self.set_error_msg(msg);
        self.set_fatal_error(true);
        self.set_connection_status(ConnectionStatus::NotConnected);
    }

    pub fn clear_fatal(&mut self) {
        self.set_fatal_error(false);
        self.set_error_msg("");
    }

    /// One action per field, in a fixed order.
    pub fn snapshot(&self) -> Vec<Action> {
        ALL_FIELDS.iter().map(|field| self.action_for(*field)).collect()
    }

    /// Actions for fields changed since the last call.
    pub fn take_updates(&mut self) -> Vec<Action> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty.into_iter().map(|field| self.action_for(field)).collect()
    }

    fn action_for(&self, field: Field) -> Action {
        match field {
            Field::Latency => set_latency(self.latency),
            Field::ServerTime => set_server_time(self.server_time),
            Field::ConnectTime => set_connect_time(self.connect_time),
            Field::ConnectionStatus => set_connection_status(self.connection_status.clone()),
            Field::FatalError => set_fatal_error(self.fatal_error),
            Field::ErrorMsg => set_error_msg(self.error_msg.clone()),
        }
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
