use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend link status as reported by `SET_CONNECTION_STATUS`.
///
/// Values outside the known set are kept verbatim so rendering can decide how to
/// show them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connecting,
    Connected,
    /// The exchange throttled the backend; it retries on its own.
    RateLimited,
    Error,
    Other(String),
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotConnected => "NOT_CONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::RateLimited => "RATE_LIMITED",
            Self::Error => "ERROR",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ConnectionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NOT_CONNECTED" => Self::NotConnected,
            "CONNECTING" => Self::Connecting,
            "CONNECTED" => Self::Connected,
            "RATE_LIMITED" => Self::RateLimited,
            "ERROR" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for ConnectionStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ConnectionStatus> for String {
    fn from(value: ConnectionStatus) -> Self {
        match value {
            ConnectionStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sidebar section identifier. The backend sends either numeric or string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionId {
    Number(i64),
    Name(String),
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Name(id) => f.write_str(id),
        }
    }
}
