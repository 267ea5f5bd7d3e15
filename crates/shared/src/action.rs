//! Action vocabulary shared by the backend protocol and the client store.
//!
//! One inbound frame is one JSON object `{"type": KIND, "payload": VALUE}`; the
//! protocol messages are the actions themselves, so there is no translation layer
//! between what the backend sends and what the reducers consume.

use serde::{
    de::{self, DeserializeOwned},
    ser::SerializeStruct,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::{Map, Value};

use crate::{
    domain::{ConnectionStatus, SectionId},
    error::FrameError,
};

pub const SET_SIDEBAR_SHOWN: &str = "SET_SIDEBAR_SHOWN";
pub const SET_SIDEBAR_SECTIONID: &str = "SET_SIDEBAR_SECTIONID";
pub const SET_ACCOUNTMENU_SHOWN: &str = "SET_ACCOUNTMENU_SHOWN";
pub const SET_HEADER_COLLAPSED: &str = "SET_HEADER_COLLAPSED";
pub const SET_LATENCY: &str = "SET_LATENCY";
pub const SET_SERVER_TIME: &str = "SET_SERVER_TIME";
pub const SET_CONNECT_TIME: &str = "SET_CONNECT_TIME";
pub const SET_CONNECTION_STATUS: &str = "SET_CONNECTION_STATUS";
pub const SET_FATAL_ERROR: &str = "SET_FATAL_ERROR";
pub const SET_ERROR_MSG: &str = "SET_ERROR_MSG";

/// A single requested state change.
///
/// Kinds outside the vocabulary survive decoding as [`Action::Unrecognized`] so
/// every reducer can apply its default case to them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetSidebarShown(bool),
    SetSidebarSectionId(Option<SectionId>),
    SetAccountMenuShown(bool),
    SetHeaderCollapsed(bool),
    SetLatency(f64),
    SetServerTime(f64),
    SetConnectTime(f64),
    SetConnectionStatus(ConnectionStatus),
    SetFatalError(bool),
    SetErrorMsg(String),
    Unrecognized { kind: String, payload: Value },
}

impl Action {
    /// Wire kind string, e.g. `SET_LATENCY`.
    pub fn kind(&self) -> &str {
        match self {
            Self::SetSidebarShown(_) => SET_SIDEBAR_SHOWN,
            Self::SetSidebarSectionId(_) => SET_SIDEBAR_SECTIONID,
            Self::SetAccountMenuShown(_) => SET_ACCOUNTMENU_SHOWN,
            Self::SetHeaderCollapsed(_) => SET_HEADER_COLLAPSED,
            Self::SetLatency(_) => SET_LATENCY,
            Self::SetServerTime(_) => SET_SERVER_TIME,
            Self::SetConnectTime(_) => SET_CONNECT_TIME,
            Self::SetConnectionStatus(_) => SET_CONNECTION_STATUS,
            Self::SetFatalError(_) => SET_FATAL_ERROR,
            Self::SetErrorMsg(_) => SET_ERROR_MSG,
            Self::Unrecognized { kind, .. } => kind,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::SetSidebarShown(v)
            | Self::SetAccountMenuShown(v)
            | Self::SetHeaderCollapsed(v)
            | Self::SetFatalError(v) => Value::Bool(*v),
            Self::SetSidebarSectionId(None) => Value::Null,
            Self::SetSidebarSectionId(Some(SectionId::Number(id))) => Value::from(*id),
            Self::SetSidebarSectionId(Some(SectionId::Name(id))) => Value::from(id.as_str()),
            Self::SetLatency(v) | Self::SetServerTime(v) | Self::SetConnectTime(v) => {
                number_value(*v)
            }
            Self::SetConnectionStatus(status) => Value::from(status.as_str()),
            Self::SetErrorMsg(msg) => Value::from(msg.as_str()),
            Self::Unrecognized { payload, .. } => payload.clone(),
        }
    }

    /// Builds an action from its wire kind and raw payload.
    pub fn from_parts(kind: String, payload: Value) -> Result<Self, FrameError> {
        let action = match kind.as_str() {
            SET_SIDEBAR_SHOWN => Self::SetSidebarShown(decode_payload(&kind, payload)?),
            SET_SIDEBAR_SECTIONID => Self::SetSidebarSectionId(decode_payload(&kind, payload)?),
            SET_ACCOUNTMENU_SHOWN => Self::SetAccountMenuShown(decode_payload(&kind, payload)?),
            SET_HEADER_COLLAPSED => Self::SetHeaderCollapsed(decode_payload(&kind, payload)?),
            SET_LATENCY => Self::SetLatency(decode_payload(&kind, payload)?),
            SET_SERVER_TIME => Self::SetServerTime(decode_payload(&kind, payload)?),
            SET_CONNECT_TIME => Self::SetConnectTime(decode_payload(&kind, payload)?),
            SET_CONNECTION_STATUS => Self::SetConnectionStatus(decode_payload(&kind, payload)?),
            SET_FATAL_ERROR => Self::SetFatalError(decode_payload(&kind, payload)?),
            SET_ERROR_MSG => {
                // the backend resets the message to null
                let msg: Option<String> = decode_payload(&kind, payload)?;
                Self::SetErrorMsg(msg.unwrap_or_default())
            }
            _ => Self::Unrecognized { kind, payload },
        };
        Ok(action)
    }
}

fn decode_payload<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, FrameError> {
    serde_json::from_value(payload).map_err(|source| FrameError::InvalidPayload {
        kind: kind.to_string(),
        source,
    })
}

fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

/// Decodes one inbound text frame.
pub fn decode_frame(text: &str) -> Result<Action, FrameError> {
    let value: Value = serde_json::from_str(text).map_err(FrameError::InvalidJson)?;
    let Value::Object(fields) = value else {
        return Err(FrameError::NotAnObject);
    };
    action_from_object(fields)
}

fn action_from_object(mut fields: Map<String, Value>) -> Result<Action, FrameError> {
    let kind = match fields.remove("type").or_else(|| fields.remove("kind")) {
        Some(Value::String(kind)) => kind,
        _ => return Err(FrameError::MissingKind),
    };
    let payload = fields.remove("payload").unwrap_or(Value::Null);
    Action::from_parts(kind, payload)
}

/// Encodes an action into its wire text.
pub fn encode_frame(action: &Action) -> Result<String, serde_json::Error> {
    serde_json::to_string(action)
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Action", 2)?;
        state.serialize_field("type", self.kind())?;
        state.serialize_field("payload", &self.payload())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        action_from_object(fields).map_err(de::Error::custom)
    }
}

pub fn set_sidebar_shown(shown: bool) -> Action {
    Action::SetSidebarShown(shown)
}

pub fn set_sidebar_section_id(section_id: Option<SectionId>) -> Action {
    Action::SetSidebarSectionId(section_id)
}

pub fn set_account_menu_shown(shown: bool) -> Action {
    Action::SetAccountMenuShown(shown)
}

pub fn set_header_collapsed(collapsed: bool) -> Action {
    Action::SetHeaderCollapsed(collapsed)
}

pub fn set_latency(latency: f64) -> Action {
    Action::SetLatency(latency)
}

pub fn set_server_time(server_time: f64) -> Action {
    Action::SetServerTime(server_time)
}

pub fn set_connect_time(connect_time: f64) -> Action {
    Action::SetConnectTime(connect_time)
}

pub fn set_connection_status(status: impl Into<ConnectionStatus>) -> Action {
    Action::SetConnectionStatus(status.into())
}

pub fn set_fatal_error(fatal: bool) -> Action {
    Action::SetFatalError(fatal)
}

pub fn set_error_msg(msg: impl Into<String>) -> Action {
    Action::SetErrorMsg(msg.into())
}

#[cfg(test)]
#[path = "tests/action_tests.rs"]
mod tests;
