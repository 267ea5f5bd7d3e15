use thiserror::Error;

/// Reasons an inbound frame could not be turned into an [`crate::action::Action`].
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame is not a json object")]
    NotAnObject,
    #[error("frame has no action type")]
    MissingKind,
    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("binary frame is not utf-8 text")]
    NonTextBinary,
}
