use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect websocket {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("websocket receive failed: {0}")]
    Receive(#[source] tungstenite::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("location scheme must be http, https, ws or wss, got {0}")]
    UnsupportedScheme(String),
    #[error("location has no host")]
    MissingHost,
    #[error("invalid socket url: {0}")]
    Invalid(#[from] url::ParseError),
}
