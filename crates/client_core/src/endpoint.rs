use url::Url;

use crate::error::EndpointError;

pub const SOCKET_PATH: &str = "/socket";

/// Derives the socket endpoint from the location the dashboard was served from.
///
/// Host and port are taken from `location`; `https` maps to `wss`, `http` to `ws`.
pub fn socket_url(location: &Url) -> Result<Url, EndpointError> {
    let scheme = match location.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };
    let host = location.host_str().ok_or(EndpointError::MissingHost)?;

    let raw = match location.port() {
        Some(port) => format!("{scheme}://{host}:{port}{SOCKET_PATH}"),
        None => format!("{scheme}://{host}{SOCKET_PATH}"),
    };
    Ok(Url::parse(&raw)?)
}
