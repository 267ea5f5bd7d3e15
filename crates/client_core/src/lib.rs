//! Dashboard client core: the socket lifecycle that feeds backend actions into the
//! store, and the binding the dashboard view renders from.

pub mod binding;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod transport;
pub mod view;

pub use binding::{connect, render_decision, Binding, DashboardProps, Dispatcher, RenderDecision};
pub use connection::{
    ConnectionGuard, ConnectionManager, ConnectionState, ManagerConfig, HEALTH_CHECK_PERIOD,
    OPEN_ATTEMPT_TIMEOUT,
};
pub use endpoint::socket_url;
pub use error::{EndpointError, TransportError};
pub use transport::{Connector, Frame, MissingConnector, Transport, WsConnector};
pub use view::DashboardView;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/ws_tests.rs"]
mod ws_tests;
