//! Binds a presentation unit to selected store state and to dispatch.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use shared::{Action, ConnectionStatus};
use store::{
    language::{FATAL_ERROR, NOT_RUNNING},
    LanguageState, StateTree, Store, Subscription,
};
use tokio::sync::watch;

/// Dispatch handle given to presentation code.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
}

impl Dispatcher {
    pub fn dispatch(&self, action: Action) {
        self.store.dispatch(action);
    }
}

/// Selected props plus a dispatch handle, kept current through a store subscription.
pub struct Binding<P> {
    props: watch::Receiver<P>,
    dispatcher: Dispatcher,
    _subscription: Subscription,
}

/// Subscribes `selector` to `store`.
///
/// Props are republished only when the store produced a different tree and the
/// selection differs from the last one, so an unchanged slice never wakes the view.
pub fn connect<P, F>(store: &Arc<Store>, selector: F) -> Binding<P>
where
    P: PartialEq + Send + Sync + 'static,
    F: Fn(&StateTree) -> P + Send + Sync + 'static,
{
    let initial_tree = store.get_state();
    let (tx, rx) = watch::channel(selector(&initial_tree));
    let selection = Arc::new(Selection {
        selector,
        last_tree: Mutex::new(initial_tree),
        props: tx,
    });

    let subscription = {
        let selection = Arc::clone(&selection);
        store.subscribe(move |tree| selection.observe(tree))
    };
    // a dispatch may have landed between the first read and subscribing
    selection.resync(store);

    Binding {
        props: rx,
        dispatcher: Dispatcher {
            store: Arc::clone(store),
        },
        _subscription: subscription,
    }
}

struct Selection<P, F> {
    selector: F,
    last_tree: Mutex<Arc<StateTree>>,
    props: watch::Sender<P>,
}

impl<P, F> Selection<P, F>
where
    P: PartialEq,
    F: Fn(&StateTree) -> P,
{
    fn observe(&self, tree: &Arc<StateTree>) {
        let mut last = self.last_tree.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply(&mut last, tree);
    }

    /// Reads the current tree while holding `last_tree`, so a listener call still
    /// waiting on the lock can only carry this tree or a newer one.
    fn resync(&self, store: &Store) {
        let mut last = self.last_tree.lock().unwrap_or_else(PoisonError::into_inner);
        let tree = store.get_state();
        self.apply(&mut last, &tree);
    }

    fn apply(&self, last: &mut Arc<StateTree>, tree: &Arc<StateTree>) {
        if Arc::ptr_eq(last, tree) {
            return;
        }
        *last = Arc::clone(tree);
        let next = (self.selector)(tree);
        self.props.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl<P> Binding<P> {
    pub fn props(&self) -> watch::Ref<'_, P> {
        self.props.borrow()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Waits until the selected props change. Returns `false` once the binding can
    /// no longer change.
    pub async fn changed(&mut self) -> bool {
        self.props.changed().await.is_ok()
    }
}

/// Everything the dashboard view reads from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardProps {
    pub strings: Arc<LanguageState>,
    pub server_time: f64,
    pub fatal_error: bool,
    pub error_msg: String,
    pub latency: f64,
    pub connection_status: ConnectionStatus,
}

pub fn select_dashboard(tree: &StateTree) -> DashboardProps {
    DashboardProps {
        strings: Arc::clone(&tree.language),
        server_time: tree.status.server_time,
        fatal_error: tree.status.fatal_error,
        error_msg: tree.status.error_msg.clone(),
        latency: tree.status.latency,
        connection_status: tree.status.connection_status.clone(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderDecision {
    FatalError {
        title: String,
        message: String,
    },
    Waiting {
        message: String,
    },
    Live {
        server_time: f64,
        latency: f64,
        connection_status: ConnectionStatus,
    },
}

/// Chooses what the dashboard shows.
///
/// While the socket is down a fatal error from the backend takes precedence over
/// the waiting notice; once running, the live status is shown.
pub fn render_decision(props: &DashboardProps, running: bool) -> RenderDecision {
    if running {
        return RenderDecision::Live {
            server_time: props.server_time,
            latency: props.latency,
            connection_status: props.connection_status.clone(),
        };
    }
    if props.fatal_error {
        return RenderDecision::FatalError {
            title: props.strings.text(FATAL_ERROR).to_string(),
            message: props.error_msg.clone(),
        };
    }
    RenderDecision::Waiting {
        message: props.strings.text(NOT_RUNNING).to_string(),
    }
}

impl fmt::Display for RenderDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FatalError { title, message } => write!(f, "{title}\n{message}"),
            Self::Waiting { message } => f.write_str(message),
            Self::Live {
                server_time,
                latency,
                connection_status,
            } => write!(f, "{server_time}\n{latency}\n{connection_status}"),
        }
    }
}

#[cfg(test)]
#[path = "tests/binding_tests.rs"]
mod tests;
