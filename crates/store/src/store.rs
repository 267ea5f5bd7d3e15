use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde_json::Value;
use shared::Action;
use tracing::trace;

use crate::{language, layout, status, LanguageState, LayoutState, StatusState};

/// Kind of the action used to initialize every domain on store construction.
pub const INIT_KIND: &str = "@@store/INIT";

/// The combined state of every domain.
///
/// Domain records are shared by `Arc`; a dispatch that leaves a domain untouched
/// reuses the same allocation, so `Arc::ptr_eq` tells a subscriber whether its slice
/// changed.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTree {
    pub layout: Arc<LayoutState>,
    pub status: Arc<StatusState>,
    pub language: Arc<LanguageState>,
}

pub fn root_reducer(state: Option<&Arc<StateTree>>, action: &Action) -> Arc<StateTree> {
    let next_layout = layout::reducer(state.map(|s| &s.layout), action);
    let next_status = status::reducer(state.map(|s| &s.status), action);
    let next_language = language::reducer(state.map(|s| &s.language), action);

    if let Some(current) = state {
        let unchanged = Arc::ptr_eq(&current.layout, &next_layout)
            && Arc::ptr_eq(&current.status, &next_status)
            && Arc::ptr_eq(&current.language, &next_language);
        if unchanged {
            return Arc::clone(current);
        }
    }

    Arc::new(StateTree {
        layout: next_layout,
        status: next_status,
        language: next_language,
    })
}

type Listener = Arc<dyn Fn(&Arc<StateTree>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Single owner of the state tree.
///
/// Construct one per application and hand it to consumers as `Arc<Store>`.
pub struct Store {
    dispatch_lock: Mutex<()>,
    state: RwLock<Arc<StateTree>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Store {
    pub fn new() -> Self {
        let init = Action::Unrecognized {
            kind: INIT_KIND.to_string(),
            payload: Value::Null,
        };
        Self {
            dispatch_lock: Mutex::new(()),
            state: RwLock::new(root_reducer(None, &init)),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    pub fn get_state(&self) -> Arc<StateTree> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Reduces `action` into a new tree, then notifies every listener in
    /// subscription order.
    ///
    /// Dispatches are serialized. A listener must not call `dispatch` on the same
    /// store: the nested call blocks on the dispatch lock forever.
    pub fn dispatch(&self, action: Action) {
        let _serial = lock(&self.dispatch_lock);

        let next = root_reducer(Some(&self.get_state()), &action);
        {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&next);
        }
        trace!(kind = action.kind(), "dispatched action");

        let listeners: Vec<Listener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<StateTree>) + Send + Sync + 'static,
    {
        let mut guard = lock(&self.listeners);
        let id = guard.next_id;
        guard.next_id += 1;
        guard.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`Store::subscribe`]; the listener stays registered until
/// this is dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
