//! Application state container: per-domain reducers combined into one store.

pub mod language;
pub mod layout;
pub mod status;
mod store;

pub use language::LanguageState;
pub use layout::LayoutState;
pub use status::StatusState;
pub use store::{root_reducer, StateTree, Store, Subscription, INIT_KIND};

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod reducer_tests;
