use std::{collections::BTreeMap, sync::Arc};

use shared::Action;

pub const NAME: &str = "name";
pub const FATAL_ERROR: &str = "fatalError";
pub const NOT_RUNNING: &str = "notRunning";

const DEFAULT_STRINGS: &[(&str, &str)] = &[
    (NAME, "Trading Dashboard"),
    (FATAL_ERROR, "Fatal error"),
    (NOT_RUNNING, "Waiting for server..."),
];

/// UI string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageState {
    pub strings: BTreeMap<String, String>,
}

impl LanguageState {
    /// Looks up a string, falling back to the key itself when the table has no entry.
    pub fn text<'a>(&'a self, key: &'a str) -> &'a str {
        self.strings.get(key).map(String::as_str).unwrap_or(key)
    }
}

impl Default for LanguageState {
    fn default() -> Self {
        Self {
            strings: DEFAULT_STRINGS
                .iter()
                .map(|(key, text)| (key.to_string(), text.to_string()))
                .collect(),
        }
    }
}

pub fn reducer(state: Option<&Arc<LanguageState>>, _action: &Action) -> Arc<LanguageState> {
    // No vocabulary action targets the string table yet.
    state
        .cloned()
        .unwrap_or_else(|| Arc::new(LanguageState::default()))
}
