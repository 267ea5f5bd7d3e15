use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Page location the socket endpoint is derived from.
    pub location: String,
    pub log_filter: String,
    pub malformed_frame_limit: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            location: "http://127.0.0.1:8080/".into(),
            log_filter: "info".into(),
            malformed_frame_limit: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    location: Option<String>,
    log_filter: Option<String>,
    malformed_frame_limit: Option<u32>,
}

/// Defaults, then the config file, then the environment.
///
/// An explicit `path` must exist; without one `dashboard.toml` is read only if present.
pub fn load_settings(
    path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();
    match path {
        Some(path) => apply_file(&mut settings, path)?,
        None => {
            let fallback = Path::new(DEFAULT_CONFIG);
            if fallback.exists() {
                apply_file(&mut settings, fallback)?;
            }
        }
    }
    apply_env(&mut settings, var);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let file: FileSettings =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;

    if let Some(v) = file.location {
        settings.location = v;
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    if file.malformed_frame_limit.is_some() {
        settings.malformed_frame_limit = file.malformed_frame_limit;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("DASHBOARD_LOCATION") {
        settings.location = v;
    }
    if let Some(v) = var("DASHBOARD_LOG") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
