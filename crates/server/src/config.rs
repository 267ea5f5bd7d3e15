use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub update_interval_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            update_interval_ms: 500,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new("server.toml"));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
        if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
            settings.server_bind = v.to_string();
        }
        if let Some(v) = file_cfg
            .get("update_interval_ms")
            .and_then(toml::Value::as_integer)
        {
            if let Ok(v) = u64::try_from(v) {
                settings.update_interval_ms = v;
            }
        }
        if let Some(v) = file_cfg.get("log_filter").and_then(toml::Value::as_str) {
            settings.log_filter = v.to_string();
        }
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("SERVER_UPDATE_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.update_interval_ms = parsed;
        }
    }

    if let Some(v) = var("RUST_LOG") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
