//! Browser launch options.
//!
//! Accepts the puppeteer-style JSON that `--puppeteerConfigFile` points at. Only the keys that map
//! onto a Chromium launch are honoured; anything else is kept in [`LaunchOptions::extra`] and
//! reported at `debug` level.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    pub args: Vec<String>,
    #[serde(deserialize_with = "headless_flag")]
    pub headless: bool,
    /// Launch and per-request timeout, in milliseconds.
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<PathBuf>,
    pub no_sandbox: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable_path: None,
            args: Vec::new(),
            headless: true,
            timeout: DEFAULT_LAUNCH_TIMEOUT_MS,
            user_data_dir: None,
            no_sandbox: false,
            extra: Map::new(),
        }
    }
}

impl LaunchOptions {
    /// Deep-merges a user-supplied JSON object over the defaults.
    pub fn from_user_config(user: &Value) -> serde_json::Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        deep_merge(&mut merged, user);
        let options: Self = serde_json::from_value(merged)?;
        if !options.extra.is_empty() {
            let keys: Vec<&str> = options.extra.keys().map(String::as_str).collect();
            debug!(?keys, "ignoring unsupported browser launch options");
        }
        Ok(options)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Puppeteer accepts `headless: true | false | "new" | "shell"`; any string means headless.
fn headless_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Mode(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Mode(mode) => !mode.eq_ignore_ascii_case("false"),
    })
}

pub(crate) fn deep_merge(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
