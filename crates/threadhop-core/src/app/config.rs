//! DispatcherConfig - dispatcher のデフォルト値
//!
//! TOML から読み込めます。省略したキーはデフォルト値になります。
//!
//! ```toml
//! error_tag = "MyApp"
//! ui_bulk_size = 50
//! default_time_unit = "milliseconds"
//! item_error_policy = "continue"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::iteration::ItemErrorPolicy;
use crate::domain::TimeUnit;
use crate::impls::DEFAULT_UI_BULK_SIZE;

pub const DEFAULT_ERROR_TAG: &str = "Dispatcher";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Tag of the default logging error handler.
    pub error_tag: String,

    /// Max jobs run per `UiLoop::run_pending()` call.
    pub ui_bulk_size: usize,

    /// Unit used by `polling()` / `polling_after()` / `delay()`.
    pub default_time_unit: TimeUnit,

    /// Policy used by `for_each()`.
    pub item_error_policy: ItemErrorPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            error_tag: DEFAULT_ERROR_TAG.to_string(),
            ui_bulk_size: DEFAULT_UI_BULK_SIZE,
            default_time_unit: TimeUnit::default(),
            item_error_policy: ItemErrorPolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl DispatcherConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
