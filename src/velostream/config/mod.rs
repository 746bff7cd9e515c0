//! VeloStream Projection Configuration
//!
//! Operator-wide switches that shape projected output. A configuration is
//! handed to the projection processor once and never changes afterwards.
//!
//! ## Sources
//!
//! - **Defaults**: everything off
//! - **YAML**: [`ProjectionConfig::from_yaml_str`] / [`ProjectionConfig::from_file`]
//! - **Environment**: [`ProjectionConfig::with_env_overrides`] applied last
//!
//! ```yaml
//! send_meta: true
//! send_nil: false
//! ```

use crate::velostream::sql::error::SqlError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding [`ProjectionConfig::send_meta`]
pub const ENV_SEND_META: &str = "VELOSTREAM_PROJECTION_SEND_META";
/// Environment variable overriding [`ProjectionConfig::send_nil`]
pub const ENV_SEND_NIL: &str = "VELOSTREAM_PROJECTION_SEND_NIL";

/// Output policy for the projection stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    /// Attach the source row's metadata under the reserved metadata key
    pub send_meta: bool,
    /// Emit fields whose value is absent as explicit nulls instead of omitting them
    pub send_nil: bool,
}

impl ProjectionConfig {
    pub fn new(send_meta: bool, send_nil: bool) -> Self {
        Self {
            send_meta,
            send_nil,
        }
    }

    /// Parse a configuration from YAML text; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SqlError> {
        serde_yaml::from_str(yaml).map_err(|e| SqlError::ConfigError {
            message: format!("Invalid projection config: {}", e),
        })
    }

    /// Load a configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SqlError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SqlError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Apply `VELOSTREAM_PROJECTION_SEND_META` / `VELOSTREAM_PROJECTION_SEND_NIL`
    /// when set. Accepts `true|false|1|0`, case-insensitive.
    pub fn with_env_overrides(mut self) -> Result<Self, SqlError> {
        if let Some(value) = read_env_flag(ENV_SEND_META)? {
            log::debug!("{} overrides send_meta to {}", ENV_SEND_META, value);
            self.send_meta = value;
        }
        if let Some(value) = read_env_flag(ENV_SEND_NIL)? {
            log::debug!("{} overrides send_nil to {}", ENV_SEND_NIL, value);
            self.send_nil = value;
        }
        Ok(self)
    }
}

fn read_env_flag(key: &str) -> Result<Option<bool>, SqlError> {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw)
            .map(Some)
            .ok_or_else(|| SqlError::ConfigError {
                message: format!(
                    "{} must be one of true, false, 1, 0 (got '{}')",
                    key, raw
                ),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
