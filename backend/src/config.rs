//! Runtime configuration, read from `RX_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first (see `main.rs`), so
//! local setups can keep their overrides there. Every variable is optional.

use common::model::prescription::DEFAULT_DOCTOR;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
/// 1 MiB is far above any realistic medicines list.
const DEFAULT_JSON_LIMIT: usize = 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Settings shared read-only with every request handler through `web::Data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Printed in the header when the form leaves the doctor blank.
    pub default_doctor: String,
    /// When set, each rendered PDF is also written here, overwriting older copies.
    pub save_dir: Option<PathBuf>,
    pub open_browser: bool,
    pub json_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_doctor: DEFAULT_DOCTOR.to_string(),
            save_dir: None,
            open_browser: true,
            json_limit: DEFAULT_JSON_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("RX_PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "RX_PORT",
                value: v,
                expected: "a port number",
            })?,
            None => defaults.port,
        };

        let json_limit = match get("RX_JSON_LIMIT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "RX_JSON_LIMIT",
                value: v,
                expected: "a size in bytes",
            })?,
            None => defaults.json_limit,
        };

        let open_browser = match get("RX_OPEN_BROWSER") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                key: "RX_OPEN_BROWSER",
                value: v,
                expected: "true or false",
            })?,
            None => defaults.open_browser,
        };

        Ok(Self {
            host: get("RX_HOST").unwrap_or(defaults.host),
            port,
            default_doctor: get("RX_DEFAULT_DOCTOR").unwrap_or(defaults.default_doctor),
            save_dir: get("RX_SAVE_DIR").map(PathBuf::from),
            open_browser,
            json_limit,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
