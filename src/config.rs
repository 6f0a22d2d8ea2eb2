//! Application configuration.
//!
//! Built-in defaults are merged with an optional TOML override file. Nested
//! tables merge key by key, so an override file can change
//! `database.password` alone; keys no section declares are ignored.
//!
//! ```toml
//! debug = false
//!
//! [database]
//! host = "db.internal"
//! password = "s3cret"
//!
//! [session]
//! secret = "change me"
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::{Error, Result};
use crate::orm::PoolConfig;
use crate::session::SessionConfig;

/// Top-level configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_debug")]
    pub debug: bool,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: PoolConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

fn default_debug() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: default_debug(),
            server: ServerConfig::default(),
            database: PoolConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Listener settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("listen address {}:{}: {e}", self.host, self.port)))
    }
}

impl Config {
    /// Defaults, merged with the override file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::with_overrides(&std::fs::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    /// Defaults, merged with the TOML document `overrides`.
    pub fn with_overrides(overrides: &str) -> Result<Self> {
        let overrides: Table = toml::from_str(overrides)
            .map_err(|e| Error::Config(format!("override file: {e}")))?;
        let Value::Table(defaults) = Value::try_from(Self::default())
            .map_err(|e| Error::Config(format!("defaults: {e}")))?
        else {
            return Err(Error::Config("defaults did not serialize to a table".into()));
        };
        Value::Table(merge(defaults, &overrides))
            .try_into()
            .map_err(|e| Error::Config(format!("merged configuration: {e}")))
    }
}

/// Overlays `overrides` onto `defaults`; tables on both sides merge
/// recursively. Keys no section declares are dropped when the merged table
/// is deserialized.
fn merge(mut defaults: Table, overrides: &Table) -> Table {
    for (key, over) in overrides {
        let merged = match (defaults.remove(key), over) {
            (Some(Value::Table(inner)), Value::Table(over)) => Value::Table(merge(inner, over)),
            _ => over.clone(),
        };
        defaults.insert(key.clone(), merged);
    }
    defaults
}
