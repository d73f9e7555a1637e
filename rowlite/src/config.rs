// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database configuration
//!
//! Defaults can be overridden programmatically, from a JSON document, or from
//! environment variables:
//!
//! - `ROWLITE_LOCK_TIMEOUT_MS` - lock wait budget in milliseconds
//! - `ROWLITE_ISOLATION` - default isolation level (e.g. `SERIALIZABLE`)
//! - `ROWLITE_AUTO_COMMIT` - `true`/`false`

use crate::txn::isolation::IsolationLevel;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const ENV_LOCK_TIMEOUT_MS: &str = "ROWLITE_LOCK_TIMEOUT_MS";
pub const ENV_ISOLATION: &str = "ROWLITE_ISOLATION";
pub const ENV_AUTO_COMMIT: &str = "ROWLITE_AUTO_COMMIT";

/// Default lock wait budget
pub const DEFAULT_LOCK_WAIT_TIMEOUT_MS: u64 = 5000;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration document: {0}")]
    InvalidDocument(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Settings shared by every connection of a database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// How long a lock request waits for other connections
    pub lock_wait_timeout_ms: u64,
    /// Isolation level of new connections
    pub default_isolation: IsolationLevel,
    /// Auto-commit flag of new connections
    pub default_auto_commit: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            lock_wait_timeout_ms: DEFAULT_LOCK_WAIT_TIMEOUT_MS,
            default_isolation: IsolationLevel::ReadCommitted,
            default_auto_commit: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_wait_timeout_ms)
    }

    pub fn with_lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_default_isolation(mut self, level: IsolationLevel) -> Self {
        self.default_isolation = level;
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.default_auto_commit = auto_commit;
        self
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidDocument(e.to_string()))
    }

    /// Defaults overlaid with the `ROWLITE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |key: &str, value: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        if let Some(value) = lookup(ENV_LOCK_TIMEOUT_MS) {
            self.lock_wait_timeout_ms = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_LOCK_TIMEOUT_MS, &value))?;
        }
        if let Some(value) = lookup(ENV_ISOLATION) {
            self.default_isolation = value
                .parse()
                .map_err(|_| invalid(ENV_ISOLATION, &value))?;
        }
        if let Some(value) = lookup(ENV_AUTO_COMMIT) {
            self.default_auto_commit = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => return Err(invalid(ENV_AUTO_COMMIT, &value)),
            };
        }
        debug!("Database configuration: {:?}", self);
        Ok(self)
    }
}
