// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Hook chain configuration.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration shared by a chain and every receiver-bound chain derived
/// from it.
///
/// # Example TOML Configuration
///
/// ```toml
/// trace_calls = true
/// prune_every = 128
/// warn_async_decorators = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookChainConfig {
    /// Emit a debug event with timings for every dispatch.
    #[serde(default)]
    pub trace_calls: bool,

    /// Sweep dead receivers out of the instance table every N binds.
    #[serde(default = "default_prune_every")]
    pub prune_every: usize,

    /// Warn when a decorator is registered on an async target, where it is
    /// stored but not applied.
    #[serde(default = "default_warn_async_decorators")]
    pub warn_async_decorators: bool,
}

fn default_prune_every() -> usize {
    64
}

fn default_warn_async_decorators() -> bool {
    true
}

impl Default for HookChainConfig {
    fn default() -> Self {
        Self {
            trace_calls: false,
            prune_every: default_prune_every(),
            warn_async_decorators: default_warn_async_decorators(),
        }
    }
}

impl HookChainConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, HookConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| HookConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, HookConfigError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| HookConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `HOOKCHAIN_TRACE_CALLS`, `HOOKCHAIN_PRUNE_EVERY` and
    /// `HOOKCHAIN_WARN_ASYNC_DECORATORS`, falling back to defaults.
    pub fn from_env() -> Result<Self, HookConfigError> {
        let defaults = Self::default();
        let config = Self {
            trace_calls: env::var("HOOKCHAIN_TRACE_CALLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.trace_calls),
            prune_every: match env::var("HOOKCHAIN_PRUNE_EVERY") {
                Ok(v) => v.parse().map_err(|_| HookConfigError::InvalidValue {
                    key: "HOOKCHAIN_PRUNE_EVERY",
                    value: v,
                })?,
                Err(_) => defaults.prune_every,
            },
            warn_async_decorators: env::var("HOOKCHAIN_WARN_ASYNC_DECORATORS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.warn_async_decorators),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_trace_calls(mut self, trace_calls: bool) -> Self {
        self.trace_calls = trace_calls;
        self
    }

    pub fn with_prune_every(mut self, prune_every: usize) -> Self {
        self.prune_every = prune_every;
        self
    }

    pub fn validate(&self) -> Result<(), HookConfigError> {
        if self.prune_every == 0 {
            return Err(HookConfigError::ZeroPruneInterval);
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum HookConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("prune_every must be greater than zero")]
    ZeroPruneInterval,
}
