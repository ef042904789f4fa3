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

//! Hook chain error types

use crate::adapter::Mode;
use thiserror::Error;

/// Result type for hook chain registration operations
pub type ChainResult<T> = Result<T, HookChainError>;

/// Errors raised by the hook chain itself.
///
/// Failures raised by targets or hooks are never converted into this type;
/// they travel through the dispatcher as the `anyhow::Error` the callee
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookChainError {
    #[error("Cannot hook synchronous target '{chain}' with an asynchronous {kind} hook")]
    ModeMismatch { chain: String, kind: HookKind },

    #[error("Decorators must be synchronous (chain '{chain}')")]
    DecoratorMustBeSync { chain: String },

    #[error("Hooked binding for '{chain}' is no longer active")]
    ChainInactive { chain: String },

    #[error("Chain '{chain}' wraps a {target} target and cannot be invoked as {requested}")]
    ConventionMismatch {
        chain: String,
        target: Mode,
        requested: Mode,
    },
}

/// Which list a hook was registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
    Decorator,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookKind::Before => write!(f, "before"),
            HookKind::After => write!(f, "after"),
            HookKind::Decorator => write!(f, "decorator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HookChainError::ModeMismatch {
            chain: "hello".into(),
            kind: HookKind::Before,
        };
        assert_eq!(
            err.to_string(),
            "Cannot hook synchronous target 'hello' with an asynchronous before hook"
        );

        let err = HookChainError::ConventionMismatch {
            chain: "fetch".into(),
            target: Mode::Async,
            requested: Mode::Sync,
        };
        assert!(err.to_string().contains("async target"));
    }

    #[test]
    fn test_error_downcasts_through_anyhow() {
        let err: anyhow::Error = HookChainError::ChainInactive {
            chain: "hello".into(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<HookChainError>(),
            Some(HookChainError::ChainInactive { .. })
        ));
    }
}
