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

//! Hookchain Core
//!
//! Attach before-hooks, after-hooks and decorators to a callable without
//! touching its call sites.
//!
//! # Architecture
//!
//! - [`CallableAdapter`]: the target, tagged sync or async at construction
//! - [`HookChain`]: ordered before/after/decorator lists around one target
//! - Dispatcher: runs a call over a snapshot of the lists, on the sync or
//!   awaited track chosen by the target's mode
//! - Receiver binding: [`HookChain::bind`] and [`HookableMethod`] give every
//!   receiver its own isolated chain, cached weakly
//! - [`HookHandle`]: removes its hook on release or drop
//!
//! # Example
//!
//! ```rust
//! use hookchain_core::{wrap, CallableAdapter, Hook};
//!
//! let hello = wrap(CallableAdapter::sync(|name: String| Ok(format!("hello {}", name))));
//! let _guard = hello
//!     .add_before(Hook::sync(|name: &String| {
//!         println!("called with {}", name);
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! assert_eq!(hello.call("world".to_string()).unwrap(), "hello world");
//! ```

pub mod adapter;
pub mod args;
pub mod binder;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod method;
pub mod telemetry;

pub use adapter::{
    callable, AsyncCallable, Callable, CallableAdapter, Decorator, ExecutionMode, Hook,
    HookEntry, HookId, Mode,
};
pub use args::{CallArgs, DynChain};
pub use binder::ReceiverId;
pub use chain::{wrap, HookChain, HookChainBuilder, HookCounts};
pub use config::{HookChainConfig, HookConfigError};
pub use dispatch::Dispatched;
pub use error::{ChainResult, HookChainError, HookKind};
pub use handle::HookHandle;
pub use method::{BoundMethod, HookableMethod, MethodCall};
pub use telemetry::{init_tracing, LogConfig, LogFormat};
