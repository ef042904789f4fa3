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

//! # hookchain-scope
//!
//! Temporarily rebinds names from an original callable to a replacement,
//! restoring them when the returned guard goes out of scope. Used to put a
//! [`hookchain_core::HookChain`] in front of a function that callers reach
//! by name.
//!
//! ```
//! use hookchain_core::{callable, CallableAdapter, HookChain};
//! use hookchain_scope::{activate, Namespace, SyncTarget};
//!
//! let original = callable(|x: u32| Ok(x + 1));
//! let module: Namespace<SyncTarget<u32, u32>> = Namespace::new("module");
//! module.bind("incr", original.clone());
//!
//! let chain = HookChain::new(CallableAdapter::from_callable(original.clone()));
//! {
//!     let _active = activate(&module, &original, &chain).unwrap();
//!     let incr = module.resolve("incr").unwrap();
//!     assert_eq!(incr(1).unwrap(), 2);
//! }
//! assert!(module.refers_to("incr", &original));
//! ```

pub mod activation;
pub mod error;
pub mod injector;
pub mod namespace;

pub use activation::{activate, activate_async, Activation, AsyncTarget, SyncTarget};
pub use error::{ScopeError, ScopeResult};
pub use injector::{with_installed, with_installed_async, ScopeGuard, ScopeInjector, ScopeStack};
pub use namespace::Namespace;
