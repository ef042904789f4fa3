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

//! Activating a hook chain in place of the callable it wraps.

use crate::error::ScopeResult;
use crate::injector::{ScopeGuard, ScopeInjector};
use futures::future::{self, FutureExt};
use hookchain_core::{AsyncCallable, Callable, HookChain, HookChainError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The trait-object type a synchronous callable binding points at.
pub type SyncTarget<A, R> = dyn Fn(A) -> anyhow::Result<R> + Send + Sync;

/// The trait-object type an asynchronous callable binding points at.
pub type AsyncTarget<A, R> =
    dyn Fn(A) -> futures::future::BoxFuture<'static, anyhow::Result<R>> + Send + Sync;

/// A chain installed over an original callable for the lifetime of this
/// value.
///
/// Dropping the activation first marks it inactive, then restores the
/// original bindings. Anything that kept a copy of the installed callable
/// gets [`HookChainError::ChainInactive`] from then on.
#[must_use = "dropping the activation uninstalls the chain immediately"]
pub struct Activation<'a, A, R, C> {
    name: String,
    active: Arc<AtomicBool>,
    installed: C,
    chain: HookChain<A, R>,
    guard: ScopeGuard<'a>,
}

impl<A, R, C> fmt::Debug for Activation<'_, A, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("chain", &self.name)
            .field("bindings", &self.guard.bindings())
            .field("active", &self.is_active())
            .finish()
    }
}

impl<A, R, C> Activation<'_, A, R, C> {
    pub fn chain(&self) -> &HookChain<A, R> {
        &self.chain
    }

    /// The callable the rewritten bindings now point at.
    pub fn installed(&self) -> &C {
        &self.installed
    }

    pub fn bindings(&self) -> usize {
        self.guard.bindings()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn deactivate(self) {}
}

impl<A, R, C> Drop for Activation<'_, A, R, C> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        debug!(chain = %self.name, "Deactivated chain");
    }
}

fn inactive(chain: &str) -> anyhow::Error {
    HookChainError::ChainInactive {
        chain: chain.to_string(),
    }
    .into()
}

/// Install `chain` wherever `original` is bound in `injector`.
pub fn activate<'a, A, R, I>(
    injector: &'a I,
    original: &Callable<A, R>,
    chain: &HookChain<A, R>,
) -> ScopeResult<Activation<'a, A, R, Callable<A, R>>>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
    I: ScopeInjector<SyncTarget<A, R>> + ?Sized,
{
    let active = Arc::new(AtomicBool::new(true));
    let flag = active.clone();
    let hooked = chain.clone();
    let installed: Callable<A, R> = Arc::new(move |args: A| {
        if !flag.load(Ordering::Acquire) {
            return Err(inactive(hooked.name()));
        }
        hooked.call(args)
    });

    let guard = injector.install(original, installed.clone())?;
    debug!(chain = %chain.name(), bindings = guard.bindings(), "Activated chain");
    Ok(Activation {
        name: chain.name().to_string(),
        active,
        installed,
        chain: chain.clone(),
        guard,
    })
}

/// Install `chain` wherever the asynchronous `original` is bound.
pub fn activate_async<'a, A, R, I>(
    injector: &'a I,
    original: &AsyncCallable<A, R>,
    chain: &HookChain<A, R>,
) -> ScopeResult<Activation<'a, A, R, AsyncCallable<A, R>>>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
    I: ScopeInjector<AsyncTarget<A, R>> + ?Sized,
{
    let active = Arc::new(AtomicBool::new(true));
    let flag = active.clone();
    let hooked = chain.clone();
    let installed: AsyncCallable<A, R> = Arc::new(move |args: A| {
        if !flag.load(Ordering::Acquire) {
            return future::ready(Err(inactive(hooked.name()))).boxed();
        }
        hooked.call_async(args)
    });

    let guard = injector.install(original, installed.clone())?;
    debug!(chain = %chain.name(), bindings = guard.bindings(), "Activated async chain");
    Ok(Activation {
        name: chain.name().to_string(),
        active,
        installed,
        chain: chain.clone(),
        guard,
    })
}
