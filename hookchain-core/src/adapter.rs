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

//! Callable adapters and hook entries.
//!
//! Everything a chain composes over is tagged with a fixed [`Mode`] at
//! construction. The constructor a caller picks (`sync` or `asynchronous`)
//! is the declared execution model; nothing is re-inspected per call.

use crate::error::{HookChainError, HookKind};
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Calling convention of a target, hook or decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Runs to completion on the calling thread.
    Sync,
    /// Produces a future that must be awaited.
    Async,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sync => write!(f, "sync"),
            Mode::Async => write!(f, "async"),
        }
    }
}

/// Anything that has a fixed calling convention.
pub trait ExecutionMode {
    fn mode(&self) -> Mode;
}

/// A synchronous callable from `A` to `R`.
pub type Callable<A, R> = Arc<dyn Fn(A) -> anyhow::Result<R> + Send + Sync>;

/// An asynchronous callable from `A` to `R`.
pub type AsyncCallable<A, R> =
    Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync>;

/// Box a closure as a [`Callable`].
pub fn callable<A, R, F>(f: F) -> Callable<A, R>
where
    F: Fn(A) -> anyhow::Result<R> + Send + Sync + 'static,
{
    Arc::new(f)
}

enum Target<A, R> {
    Sync(Callable<A, R>),
    Async(AsyncCallable<A, R>),
}

/// The raw callable a chain is built around.
pub struct CallableAdapter<A, R> {
    name: Arc<str>,
    target: Target<A, R>,
}

impl<A, R> Clone for CallableAdapter<A, R> {
    fn clone(&self) -> Self {
        let target = match &self.target {
            Target::Sync(f) => Target::Sync(f.clone()),
            Target::Async(f) => Target::Async(f.clone()),
        };
        Self {
            name: self.name.clone(),
            target,
        }
    }
}

impl<A, R> fmt::Debug for CallableAdapter<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableAdapter")
            .field("name", &self.name)
            .field("mode", &self.mode())
            .finish()
    }
}

impl<A, R> ExecutionMode for CallableAdapter<A, R> {
    fn mode(&self) -> Mode {
        match self.target {
            Target::Sync(_) => Mode::Sync,
            Target::Async(_) => Mode::Async,
        }
    }
}

impl<A: 'static, R: 'static> CallableAdapter<A, R> {
    /// Adapt a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(std::any::type_name::<F>()),
            target: Target::Sync(Arc::new(f)),
        }
    }

    /// Adapt an `async` function.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Self {
            name: Arc::from(std::any::type_name::<F>()),
            target: Target::Async(Arc::new(move |args| f(args).boxed())),
        }
    }

    /// Adapt an already boxed synchronous callable.
    pub fn from_callable(f: Callable<A, R>) -> Self {
        Self {
            name: Arc::from("callable"),
            target: Target::Sync(f),
        }
    }

    /// Replace the name used in logs and errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call a synchronous adapter directly.
    ///
    /// Fails with [`HookChainError::ConventionMismatch`] for async adapters.
    pub fn invoke(&self, args: A) -> anyhow::Result<R> {
        match &self.target {
            Target::Sync(f) => f(args),
            Target::Async(_) => Err(HookChainError::ConventionMismatch {
                chain: self.name.to_string(),
                target: Mode::Async,
                requested: Mode::Sync,
            }
            .into()),
        }
    }

    /// Produce the awaitable for this call. A synchronous adapter runs
    /// immediately and yields a ready future.
    pub fn invoke_async(&self, args: A) -> BoxFuture<'static, anyhow::Result<R>>
    where
        A: Send,
        R: Send,
    {
        match &self.target {
            Target::Sync(f) => future::ready(f(args)).boxed(),
            Target::Async(f) => f(args),
        }
    }

    pub(crate) fn sync_callable(&self) -> Option<Callable<A, R>> {
        match &self.target {
            Target::Sync(f) => Some(f.clone()),
            Target::Async(_) => None,
        }
    }
}

/// Synchronous observer of a `&T`.
pub type SyncHookFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous observer of a `&T`.
pub type AsyncHookFn<T> =
    Arc<dyn for<'a> Fn(&'a T) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

/// A before- or after-hook.
///
/// Before-hooks observe the call arguments, after-hooks observe the
/// target's return value. Returning an error aborts the rest of the call.
pub enum Hook<T> {
    Sync(SyncHookFn<T>),
    Async(AsyncHookFn<T>),
}

impl<T> Clone for Hook<T> {
    fn clone(&self) -> Self {
        match self {
            Hook::Sync(f) => Hook::Sync(f.clone()),
            Hook::Async(f) => Hook::Async(f.clone()),
        }
    }
}

impl<T> fmt::Debug for Hook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook({})", self.mode())
    }
}

impl<T> ExecutionMode for Hook<T> {
    fn mode(&self) -> Mode {
        match self {
            Hook::Sync(_) => Mode::Sync,
            Hook::Async(_) => Mode::Async,
        }
    }
}

impl<T> Hook<T> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Hook::Sync(Arc::new(f))
    }

    /// An awaited hook. The closure returns a boxed future, usually
    /// `async move { .. }.boxed()` over values cloned out of the argument.
    pub fn asynchronous<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Hook::Async(Arc::new(f))
    }
}

/// Synchronous decorator: takes the callable it wraps, returns the wrapper.
pub type DecoratorFn<A, R> = Arc<dyn Fn(Callable<A, R>) -> Callable<A, R> + Send + Sync>;

/// Awaited decorator. Only exists so that it can be rejected at registration.
pub type AsyncDecoratorFn<A, R> =
    Arc<dyn Fn(Callable<A, R>) -> BoxFuture<'static, Callable<A, R>> + Send + Sync>;

pub enum Decorator<A, R> {
    Sync(DecoratorFn<A, R>),
    Async(AsyncDecoratorFn<A, R>),
}

impl<A, R> Clone for Decorator<A, R> {
    fn clone(&self) -> Self {
        match self {
            Decorator::Sync(f) => Decorator::Sync(f.clone()),
            Decorator::Async(f) => Decorator::Async(f.clone()),
        }
    }
}

impl<A, R> fmt::Debug for Decorator<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decorator({})", self.mode())
    }
}

impl<A, R> ExecutionMode for Decorator<A, R> {
    fn mode(&self) -> Mode {
        match self {
            Decorator::Sync(_) => Mode::Sync,
            Decorator::Async(_) => Mode::Async,
        }
    }
}

impl<A, R> Decorator<A, R> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Callable<A, R>) -> Callable<A, R> + Send + Sync + 'static,
    {
        Decorator::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Callable<A, R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Callable<A, R>> + Send + 'static,
    {
        Decorator::Async(Arc::new(move |inner| f(inner).boxed()))
    }
}

/// Process-unique identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl HookId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        HookId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// An immutable registration held in one of a chain's lists.
#[derive(Debug, Clone)]
pub struct HookEntry<H> {
    pub id: HookId,
    pub kind: HookKind,
    pub hook: H,
}

impl<H: ExecutionMode> HookEntry<H> {
    pub(crate) fn new(kind: HookKind, hook: H) -> Self {
        Self {
            id: HookId::next(),
            kind,
            hook,
        }
    }

    pub fn mode(&self) -> Mode {
        self.hook.mode()
    }
}
