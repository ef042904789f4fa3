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

//! Hook chains: ordered before/after/decorator lists around one target.

use crate::adapter::{
    AsyncCallable, Callable, CallableAdapter, Decorator, ExecutionMode, Hook, HookEntry, HookId,
    Mode,
};
use crate::binder::{ReceiverBinder, ReceiverId};
use crate::config::HookChainConfig;
use crate::dispatch::{CallPlan, Dispatched};
use crate::error::{ChainResult, HookChainError, HookKind};
use crate::handle::{HookHandle, HookOwner};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// Copy-on-write list of entries.
///
/// Readers take an `Arc` snapshot and release the lock before running
/// anything, so a removal during a call only affects later calls.
pub(crate) struct HookList<H> {
    entries: RwLock<Arc<Vec<HookEntry<H>>>>,
}

impl<H: Clone> HookList<H> {
    fn new() -> Self {
        Self::seeded(Arc::new(Vec::new()))
    }

    fn seeded(entries: Arc<Vec<HookEntry<H>>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<HookEntry<H>>> {
        self.entries.read().clone()
    }

    fn push(&self, entry: HookEntry<H>) {
        let mut entries = self.entries.write();
        Arc::make_mut(&mut entries).push(entry);
    }

    fn remove(&self, id: HookId) -> bool {
        let mut entries = self.entries.write();
        if !entries.iter().any(|e| e.id == id) {
            return false;
        }
        Arc::make_mut(&mut entries).retain(|e| e.id != id);
        true
    }

    fn contains(&self, id: HookId) -> bool {
        self.entries.read().iter().any(|e| e.id == id)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

enum BinderRef<A, R> {
    /// Held by the class-level chain.
    Owned(Arc<ReceiverBinder<A, R>>),
    /// Held by receiver-bound chains, which the binder's table owns.
    Shared(Weak<ReceiverBinder<A, R>>),
}

impl<A, R> BinderRef<A, R> {
    fn get(&self) -> Option<Arc<ReceiverBinder<A, R>>> {
        match self {
            BinderRef::Owned(binder) => Some(binder.clone()),
            BinderRef::Shared(binder) => binder.upgrade(),
        }
    }
}

pub(crate) struct ChainInner<A, R> {
    target: CallableAdapter<A, R>,
    before: HookList<Hook<A>>,
    after: HookList<Hook<R>>,
    decorators: HookList<Decorator<A, R>>,
    receiver: Option<ReceiverId>,
    binder: BinderRef<A, R>,
    config: Arc<HookChainConfig>,
}

impl<A: 'static, R: 'static> ChainInner<A, R> {
    fn remove_local(&self, kind: HookKind, id: HookId) -> bool {
        match kind {
            HookKind::Before => self.before.remove(id),
            HookKind::After => self.after.remove(id),
            HookKind::Decorator => self.decorators.remove(id),
        }
    }
}

impl<A: 'static, R: 'static> HookOwner for ChainInner<A, R> {
    fn remove_hook(&self, kind: HookKind, id: HookId) -> bool {
        let removed = self.remove_local(kind, id);
        if removed {
            tracing::debug!(
                chain = %self.target.name(),
                hook_id = %id,
                kind = %kind,
                "Hook removed"
            );
        }

        // Receiver chains seeded from this one carry the entry under the
        // same id.
        if self.receiver.is_none() {
            if let Some(binder) = self.binder.get() {
                let seeded = binder.remove_seeded(kind, id);
                if seeded > 0 {
                    tracing::debug!(hook_id = %id, receivers = seeded, "Seeded copies removed");
                }
            }
        }
        removed
    }

    fn contains_hook(&self, kind: HookKind, id: HookId) -> bool {
        match kind {
            HookKind::Before => self.before.contains(id),
            HookKind::After => self.after.contains(id),
            HookKind::Decorator => self.decorators.contains(id),
        }
    }
}

/// Number of entries in each list of a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HookCounts {
    pub before: usize,
    pub after: usize,
    pub decorators: usize,
}

/// A hookable unit: one target plus its before-hooks, after-hooks and
/// decorators.
///
/// `HookChain` is a cheap handle; clones share the same lists. Calling the
/// chain runs before-hooks with the arguments, the (decorated) target, then
/// after-hooks with the result.
pub struct HookChain<A, R> {
    inner: Arc<ChainInner<A, R>>,
}

impl<A, R> Clone for HookChain<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static, R: 'static> HookChain<A, R> {
    /// Remove an entry from this chain's own lists only.
    pub(crate) fn remove_local(&self, kind: HookKind, id: HookId) -> bool {
        self.inner.remove_local(kind, id)
    }
}

impl<A, R> fmt::Debug for HookChain<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("target", &self.inner.target)
            .field("receiver", &self.inner.receiver)
            .finish_non_exhaustive()
    }
}

/// Register `target` as a hookable unit with default configuration.
pub fn wrap<A, R>(target: CallableAdapter<A, R>) -> HookChain<A, R>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    HookChain::new(target)
}

impl<A, R> HookChain<A, R>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub fn new(target: CallableAdapter<A, R>) -> Self {
        Self::with_config(target, HookChainConfig::default())
    }

    pub fn with_config(target: CallableAdapter<A, R>, config: HookChainConfig) -> Self {
        let config = Arc::new(config);
        let inner = Arc::new_cyclic(|root: &Weak<ChainInner<A, R>>| ChainInner {
            target,
            before: HookList::new(),
            after: HookList::new(),
            decorators: HookList::new(),
            receiver: None,
            binder: BinderRef::Owned(Arc::new(ReceiverBinder::new(
                root.clone(),
                config.prune_every,
            ))),
            config,
        });
        Self { inner }
    }

    pub fn builder(target: CallableAdapter<A, R>) -> HookChainBuilder<A, R> {
        HookChainBuilder::new(target)
    }

    pub(crate) fn from_inner(inner: Arc<ChainInner<A, R>>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.target.name()
    }

    pub fn mode(&self) -> Mode {
        self.inner.target.mode()
    }

    pub fn config(&self) -> &HookChainConfig {
        &self.inner.config
    }

    /// Identity of the receiver this chain was bound to, if any.
    pub fn receiver(&self) -> Option<ReceiverId> {
        self.inner.receiver
    }

    pub fn is_bound(&self) -> bool {
        self.inner.receiver.is_some()
    }

    pub fn hook_counts(&self) -> HookCounts {
        HookCounts {
            before: self.inner.before.len(),
            after: self.inner.after.len(),
            decorators: self.inner.decorators.len(),
        }
    }

    /// Whether two handles refer to the same chain instance.
    pub fn same_chain(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `hook` with the call arguments before the target.
    pub fn add_before(&self, hook: Hook<A>) -> ChainResult<HookHandle> {
        self.check_hook_mode(HookKind::Before, hook.mode())?;
        let entry = HookEntry::new(HookKind::Before, hook);
        let id = entry.id;
        self.inner.before.push(entry);
        Ok(self.registered(HookKind::Before, id))
    }

    /// Run `hook` with the target's return value after the target.
    pub fn add_after(&self, hook: Hook<R>) -> ChainResult<HookHandle> {
        self.check_hook_mode(HookKind::After, hook.mode())?;
        let entry = HookEntry::new(HookKind::After, hook);
        let id = entry.id;
        self.inner.after.push(entry);
        Ok(self.registered(HookKind::After, id))
    }

    /// Wrap the target. The last decorator registered is the outermost.
    pub fn add_decorator(&self, decorator: Decorator<A, R>) -> ChainResult<HookHandle> {
        if decorator.mode() == Mode::Async {
            return Err(HookChainError::DecoratorMustBeSync {
                chain: self.name().to_string(),
            });
        }
        if self.mode() == Mode::Async && self.inner.config.warn_async_decorators {
            tracing::warn!(
                chain = %self.name(),
                "Decorator on an async target only applies to synchronous dispatch"
            );
        }
        let entry = HookEntry::new(HookKind::Decorator, decorator);
        let id = entry.id;
        self.inner.decorators.push(entry);
        Ok(self.registered(HookKind::Decorator, id))
    }

    /// The target with every decorator folded on, first-registered
    /// innermost. Recomputed on each call. `None` for async targets.
    pub fn effective_target(&self) -> Option<Callable<A, R>> {
        let base = self.inner.target.sync_callable()?;
        Some(crate::dispatch::fold_decorators(
            base,
            &self.inner.decorators.snapshot(),
        ))
    }

    /// The chain for `receiver`, created and cached on first access.
    ///
    /// Binding the same receiver again returns the same chain. The cache
    /// holds the receiver weakly. A dropped receiver's entry is evicted by
    /// the next lookup of that receiver, by the sweep that runs every
    /// `prune_every` binds, or by [`bound_receivers`](Self::bound_receivers)
    /// and [`prune_receivers`](Self::prune_receivers); until then its chain
    /// and the hooks registered on it stay allocated.
    ///
    /// Once the class-level chain has been dropped there is no cache left to
    /// bind through, and this chain is returned unchanged.
    pub fn bind<T>(&self, receiver: &Arc<T>) -> HookChain<A, R>
    where
        T: Send + Sync + 'static,
    {
        match self.inner.binder.get().and_then(|binder| binder.bind(receiver)) {
            Some(chain) => chain,
            None => {
                tracing::warn!(
                    chain = %self.name(),
                    receiver = %ReceiverId::of(receiver),
                    "Class-level chain is gone; binding returns the chain unchanged"
                );
                self.clone()
            }
        }
    }

    /// [`bind`](Self::bind) for an optional receiver; unbound access
    /// returns this chain.
    pub fn bind_opt<T>(&self, receiver: Option<&Arc<T>>) -> HookChain<A, R>
    where
        T: Send + Sync + 'static,
    {
        match receiver {
            Some(receiver) => self.bind(receiver),
            None => self.clone(),
        }
    }

    /// The class-level chain this one was derived from. A chain that is not
    /// bound to a receiver returns itself.
    pub fn unbound(&self) -> HookChain<A, R> {
        if self.inner.receiver.is_none() {
            return self.clone();
        }
        self.inner
            .binder
            .get()
            .and_then(|binder| binder.root_chain())
            .unwrap_or_else(|| self.clone())
    }

    /// Number of live receivers with a cached chain. Evicts the entries of
    /// dropped receivers on the way.
    pub fn bound_receivers(&self) -> usize {
        self.inner
            .binder
            .get()
            .map(|binder| {
                binder.prune();
                binder.live_count()
            })
            .unwrap_or(0)
    }

    /// Evict cache entries whose receiver has been dropped.
    pub fn prune_receivers(&self) -> usize {
        self.inner
            .binder
            .get()
            .map(|binder| binder.prune())
            .unwrap_or(0)
    }

    /// Dispatch a call on the track matching the target's mode.
    pub fn dispatch(&self, args: A) -> Dispatched<R> {
        let plan = self.plan();
        match self.mode() {
            Mode::Sync => Dispatched::Ready(plan.run_sync(args)),
            Mode::Async => Dispatched::Pending(Box::pin(plan.run_async(args))),
        }
    }

    /// Call a synchronous chain.
    pub fn call(&self, args: A) -> anyhow::Result<R> {
        match self.mode() {
            Mode::Sync => self.plan().run_sync(args),
            Mode::Async => Err(HookChainError::ConventionMismatch {
                chain: self.name().to_string(),
                target: Mode::Async,
                requested: Mode::Sync,
            }
            .into()),
        }
    }

    /// Call the chain and await the result. Synchronous chains complete
    /// before the returned future is first polled.
    pub fn call_async(&self, args: A) -> BoxFuture<'static, anyhow::Result<R>> {
        std::future::IntoFuture::into_future(self.dispatch(args))
    }

    /// This chain as a plain callable, e.g. for installing into a binding.
    pub fn as_callable(&self) -> Callable<A, R> {
        let chain = self.clone();
        Arc::new(move |args| chain.call(args))
    }

    pub fn as_async_callable(&self) -> AsyncCallable<A, R> {
        let chain = self.clone();
        Arc::new(move |args| chain.call_async(args))
    }

    pub(crate) fn derive(
        &self,
        receiver: ReceiverId,
        binder: Weak<ReceiverBinder<A, R>>,
    ) -> HookChain<A, R> {
        let inner = &self.inner;
        Self::from_inner(Arc::new(ChainInner {
            target: inner.target.clone(),
            before: HookList::seeded(inner.before.snapshot()),
            after: HookList::seeded(inner.after.snapshot()),
            decorators: HookList::seeded(inner.decorators.snapshot()),
            receiver: Some(receiver),
            binder: BinderRef::Shared(binder),
            config: inner.config.clone(),
        }))
    }

    fn plan(&self) -> CallPlan<A, R> {
        let inner = &self.inner;
        CallPlan {
            target: inner.target.clone(),
            before: inner.before.snapshot(),
            after: inner.after.snapshot(),
            decorators: inner.decorators.snapshot(),
            trace: inner.config.trace_calls,
        }
    }

    fn check_hook_mode(&self, kind: HookKind, hook_mode: Mode) -> ChainResult<()> {
        if hook_mode == Mode::Async && self.mode() == Mode::Sync {
            return Err(HookChainError::ModeMismatch {
                chain: self.name().to_string(),
                kind,
            });
        }
        Ok(())
    }

    fn registered(&self, kind: HookKind, id: HookId) -> HookHandle {
        tracing::debug!(chain = %self.name(), hook_id = %id, kind = %kind, "Hook registered");
        let owner: Weak<ChainInner<A, R>> = Arc::downgrade(&self.inner);
        let owner: Weak<dyn HookOwner> = owner;
        HookHandle::new(owner, kind, id)
    }
}

/// Builder for chains with non-default configuration.
pub struct HookChainBuilder<A, R> {
    target: CallableAdapter<A, R>,
    config: HookChainConfig,
}

impl<A, R> HookChainBuilder<A, R>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub fn new(target: CallableAdapter<A, R>) -> Self {
        Self {
            target,
            config: HookChainConfig::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.target = self.target.named(name);
        self
    }

    pub fn config(mut self, config: HookChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn trace_calls(mut self, trace_calls: bool) -> Self {
        self.config.trace_calls = trace_calls;
        self
    }

    pub fn build(self) -> HookChain<A, R> {
        HookChain::with_config(self.target, self.config)
    }
}
