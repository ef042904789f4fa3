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

//! Per-receiver chain isolation.
//!
//! A class-level chain owns a [`ReceiverBinder`]: a table from receiver
//! identity to the chain derived for that receiver. Entries hold the
//! receiver weakly; a dead receiver's entry is skipped on lookup and
//! evicted by the periodic sweep.
//!
//! Releasing a class-level hook also removes the copies seeded into
//! receiver chains, so a scoped class-level registration ends everywhere
//! when its handle goes.

use crate::adapter::HookId;
use crate::chain::{ChainInner, HookChain};
use crate::error::HookKind;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Identity of a receiver: the address of its `Arc` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(usize);

impl ReceiverId {
    pub fn of<T: ?Sized>(receiver: &Arc<T>) -> Self {
        ReceiverId(Arc::as_ptr(receiver) as *const () as usize)
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver@{:#x}", self.0)
    }
}

struct BinderEntry<A, R> {
    // Keeps the allocation, and so the address, from being reused while
    // the entry exists.
    receiver: Weak<dyn Any + Send + Sync>,
    chain: HookChain<A, R>,
}

impl<A, R> BinderEntry<A, R> {
    fn is_live(&self) -> bool {
        self.receiver.strong_count() > 0
    }
}

pub(crate) struct ReceiverBinder<A, R> {
    root: Weak<ChainInner<A, R>>,
    table: DashMap<ReceiverId, BinderEntry<A, R>>,
    binds: AtomicUsize,
    prune_every: usize,
}

impl<A, R> ReceiverBinder<A, R>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub(crate) fn new(root: Weak<ChainInner<A, R>>, prune_every: usize) -> Self {
        Self {
            root,
            table: DashMap::new(),
            binds: AtomicUsize::new(0),
            prune_every: prune_every.max(1),
        }
    }

    /// Look up or create the chain for `receiver`. `None` once the
    /// class-level chain is gone.
    pub(crate) fn bind<T>(self: &Arc<Self>, receiver: &Arc<T>) -> Option<HookChain<A, R>>
    where
        T: Send + Sync + 'static,
    {
        let root = HookChain::from_inner(self.root.upgrade()?);
        let id = ReceiverId::of(receiver);

        let chain = match self.table.entry(id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    occupied.get().chain.clone()
                } else {
                    let chain = root.derive(id, Arc::downgrade(self));
                    occupied.insert(self.entry_for(receiver, chain.clone()));
                    chain
                }
            }
            Entry::Vacant(vacant) => {
                let chain = root.derive(id, Arc::downgrade(self));
                vacant.insert(self.entry_for(receiver, chain.clone()));
                tracing::debug!(chain = %root.name(), receiver = %id, "Derived receiver chain");
                chain
            }
        };

        if (self.binds.fetch_add(1, Ordering::Relaxed) + 1) % self.prune_every == 0 {
            self.prune();
        }
        Some(chain)
    }

    pub(crate) fn root_chain(&self) -> Option<HookChain<A, R>> {
        self.root.upgrade().map(HookChain::from_inner)
    }

    fn entry_for<T>(&self, receiver: &Arc<T>, chain: HookChain<A, R>) -> BinderEntry<A, R>
    where
        T: Send + Sync + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(receiver);
        BinderEntry {
            receiver: weak,
            chain,
        }
    }

    pub(crate) fn prune(&self) -> usize {
        let dead: Vec<ReceiverId> = self
            .table
            .iter()
            .filter(|entry| !entry.is_live())
            .map(|entry| *entry.key())
            .collect();
        // Evicted chains are dropped after the shard lock is released.
        let evicted = dead
            .into_iter()
            .filter_map(|id| self.table.remove_if(&id, |_, entry| !entry.is_live()))
            .count();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.table.len(), "Pruned dead receivers");
        }
        evicted
    }

    pub(crate) fn live_count(&self) -> usize {
        self.table.iter().filter(|entry| entry.is_live()).count()
    }
}

impl<A: 'static, R: 'static> ReceiverBinder<A, R> {
    /// Remove the copies of a class-level entry from every receiver chain.
    pub(crate) fn remove_seeded(&self, kind: HookKind, id: HookId) -> usize {
        self.table
            .iter()
            .filter(|entry| entry.chain.remove_local(kind, id))
            .count()
    }
}
