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

//! Hookable methods: chains whose target takes a receiver.
//!
//! [`HookableMethod`] is the declared access point. Going through
//! [`HookableMethod::bind`] yields a [`BoundMethod`] whose hooks belong to
//! that receiver alone; calling the method with an explicit receiver uses
//! the class-level chain.

use crate::adapter::{CallableAdapter, Decorator, Hook};
use crate::chain::HookChain;
use crate::config::HookChainConfig;
use crate::dispatch::Dispatched;
use crate::error::ChainResult;
use crate::handle::HookHandle;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Arguments of a method call: the receiver plus the call's own arguments.
#[derive(Debug)]
pub struct MethodCall<T, A> {
    pub receiver: Arc<T>,
    pub args: A,
}

impl<T, A: Clone> Clone for MethodCall<T, A> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
            args: self.args.clone(),
        }
    }
}

pub struct HookableMethod<T, A, R> {
    chain: HookChain<MethodCall<T, A>, R>,
}

impl<T, A, R> Clone for HookableMethod<T, A, R> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
        }
    }
}

impl<T, A, R> HookableMethod<T, A, R>
where
    T: Send + Sync + 'static,
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// A synchronous method `fn(&self, args) -> R`.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let target =
            CallableAdapter::sync(move |call: MethodCall<T, A>| f(&call.receiver, call.args));
        Self::from_chain(HookChain::new(target.named(name)))
    }

    /// An `async` method. The receiver is passed as an `Arc` so the future
    /// can own it.
    pub fn asynchronous<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<T>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let target = CallableAdapter::asynchronous(move |call: MethodCall<T, A>| {
            f(call.receiver, call.args)
        });
        Self::from_chain(HookChain::new(target.named(name)))
    }

    pub fn with_config(
        target: CallableAdapter<MethodCall<T, A>, R>,
        config: HookChainConfig,
    ) -> Self {
        Self::from_chain(HookChain::with_config(target, config))
    }

    pub fn from_chain(chain: HookChain<MethodCall<T, A>, R>) -> Self {
        Self { chain }
    }

    /// The class-level chain. Hooks added here apply to unbound calls and
    /// seed receivers bound afterwards.
    pub fn class_chain(&self) -> &HookChain<MethodCall<T, A>, R> {
        &self.chain
    }

    /// Access the method through `receiver`.
    pub fn bind(&self, receiver: &Arc<T>) -> BoundMethod<T, A, R> {
        BoundMethod {
            receiver: receiver.clone(),
            chain: self.chain.bind(receiver),
        }
    }

    /// Class-level call with an explicit receiver.
    pub fn call(&self, receiver: Arc<T>, args: A) -> anyhow::Result<R> {
        self.chain.call(MethodCall { receiver, args })
    }

    pub fn call_async(&self, receiver: Arc<T>, args: A) -> BoxFuture<'static, anyhow::Result<R>> {
        self.chain.call_async(MethodCall { receiver, args })
    }
}

/// A method accessed through one receiver.
pub struct BoundMethod<T, A, R> {
    receiver: Arc<T>,
    chain: HookChain<MethodCall<T, A>, R>,
}

impl<T, A, R> BoundMethod<T, A, R>
where
    T: Send + Sync + 'static,
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub fn receiver(&self) -> &Arc<T> {
        &self.receiver
    }

    pub fn chain(&self) -> &HookChain<MethodCall<T, A>, R> {
        &self.chain
    }

    pub fn add_before(&self, hook: Hook<MethodCall<T, A>>) -> ChainResult<HookHandle> {
        self.chain.add_before(hook)
    }

    pub fn add_after(&self, hook: Hook<R>) -> ChainResult<HookHandle> {
        self.chain.add_after(hook)
    }

    pub fn add_decorator(
        &self,
        decorator: Decorator<MethodCall<T, A>, R>,
    ) -> ChainResult<HookHandle> {
        self.chain.add_decorator(decorator)
    }

    fn with_receiver(&self, args: A) -> MethodCall<T, A> {
        MethodCall {
            receiver: self.receiver.clone(),
            args,
        }
    }

    pub fn dispatch(&self, args: A) -> Dispatched<R> {
        self.chain.dispatch(self.with_receiver(args))
    }

    pub fn call(&self, args: A) -> anyhow::Result<R> {
        self.chain.call(self.with_receiver(args))
    }

    pub fn call_async(&self, args: A) -> BoxFuture<'static, anyhow::Result<R>> {
        self.chain.call_async(self.with_receiver(args))
    }
}
