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

//! Dispatcher: runs one call through a snapshot of a chain.
//!
//! Two tracks, picked once from the target's mode:
//!
//! - **Sync**: before-hooks, the decorated target, after-hooks, all on the
//!   calling thread.
//! - **Async**: before-hooks, the raw target, after-hooks, awaiting each
//!   async hook and calling each sync hook directly.
//!
//! Decorators only apply on the sync track. Any failure is returned as-is
//! and skips the rest of the call; the chain's lists are never touched.

use crate::adapter::{Callable, CallableAdapter, Decorator, Hook, HookEntry, Mode};
use crate::error::HookChainError;
use futures::future::{self, BoxFuture, FutureExt};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of dispatching one call.
///
/// A synchronous target completes during dispatch; an asynchronous target
/// yields a future. Either form can be awaited.
pub enum Dispatched<R> {
    Ready(anyhow::Result<R>),
    Pending(BoxFuture<'static, anyhow::Result<R>>),
}

impl<R> Dispatched<R> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Dispatched::Ready(_))
    }

    /// The result of a synchronous dispatch, or `None` if awaiting is needed.
    pub fn into_ready(self) -> Option<anyhow::Result<R>> {
        match self {
            Dispatched::Ready(result) => Some(result),
            Dispatched::Pending(_) => None,
        }
    }
}

impl<R: Send + 'static> IntoFuture for Dispatched<R> {
    type Output = anyhow::Result<R>;
    type IntoFuture = BoxFuture<'static, anyhow::Result<R>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Dispatched::Ready(result) => future::ready(result).boxed(),
            Dispatched::Pending(fut) => fut,
        }
    }
}

/// Fold `decorators` onto `base`, first-registered innermost.
pub(crate) fn fold_decorators<A, R>(
    base: Callable<A, R>,
    decorators: &[HookEntry<Decorator<A, R>>],
) -> Callable<A, R> {
    decorators
        .iter()
        .fold(base, |inner, entry| match &entry.hook {
            Decorator::Sync(decorate) => decorate(inner),
            // Rejected at registration.
            Decorator::Async(_) => inner,
        })
}

/// Everything one call needs, captured when the call starts.
pub(crate) struct CallPlan<A, R> {
    pub(crate) target: CallableAdapter<A, R>,
    pub(crate) before: Arc<Vec<HookEntry<Hook<A>>>>,
    pub(crate) after: Arc<Vec<HookEntry<Hook<R>>>>,
    pub(crate) decorators: Arc<Vec<HookEntry<Decorator<A, R>>>>,
    pub(crate) trace: bool,
}

impl<A, R> CallPlan<A, R>
where
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub(crate) fn run_sync(self, args: A) -> anyhow::Result<R> {
        let start = Instant::now();
        let result = self.execute_sync(args);
        self.trace_done(Mode::Sync, start, &result);
        result
    }

    pub(crate) async fn run_async(self, args: A) -> anyhow::Result<R> {
        let start = Instant::now();
        let result = self.execute_async(args).await;
        self.trace_done(Mode::Async, start, &result);
        result
    }

    fn execute_sync(&self, args: A) -> anyhow::Result<R> {
        for entry in self.before.iter() {
            self.observe_sync(entry, &args)?;
        }

        let target = match self.target.sync_callable() {
            Some(base) => fold_decorators(base, &self.decorators),
            None => return self.target.invoke(args),
        };
        let rv = target(args)?;

        for entry in self.after.iter() {
            self.observe_sync(entry, &rv)?;
        }
        Ok(rv)
    }

    async fn execute_async(&self, args: A) -> anyhow::Result<R> {
        for entry in self.before.iter() {
            match &entry.hook {
                Hook::Sync(hook) => hook(&args)?,
                Hook::Async(hook) => hook(&args).await?,
            }
        }

        let rv = self.target.invoke_async(args).await?;

        for entry in self.after.iter() {
            match &entry.hook {
                Hook::Sync(hook) => hook(&rv)?,
                Hook::Async(hook) => hook(&rv).await?,
            }
        }
        Ok(rv)
    }

    fn observe_sync<T>(&self, entry: &HookEntry<Hook<T>>, value: &T) -> anyhow::Result<()> {
        match &entry.hook {
            Hook::Sync(hook) => hook(value),
            Hook::Async(_) => Err(HookChainError::ModeMismatch {
                chain: self.target.name().to_string(),
                kind: entry.kind,
            }
            .into()),
        }
    }

    fn trace_done(&self, mode: Mode, start: Instant, result: &anyhow::Result<R>) {
        if !self.trace {
            return;
        }
        tracing::debug!(
            chain = %self.target.name(),
            mode = %mode,
            before = self.before.len(),
            after = self.after.len(),
            decorators = self.decorators.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Dispatch completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::{callable, CallableAdapter, Decorator, Hook};
    use crate::chain::{wrap, HookChain, HookCounts};
    use crate::handle::HookHandle;
    use futures::FutureExt;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn async_double() -> HookChain<u32, u32> {
        wrap(CallableAdapter::asynchronous(|x: u32| async move {
            tokio::task::yield_now().await;
            Ok(x * 2)
        }))
    }

    #[tokio::test]
    async fn test_async_target_with_async_after_hook() {
        let chain = async_double();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let _guard = chain
            .add_after(Hook::asynchronous(move |rv: &u32| {
                let rv = *rv;
                let sink = sink.clone();
                async move {
                    tokio::task::yield_now().await;
                    *sink.lock() = Some(rv);
                    Ok(())
                }
                .boxed()
            }))
            .unwrap();

        let rv = chain.call_async(21).await.unwrap();
        assert_eq!(rv, 42);
        assert_eq!(*seen.lock(), Some(42));
    }

    #[tokio::test]
    async fn test_mixed_hooks_on_async_target_keep_order() {
        let chain = async_double();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        chain
            .add_before(Hook::sync(move |x: &u32| {
                o.lock().push(format!("sync-before {}", x));
                Ok(())
            }))
            .unwrap()
            .detach();
        let o = order.clone();
        chain
            .add_before(Hook::asynchronous(move |x: &u32| {
                let o = o.clone();
                let x = *x;
                async move {
                    o.lock().push(format!("async-before {}", x));
                    Ok(())
                }
                .boxed()
            }))
            .unwrap()
            .detach();
        let o = order.clone();
        chain
            .add_after(Hook::sync(move |rv: &u32| {
                o.lock().push(format!("sync-after {}", rv));
                Ok(())
            }))
            .unwrap()
            .detach();

        assert_eq!(chain.dispatch(5).await.unwrap(), 10);
        assert_eq!(
            *order.lock(),
            vec!["sync-before 5", "async-before 5", "sync-after 10"]
        );
    }

    #[tokio::test]
    async fn test_async_target_failure_skips_after_hooks() {
        let chain = wrap(CallableAdapter::asynchronous(|_: ()| async move {
            Err::<u32, _>(anyhow::anyhow!("unreachable host"))
        }));
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let _guard = chain
            .add_after(Hook::sync(move |_: &u32| {
                *flag.lock() = true;
                Ok(())
            }))
            .unwrap();

        let err = chain.call_async(()).await.unwrap_err();
        assert_eq!(err.to_string(), "unreachable host");
        assert!(!*ran.lock());
    }

    #[tokio::test]
    async fn test_decorators_do_not_apply_on_async_track() {
        let chain = async_double();
        let _guard = chain
            .add_decorator(Decorator::sync(|_inner| callable(|_: u32| Ok(0))))
            .unwrap();

        assert_eq!(chain.call_async(4).await.unwrap(), 8);
        assert_eq!(chain.hook_counts().decorators, 1);
    }

    #[tokio::test]
    async fn test_sync_dispatch_is_ready() {
        let chain = wrap(CallableAdapter::sync(|x: u32| Ok(x + 1)));
        let dispatched = chain.dispatch(1);
        assert!(dispatched.is_ready());
        assert_eq!(dispatched.into_ready().unwrap().unwrap(), 2);

        assert_eq!(chain.dispatch(2).await.unwrap(), 3);
        assert!(!async_double().dispatch(1).is_ready());
    }

    #[tokio::test]
    async fn test_concurrent_async_calls() {
        let chain = async_double();
        let count = Arc::new(Mutex::new(0u32));
        let c = count.clone();
        chain
            .add_before(Hook::sync(move |_: &u32| {
                *c.lock() += 1;
                Ok(())
            }))
            .unwrap()
            .detach();

        let calls: Vec<_> = (0..16).map(|i| chain.call_async(i)).collect();
        let results = futures::future::join_all(calls).await;

        let values: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..16).map(|i| i * 2).collect::<Vec<_>>());
        assert_eq!(*count.lock(), 16);
    }

    #[tokio::test]
    async fn test_spawned_call_runs_on_runtime() {
        let chain = async_double();
        let handle = tokio::spawn(chain.call_async(7));
        assert_eq!(handle.await.unwrap().unwrap(), 14);
    }

    #[test]
    fn test_sync_chain_awaits_without_runtime() {
        let chain = wrap(CallableAdapter::sync(|x: u32| Ok(x + 1)));
        let rv = tokio_test::block_on(chain.call_async(1)).unwrap();
        assert_eq!(rv, 2);
    }

    /// An async before-hook that signals `entered`, then waits on `gate`.
    fn gated_hook(entered: Arc<Notify>, gate: Arc<Notify>) -> Hook<u32> {
        Hook::asynchronous(move |_: &u32| {
            let entered = entered.clone();
            let gate = gate.clone();
            async move {
                entered.notify_one();
                gate.notified().await;
                Ok(())
            }
            .boxed()
        })
    }

    fn counting_hook(count: Arc<Mutex<usize>>) -> Hook<u32> {
        Hook::sync(move |_: &u32| {
            *count.lock() += 1;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_async_removal_mid_call_affects_only_later_calls() {
        let chain = async_double();
        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        chain
            .add_before(gated_hook(entered.clone(), gate.clone()))
            .unwrap()
            .detach();

        let runs = Arc::new(Mutex::new(0));
        let victim: HookHandle = chain.add_before(counting_hook(runs.clone())).unwrap();

        let call = tokio::spawn(chain.call_async(3));
        entered.notified().await;
        // The call is suspended in the first hook with its snapshot taken.
        assert!(victim.release());
        gate.notify_one();
        assert_eq!(call.await.unwrap().unwrap(), 6);
        assert_eq!(*runs.lock(), 1);

        gate.notify_one();
        assert_eq!(chain.call_async(4).await.unwrap(), 8);
        assert_eq!(*runs.lock(), 1);
        assert_eq!(chain.hook_counts().before, 1);
    }

    #[tokio::test]
    async fn test_cancelled_call_leaves_chain_intact() {
        let chain = async_double();
        let first = Arc::new(Mutex::new(0));
        let after = Arc::new(Mutex::new(0));
        let entered = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());

        chain
            .add_before(counting_hook(first.clone()))
            .unwrap()
            .detach();
        chain
            .add_before(gated_hook(entered.clone(), gate.clone()))
            .unwrap()
            .detach();
        chain
            .add_after(counting_hook(after.clone()))
            .unwrap()
            .detach();
        let counts = chain.hook_counts();

        let mut pending = chain.call_async(5);
        assert!(futures::poll!(&mut pending).is_pending());
        assert_eq!(*first.lock(), 1);
        drop(pending);

        assert_eq!(chain.hook_counts(), counts);
        assert_eq!(
            counts,
            HookCounts {
                before: 2,
                after: 1,
                decorators: 0,
            }
        );
        assert_eq!(*after.lock(), 0);

        gate.notify_one();
        assert_eq!(chain.call_async(5).await.unwrap(), 10);
        assert_eq!(*first.lock(), 2);
        assert_eq!(*after.lock(), 1);
    }
}
