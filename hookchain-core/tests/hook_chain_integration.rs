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

//! Integration tests for hook chains over dynamic and typed callables

use futures::FutureExt;
use hookchain_core::{
    wrap, CallArgs, CallableAdapter, DynChain, Hook, HookChainError, HookableMethod, MethodCall,
    Mode,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn hello() -> DynChain {
    wrap(
        CallableAdapter::sync(|args: CallArgs| {
            let name = args
                .str_arg(0)
                .ok_or_else(|| anyhow::anyhow!("missing name"))?;
            Ok(Value::String(format!("hello {}", name)))
        })
        .named("hello"),
    )
}

/// Recorded inputs, in the shape (positional, named).
type Inputs = Arc<Mutex<Vec<(Vec<Value>, serde_json::Map<String, Value>)>>>;

fn dump_input(inputs: &Inputs) -> Hook<CallArgs> {
    let sink = inputs.clone();
    Hook::sync(move |args: &CallArgs| {
        let named = args
            .named
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        sink.lock().push((args.positional.clone(), named));
        Ok(())
    })
}

/// Test that a before-hook records exactly the call arguments
#[test]
fn test_hook_func_call_before() {
    let hello = hello();
    let inputs: Inputs = Arc::new(Mutex::new(Vec::new()));
    hello.add_before(dump_input(&inputs)).unwrap().detach();

    let rv = hello.call(CallArgs::positional(["world"])).unwrap();
    assert_eq!(rv, json!("hello world"));

    let inputs = inputs.lock();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].0, vec![json!("world")]);
    assert!(inputs[0].1.is_empty());
}

/// Test that a scoped before-hook stops firing once its scope exits
#[test]
fn test_temporary_hook_func_call_before() {
    let hello = hello();
    let inputs: Inputs = Arc::new(Mutex::new(Vec::new()));
    let args = CallArgs::positional(["world"]);

    {
        let _scope = hello.add_before(dump_input(&inputs)).unwrap();
        assert_eq!(hello.call(args.clone()).unwrap(), json!("hello world"));
        assert_eq!(inputs.lock().len(), 1);
    }

    assert_eq!(hello.call(args.clone()).unwrap(), json!("hello world"));
    assert_eq!(hello.call(args).unwrap(), json!("hello world"));
    assert_eq!(inputs.lock().len(), 1);
}

/// Test that named arguments reach before-hooks untouched
#[test]
fn test_named_arguments_reach_hooks() {
    let hello = hello();
    let inputs: Inputs = Arc::new(Mutex::new(Vec::new()));
    let _scope = hello.add_before(dump_input(&inputs)).unwrap();

    hello
        .call(CallArgs::new().arg("world").kwarg("punctuation", "!"))
        .unwrap();

    let inputs = inputs.lock();
    assert_eq!(inputs[0].1.get("punctuation"), Some(&json!("!")));
}

/// Test that a hook error leaves the chain intact for later calls
#[test]
fn test_failed_call_keeps_hooks() {
    let hello = hello();
    let inputs: Inputs = Arc::new(Mutex::new(Vec::new()));
    let _scope = hello.add_before(dump_input(&inputs)).unwrap();

    assert!(hello.call(CallArgs::new()).is_err());
    assert!(hello.call(CallArgs::positional(["again"])).is_ok());
    assert_eq!(inputs.lock().len(), 2);
    assert_eq!(hello.hook_counts().before, 1);
}

/// Test an async target with an async after-hook
#[tokio::test]
async fn test_async_target_async_after_hook() {
    let fetch: DynChain = wrap(CallableAdapter::asynchronous(|args: CallArgs| async move {
        tokio::task::yield_now().await;
        Ok(json!({ "echo": args.positional }))
    }));
    assert_eq!(fetch.mode(), Mode::Async);

    let recorded = Arc::new(Mutex::new(None));
    let sink = recorded.clone();
    let _scope = fetch
        .add_after(Hook::asynchronous(move |rv: &Value| {
            let rv = rv.clone();
            let sink = sink.clone();
            async move {
                *sink.lock() = Some(rv);
                Ok(())
            }
            .boxed()
        }))
        .unwrap();

    let rv = fetch.call_async(CallArgs::positional([1, 2])).await.unwrap();
    assert_eq!(rv, json!({ "echo": [1, 2] }));
    assert_eq!(recorded.lock().clone(), Some(rv));
}

/// Test that an async hook is rejected on a sync target without mutation
#[test]
fn test_mode_mismatch_leaves_lists_unchanged() {
    let hello = hello();
    let err = hello
        .add_before(Hook::asynchronous(|_: &CallArgs| async { Ok(()) }.boxed()))
        .unwrap_err();
    assert!(matches!(err, HookChainError::ModeMismatch { .. }));
    assert_eq!(hello.hook_counts().before, 0);
    assert_eq!(hello.call(CallArgs::positional(["x"])).unwrap(), json!("hello x"));
}

/// Test per-receiver isolation for a hookable method
#[test]
fn test_hook_obj_method() {
    struct Person;

    let hello: HookableMethod<Person, CallArgs, Value> =
        HookableMethod::sync("Person::hello", |_me: &Person, args: CallArgs| {
            Ok(json!(format!("hello {}", args.str_arg(0).unwrap_or_default())))
        });

    let person = Arc::new(Person);
    let other = Arc::new(Person);
    let inputs = Arc::new(Mutex::new(Vec::new()));
    let sink = inputs.clone();

    {
        let _scope = hello
            .bind(&person)
            .add_before(Hook::sync(move |call: &MethodCall<Person, CallArgs>| {
                sink.lock()
                    .push((Arc::as_ptr(&call.receiver) as usize, call.args.clone()));
                Ok(())
            }))
            .unwrap();

        let args = CallArgs::positional(["world"]);
        assert_eq!(hello.bind(&other).call(args.clone()).unwrap(), json!("hello world"));
        assert!(inputs.lock().is_empty());

        assert_eq!(hello.bind(&person).call(args.clone()).unwrap(), json!("hello world"));
        assert_eq!(
            *inputs.lock(),
            vec![(Arc::as_ptr(&person) as usize, args)]
        );
    }

    hello.bind(&person).call(CallArgs::positional(["later"])).unwrap();
    assert_eq!(inputs.lock().len(), 1);
}

proptest! {
    /// Before- and after-hooks fire in registration order for any count.
    #[test]
    fn prop_registration_order_preserved(before in 0usize..12, after in 0usize..12) {
        let chain = wrap(CallableAdapter::sync(|x: u32| Ok(x)));
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..before {
            let order = order.clone();
            chain
                .add_before(Hook::sync(move |_: &u32| {
                    order.lock().push(("before", i));
                    Ok(())
                }))
                .unwrap()
                .detach();
        }
        for i in 0..after {
            let order = order.clone();
            chain
                .add_after(Hook::sync(move |_: &u32| {
                    order.lock().push(("after", i));
                    Ok(())
                }))
                .unwrap()
                .detach();
        }

        chain.call(0).unwrap();

        let expected: Vec<_> = (0..before)
            .map(|i| ("before", i))
            .chain((0..after).map(|i| ("after", i)))
            .collect();
        prop_assert_eq!(order.lock().clone(), expected);
    }
}
