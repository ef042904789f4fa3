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

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hookchain_core::{callable, wrap, CallableAdapter, Decorator, Hook};
use tokio::runtime::Runtime;

fn bench_sync_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_dispatch");

    for hooks in [0usize, 1, 8, 32].iter() {
        let chain = wrap(CallableAdapter::sync(|x: u64| Ok(x.wrapping_mul(31))));
        for _ in 0..*hooks {
            chain
                .add_before(Hook::sync(|x: &u64| {
                    black_box(x);
                    Ok(())
                }))
                .unwrap()
                .detach();
            chain
                .add_after(Hook::sync(|x: &u64| {
                    black_box(x);
                    Ok(())
                }))
                .unwrap()
                .detach();
        }

        group.bench_with_input(BenchmarkId::from_parameter(hooks), hooks, |b, _| {
            b.iter(|| chain.call(black_box(7)).unwrap());
        });
    }

    group.finish();
}

fn bench_decorated_dispatch(c: &mut Criterion) {
    let chain = wrap(CallableAdapter::sync(|x: u64| Ok(x + 1)));
    for _ in 0..4 {
        chain
            .add_decorator(Decorator::sync(|inner| callable(move |x: u64| inner(x + 1))))
            .unwrap()
            .detach();
    }

    c.bench_function("decorated_dispatch", |b| {
        b.iter(|| chain.call(black_box(1)).unwrap());
    });
}

fn bench_async_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let chain = wrap(CallableAdapter::asynchronous(|x: u64| async move { Ok(x * 2) }));
    chain
        .add_before(Hook::sync(|x: &u64| {
            black_box(x);
            Ok(())
        }))
        .unwrap()
        .detach();

    c.bench_function("async_dispatch", |b| {
        b.iter(|| rt.block_on(chain.call_async(black_box(3))).unwrap());
    });
}

fn bench_bind(c: &mut Criterion) {
    let chain = wrap(CallableAdapter::sync(|x: u64| Ok(x)));
    let receivers: Vec<_> = (0..64u64).map(std::sync::Arc::new).collect();

    c.bench_function("bind_cached_receiver", |b| {
        b.iter(|| {
            for receiver in &receivers {
                black_box(chain.bind(receiver));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_sync_dispatch,
    bench_decorated_dispatch,
    bench_async_dispatch,
    bench_bind
);
criterion_main!(benches);
