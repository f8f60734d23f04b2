use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::prelude::*;
use rand::rngs::StdRng;

use hi_id_pool::{config, IdPool};

const EXP_MAX: usize = 23;

fn pool_with_random_half_used() -> IdPool<config::_64bit> {
    let mut rng = StdRng::seed_from_u64(0xB0B);
    let mut pool: IdPool = IdPool::new(EXP_MAX);
    let max_elements = pool.max_elements();
    for _ in 0..max_elements / 2 {
        pool.set_free(rng.gen_range(0..max_elements), false);
    }
    pool
}

pub fn bench_obtain(c: &mut Criterion) {
    c.bench_function("init + obtain all in order", |b| {
        b.iter(|| {
            let mut pool: IdPool = IdPool::new(EXP_MAX);
            for _ in 0..pool.max_elements() {
                black_box(pool.obtain());
            }
            pool
        })
    });

    c.bench_function("obtain 1024 in order", |b| {
        b.iter_batched(
            || IdPool::<config::_64bit>::new(EXP_MAX),
            |mut pool| {
                for _ in 0..1024 {
                    black_box(pool.obtain());
                }
                pool
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("obtain half in order", |b| {
        b.iter_batched(
            || IdPool::<config::_64bit>::new(EXP_MAX),
            |mut pool| {
                for _ in 0..pool.max_elements() / 2 {
                    black_box(pool.obtain());
                }
                pool
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("obtain half - random free order", |b| {
        b.iter_batched(
            pool_with_random_half_used,
            |mut pool| {
                for _ in 0..pool.max_elements() / 2 {
                    black_box(pool.obtain());
                }
                pool
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("set all used manually", |b| {
        b.iter_batched(
            pool_with_random_half_used,
            |mut pool| {
                for id in 0..pool.max_elements() {
                    pool.set_free(id, false);
                }
                pool
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches_alloc, bench_obtain);
criterion_main!(benches_alloc);
