use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dcontainer::TreeMap;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_set_random_100k(c: &mut Criterion) {
    c.bench_function("tree_map::set_random_100k", |b| {
        b.iter_batched(
            TreeMap::<u64, u64>::new,
            |m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.set(x, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_set_sequential_100k(c: &mut Criterion) {
    c.bench_function("tree_map::set_sequential_100k", |b| {
        b.iter_batched(
            TreeMap::<u64, u64>::new,
            |m| {
                for i in 0..100_000u64 {
                    m.set(i, i);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_ceiling_10k(c: &mut Criterion) {
    let m: TreeMap<u64, u64> = lcg(2).take(100_000).map(|x| (x, x)).collect();
    let probes: Vec<u64> = lcg(3).take(10_000).collect();
    c.bench_function("tree_map::ceiling_10k_of_100k", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for p in &probes {
                hits += usize::from(m.ceiling(p).is_some());
            }
            black_box(hits)
        })
    });
}

fn bench_iterate_from(c: &mut Criterion) {
    let m: TreeMap<u64, u64> = (0..100_000u64).map(|x| (x, x)).collect();
    c.bench_function("tree_map::iterate_from_1k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            let mut left = 1000;
            m.iterate_from(&50_000, true, |_, v| {
                sum += v;
                left -= 1;
                left > 0
            });
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_set_random_100k, bench_set_sequential_100k, bench_ceiling_10k, bench_iterate_from
}
criterion_main!(benches);
