use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dcontainer::{HashMap, ListMap, Safe, Unsync};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_set_100k(c: &mut Criterion) {
    c.bench_function("hash_map::set_100k_safe", |b| {
        b.iter_batched(
            HashMap::<String, u64, Safe>::new,
            |m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.set(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("hash_map::set_100k_unsync", |b| {
        b.iter_batched(
            HashMap::<String, u64, Unsync>::new,
            |m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.set(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_search_hit_10k(c: &mut Criterion) {
    let keys: Vec<String> = lcg(2).take(10_000).map(key).collect();
    let m: HashMap<String, u64> = keys.iter().cloned().zip(0..).collect();
    c.bench_function("hash_map::search_hit_10k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for k in &keys {
                sum += m.search(k.as_str()).unwrap_or(0);
            }
            black_box(sum)
        })
    });
}

fn bench_list_map_remove_10k(c: &mut Criterion) {
    c.bench_function("list_map::remove_random_10k_of_100k", |b| {
        b.iter_batched(
            || {
                let keys: Vec<String> = lcg(3).take(100_000).map(key).collect();
                let m: ListMap<String, u64> = keys.iter().cloned().zip(0..).collect();
                (m, keys)
            },
            |(m, keys)| {
                for k in keys.iter().step_by(10) {
                    let _ = m.remove(k.as_str());
                }
                black_box(m)
            },
            BatchSize::LargeInput,
        )
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
    targets = bench_set_100k, bench_search_hit_10k, bench_list_map_remove_10k
}
criterion_main!(benches);
