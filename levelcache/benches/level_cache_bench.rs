use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use levelcache::{CacheConfig, LevelCache};
use std::hint::black_box;
use uuid::Uuid;

fn create_cache(levels: &[(usize, &str)]) -> LevelCache {
    let mut builder = CacheConfig::builder().cache_name("bench-cache").max_levels(10);
    for &(capacity, policy) in levels {
        builder = builder.level(capacity, policy);
    }
    LevelCache::new(builder.build()).unwrap()
}

fn bench_put_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_cascade");

    for policy in ["LRU", "LFU"] {
        let cache = create_cache(&[(10, policy), (50, policy), (90, policy)]);
        group.bench_with_input(BenchmarkId::from_parameter(policy), &cache, |b, cache| {
            b.iter(|| {
                let key = Uuid::new_v4().to_string();
                cache.put(black_box(key), black_box("foobar")).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");

    for policy in ["LRU", "LFU"] {
        let cache = create_cache(&[(1000, policy)]);
        for i in 0..1000 {
            cache.put(format!("key{}", i), "value").unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(policy), &cache, |b, cache| {
            let mut i = 0usize;
            b.iter(|| {
                let key = format!("key{}", i % 1000);
                i += 1;
                black_box(cache.get(&key).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_get_lower_level(c: &mut Criterion) {
    let cache = create_cache(&[(10, "LRU"), (1000, "LRU")]);
    for i in 0..500 {
        cache.put(format!("key{}", i), "value").unwrap();
    }

    c.bench_function("get_lower_level", |b| {
        b.iter(|| {
            // key0..key489 were pushed down to L2
            black_box(cache.get(black_box("key42")).unwrap());
        });
    });
}

fn bench_put_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_all");

    for size in [10, 100, 1000] {
        let cache = create_cache(&[(256, "LRU"), (1024, "LFU")]);
        let entries: Vec<(String, String)> = (0..size)
            .map(|i| (format!("key{}", i), format!("value{}", i)))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| {
                cache.put_all(entries.iter().cloned()).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_cascade,
    bench_get_hit,
    bench_get_lower_level,
    bench_put_all
);
criterion_main!(benches);
