//! Benchmarks for request fingerprinting
//!
//! This benchmark measures:
//! - Canonical serialization + SHA-256 over typical selection sizes
//! - Key lookup round trip through the in-memory cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use neurodrive_relay::cache::{CacheConfig, CacheKeyGenerator, MemoryCache, RequestCache};
use neurodrive_relay::{Mode, OptionsBag, ProcessRequest};

fn sample_text(bytes: usize) -> String {
    "The quick brown fox jumps over the lazy dog. "
        .chars()
        .cycle()
        .take(bytes)
        .collect()
}

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_key");
    let keys = CacheKeyGenerator::new();
    let options = OptionsBag::new("8th grade", true, "general");

    for size in [256usize, 4 * 1024, 100 * 1024] {
        let request = ProcessRequest::new(Mode::Simplify, sample_text(size), options.clone());
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("generate", size), &request, |b, req| {
            b.iter(|| keys.generate(black_box(req)))
        });
    }
    group.finish();
}

fn bench_cache_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = RequestCache::new(CacheConfig::default(), Box::new(MemoryCache::new(1024)));
    let request = ProcessRequest::new(
        Mode::Summarize,
        sample_text(4 * 1024),
        OptionsBag::new("college", false, "researchers"),
    );
    let key = cache.key(&request);
    let payload = serde_json::json!({"output": sample_text(512)});
    rt.block_on(cache.store(&key, &payload)).unwrap();

    c.bench_function("cache_lookup_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let key = cache.key(black_box(&request));
            cache.lookup(&key).await.unwrap()
        })
    });
}

criterion_group!(benches, bench_key_generation, bench_cache_round_trip);
criterion_main!(benches);
