//! Throughput Benchmark for ttlkv
//!
//! This benchmark measures the performance of the expiring store
//! under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use ttlkv::ExpiringStore;

fn new_store() -> Arc<ExpiringStore<Bytes, Bytes>> {
    Arc::new(ExpiringStore::new(100_000, Duration::from_secs(3600)))
}

/// Benchmark PUT operations
fn bench_put(c: &mut Criterion) {
    let store = new_store();

    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.put(key, Bytes::from("small_value"));
            i += 1;
        });
    });

    group.bench_function("put_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.put(key, value.clone());
            i += 1;
        });
    });

    group.bench_function("overwrite", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("hot:{}", i % 100));
            store.put(key, Bytes::from("value"));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = new_store();

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        store.put(key, value);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(store.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(store.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let store = new_store();

    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        store.put(key, value);
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                let key = Bytes::from(format!("new:{}", i));
                store.put(key, Bytes::from("value"));
            } else {
                let key = Bytes::from(format!("key:{}", i % 10_000));
                black_box(store.get(&key));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = new_store();
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            store.put(key.clone(), Bytes::from("value"));
                            store.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

/// Benchmark expiry operations
fn bench_expiry(c: &mut Criterion) {
    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("renew_existing", |b| {
        let store = new_store();
        for i in 0..10_000 {
            store.put(Bytes::from(format!("renew:{}", i)), Bytes::from("value"));
        }

        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("renew:{}", i % 10_000));
            black_box(store.renew_key(&key));
            i += 1;
        });
    });

    group.bench_function("sweep_10k_expired", |b| {
        b.iter_batched(
            || {
                let store = new_store();
                // Each put sweeps first, so let them all expire together
                for i in 0..10_000 {
                    store.put_with_ttl_millis(
                        Bytes::from(format!("expire:{}", i)),
                        Bytes::from("value"),
                        100,
                    );
                }
                std::thread::sleep(Duration::from_millis(120));
                store
            },
            |store| black_box(store.sweep()),
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_expiry,
);

criterion_main!(benches);
