use criterion::{BenchmarkId, Criterion};
use parfeed::{Feed, OrderedFeed};
use std::hint::black_box;

fn populated(size: usize) -> OrderedFeed {
    let feed = OrderedFeed::new();
    for i in 0..size {
        feed.add(format!("post {i}"), i as f64);
    }
    feed
}

/// Register benchmarks for the ordered feed.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("OrderedFeed");

    for &size in &[100usize, 1_000, 10_000] {
        // Ascending timestamps always land at the head
        group.bench_with_input(BenchmarkId::new("add_newest", size), &size, |b, &size| {
            b.iter_with_setup(
                || populated(size),
                |feed| {
                    feed.add("newest".to_string(), black_box(size as f64 + 1.0));
                    feed
                },
            );
        });

        // The oldest post sits at the tail, so this walks the whole chain
        group.bench_with_input(BenchmarkId::new("add_oldest", size), &size, |b, &size| {
            b.iter_with_setup(
                || populated(size),
                |feed| {
                    feed.add("oldest".to_string(), black_box(-1.0));
                    feed
                },
            );
        });

        group.bench_with_input(BenchmarkId::new("contains_miss", size), &size, |b, &size| {
            let feed = populated(size);
            b.iter(|| black_box(feed.contains(black_box(-1.0))));
        });

        group.bench_with_input(BenchmarkId::new("snapshot", size), &size, |b, &size| {
            let feed = populated(size);
            b.iter(|| black_box(feed.snapshot()));
        });

        group.bench_with_input(BenchmarkId::new("remove_oldest", size), &size, |b, &size| {
            b.iter_with_setup(
                || populated(size),
                |feed| {
                    assert!(feed.remove(black_box(0.0)));
                    feed
                },
            );
        });
    }

    group.finish();
}
