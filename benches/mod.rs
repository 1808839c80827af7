use criterion::{criterion_group, criterion_main};


use server::dispatcher::register_benchmarks as register_dispatcher_benchmarks;
use server::feed::register_benchmarks as register_feed_benchmarks;
use server::queue::register_benchmarks as register_queue_benchmarks;

criterion_group!(
    benches,
    register_queue_benchmarks,
    register_feed_benchmarks,
    register_dispatcher_benchmarks,
);

criterion_main!(benches);
