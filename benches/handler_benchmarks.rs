//! Criterion benchmarks for gcloud-log-handler

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use gcloud_log_handler::core::{decorate, Map, PayloadTree};
use gcloud_log_handler::prelude::*;
use std::sync::Arc;

fn request_attrs() -> Vec<Attribute> {
    vec![
        Attribute::string("method", "GET"),
        Attribute::string("path", "/api/v1/users"),
        Attribute::int("status", 200),
        Attribute::duration("latency", std::time::Duration::from_micros(1250)),
    ]
}

// ============================================================================
// Handler Benchmarks
// ============================================================================

fn bench_handle(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle");
    group.throughput(Throughput::Elements(1));

    let logger = Logger::new(CloudHandler::new(Discard));
    group.bench_function("message_only", |b| {
        b.iter(|| logger.info(black_box("Info message"), []));
    });

    group.bench_function("with_attrs", |b| {
        b.iter(|| logger.info(black_box("request"), request_attrs()));
    });

    let nested = logger
        .with([Attribute::string("service", "api")])
        .with_group("http")
        .with_group("request");
    group.bench_function("nested_groups", |b| {
        b.iter(|| nested.info(black_box("request"), request_attrs()));
    });

    let ctx = Context::background()
        .with_labels([("request", "r-1"), ("tenant", "acme")])
        .with_span(SpanContext::new(0x4bf92f3577b34da6a3ce929d0e0e4736, 0x00f067aa0ba902b7, true));
    let traced = Logger::new(CloudHandler::builder(Discard).otel_tracing().add_source().build());
    group.bench_function("labels_and_trace", |b| {
        b.iter(|| traced.log(&ctx, Level::INFO, black_box("request"), request_attrs()));
    });

    group.finish();
}

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");

    let logger = Logger::new(CloudHandler::builder(Discard).log_level(Level::ERROR).build());
    group.bench_function("filtered_out", |b| {
        b.iter(|| logger.debug(black_box("Debug message"), []));
    });

    group.bench_function("filtered_out_macro", |b| {
        b.iter(|| gcloud_log_handler::debug!(logger, "value {}", black_box(42)));
    });

    group.finish();
}

// ============================================================================
// Payload Benchmarks
// ============================================================================

fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    let tree = PayloadTree::new()
        .with_attrs(request_attrs(), None)
        .with_group("http");
    group.bench_function("derive_child", |b| {
        b.iter(|| black_box(tree.with_attrs(vec![Attribute::int("n", 1)], None)));
    });

    group.bench_function("decorate_group", |b| {
        b.iter(|| {
            let mut fields = Map::new();
            decorate(&mut fields, Attribute::group("request", request_attrs()));
            black_box(fields)
        });
    });

    group.finish();
}

// ============================================================================
// Serialization Benchmarks
// ============================================================================

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(CloudHandler::new(sink.clone()))
        .with_group("http");
    logger.info("request", request_attrs());
    let entry = sink.entries().remove(0);

    group.bench_function("entry_to_json", |b| {
        b.iter(|| black_box(entry.to_json()));
    });

    group.finish();
}

// ============================================================================
// Buffered Sink Benchmarks
// ============================================================================

fn bench_buffered(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffered");
    group.throughput(Throughput::Elements(1));

    let buffered = Arc::new(BufferedSink::builder(Discard).capacity(100_000).build());
    let logger = Logger::new(CloudHandler::new(buffered.clone()));
    group.bench_function("enqueue", |b| {
        b.iter(|| logger.info(black_box("buffered"), []));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_handle,
    bench_level_filtering,
    bench_payload,
    bench_serialization,
    bench_buffered
);

criterion_main!(benches);
