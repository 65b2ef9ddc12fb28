//! Benchmark for decoding and filtering invocation log lines
//! Run: cargo bench -p guardwatch-core --bench decoding

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use guardwatch_core::{decode_intervened, ModelInvocationLog};
use std::hint::black_box;

const BLOCKED: &str = r#"{"timestamp":"2024-12-03T00:31:02Z","identity":{"arn":"arn:aws:sts::111111111111:assumed-role/app/session"},"region":"us-west-2","modelId":"anthropic.claude-3-haiku-20240307-v1:0","input":{"inputBodyJson":{"messages":[{"role":"user","content":[{"text":"You are a worthless idiot."}]}]}},"output":{"outputBodyJson":{"output":{"message":{"role":"assistant","content":[{"text":"Sorry, I can not respond to this."}]}},"stopReason":"guardrail_intervened"}}}"#;
const COMPLETED: &str = r#"{"region":"us-west-2","modelId":"anthropic.claude-3-haiku-20240307-v1:0","input":{"inputBodyJson":{"messages":[{"role":"user","content":[{"text":"What does comprehensive auto coverage include?"}]}]}},"output":{"outputBodyJson":{"output":{"message":{"role":"assistant","content":[{"text":"Comprehensive coverage pays for damage not caused by a collision."}]}},"stopReason":"end_turn"}}}"#;

fn bench_single_record(c: &mut Criterion) {
    c.bench_function("decode_single_record", |b| {
        b.iter(|| ModelInvocationLog::from_json(black_box(BLOCKED)))
    });
}

fn bench_filter_batch(c: &mut Criterion) {
    let batch: Vec<&str> = (0..100)
        .map(|i| if i % 3 == 0 { BLOCKED } else { COMPLETED })
        .collect();

    let mut group = c.benchmark_group("decode_intervened");
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("batch_100", |b| {
        b.iter(|| decode_intervened(black_box(batch.iter())))
    });
    group.finish();
}

criterion_group!(benches, bench_single_record, bench_filter_batch);
criterion_main!(benches);
