//! Benchmarks for the envelope codec
//!
//! This benchmark measures:
//! - Request envelope construction and serialization
//! - Response parsing for each normalized response type
//! - Job snapshot decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{json, Map, Value};

use deepexec_mcp::protocol::{build_request, parse_response, RequestType};
use deepexec_mcp::Job;

const SESSION: &str = "sess_bench_000001";

fn code_input(lines: usize) -> Map<String, Value> {
    let code: String = (0..lines).map(|i| format!("print({})\n", i)).collect();
    let mut input = Map::new();
    input.insert("code".into(), Value::from(code));
    input.insert("language".into(), Value::from("python"));
    input.insert("environment".into(), json!({"PYTHONUNBUFFERED": "1"}));
    input.insert("working_directory".into(), Value::from("/home/user"));
    input
}

fn bench_build_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_request");

    for lines in [1usize, 100, 1000] {
        let input = code_input(lines);
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_function(format!("code_execution_{}_lines", lines), |b| {
            b.iter(|| {
                let envelope = build_request(
                    RequestType::CodeExecution,
                    Some(black_box(SESSION)),
                    input.clone(),
                    Map::new(),
                );
                serde_json::to_string(&envelope.to_value()).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_parse_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_response");

    let execution = json!({
        "protocol_version": "2024.1",
        "type": "code_execution_result",
        "status": "success",
        "session_id": SESSION,
        "output": {"execution_result": {
            "output": "0\n1\n2\n", "exit_code": 0, "execution_time": 31, "memory_usage": 12
        }},
        "metadata": {"language": "python"}
    });
    let generation = json!({
        "protocol_version": "2024.1",
        "type": "text_generation_result",
        "status": "success",
        "output": {"text": "Lorem ipsum dolor sit amet ".repeat(64)},
        "metadata": {
            "model": "deepseek-v3",
            "generation_time": 420,
            "usage": {"prompt_tokens": 12, "completion_tokens": 384, "total_tokens": 396}
        }
    });
    let error = json!({
        "protocol_version": "2024.1",
        "status": "error",
        "error": {"code": "rate_limit_exceeded", "message": "Slow down", "details": {"retry_after": 5}}
    });

    group.bench_function("code_execution_result", |b| {
        b.iter(|| parse_response(black_box(execution.clone())).unwrap())
    });
    group.bench_function("text_generation_result", |b| {
        b.iter(|| parse_response(black_box(generation.clone())).unwrap())
    });
    group.bench_function("error_envelope", |b| {
        b.iter(|| parse_response(black_box(error.clone())).unwrap_err())
    });

    group.finish();
}

fn bench_job_snapshot(c: &mut Criterion) {
    let raw = json!({
        "protocol_version": "2024.1",
        "job_id": "job-bench-1",
        "status": "completed",
        "progress": 100,
        "created_at": "2024-01-01T00:00:00Z",
        "completed_at": "2024-01-01T00:00:03Z",
        "tags": ["bench"],
        "result": {"output": "ok\n", "exit_code": 0, "execution_time": 3000, "memory_usage": 64}
    });

    c.bench_function("job_from_wire", |b| {
        b.iter(|| Job::from_wire(black_box(&raw)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_build_request,
    bench_parse_response,
    bench_job_snapshot,
);
criterion_main!(benches);
