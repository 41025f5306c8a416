//! Shared fixtures: a scripted in-memory transport and canned envelopes.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use deepexec_mcp::transport::{BlockingTransport, Call, Transport, WireResponse};
use deepexec_mcp::{BoxStream, ClientConfig, Error, JitterSource, RetryPolicy};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SESSION_ID: &str = "sess_test_0001";

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<Result<WireResponse, Error>>>,
    fallback: HashMap<String, WireResponse>,
    calls: Vec<Call>,
}

/// Transport that answers from per-path queues and records every call.
///
/// Clones share state, so a test can keep a handle after moving one into a client.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport with a successful session handshake already queued.
    pub fn with_session() -> Self {
        let t = Self::new();
        t.respond("/sessions", 200, session_created());
        t
    }

    pub fn push(&self, path: &str, response: Result<WireResponse, Error>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) -> &Self {
        self.push(path, Ok(WireResponse::new(status, body.to_string())))
    }

    pub fn fail(&self, path: &str, err: Error) -> &Self {
        self.push(path, Err(err))
    }

    /// Answer used once the queue for `path` is empty.
    pub fn always(&self, path: &str, status: u16, body: Value) -> &Self {
        self.script
            .lock()
            .unwrap()
            .fallback
            .insert(path.to_string(), WireResponse::new(status, body.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    fn next(&self, call: &Call) -> Result<WireResponse, Error> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call.clone());
        if let Some(r) = script
            .queued
            .get_mut(&call.path)
            .and_then(VecDeque::pop_front)
        {
            return r;
        }
        script
            .fallback
            .get(&call.path)
            .cloned()
            .ok_or_else(|| Error::protocol(format!("no scripted response for {}", call.path)))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, call: &Call) -> deepexec_mcp::Result<WireResponse> {
        self.next(call)
    }

    async fn open_stream(&self, call: &Call) -> deepexec_mcp::Result<BoxStream<'static, Bytes>> {
        let response = self.next(call)?;
        if !response.is_success() {
            return Err(deepexec_mcp::client::error_classification::classify_status(
                response.status,
                &response.body,
            ));
        }
        // Split into small pieces so the decoder has to reassemble lines.
        let pieces: Vec<deepexec_mcp::Result<Bytes>> = response
            .body
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(pieces)))
    }
}

impl BlockingTransport for ScriptedTransport {
    fn post(&self, call: &Call) -> deepexec_mcp::Result<WireResponse> {
        self.next(call)
    }
}

/// Credentials present, no backoff delay, fast polling.
pub fn config() -> ClientConfig {
    ClientConfig {
        endpoint: "http://scripted.test/v1".into(),
        deepseek_key: Some("ds-test".into()),
        e2b_key: Some("e2b-test".into()),
        max_retries: 3,
        retry_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(5),
        ..ClientConfig::default()
    }
}

pub fn retry_policy(config: &ClientConfig) -> RetryPolicy {
    RetryPolicy::from_config(config).with_jitter(JitterSource::Fixed(0.0))
}

pub fn session_created() -> Value {
    json!({
        "protocol_version": "2024.1",
        "type": "session_created",
        "status": "success",
        "session_id": SESSION_ID
    })
}

pub fn job(id: &str, status: &str) -> Value {
    json!({
        "protocol_version": "2024.1",
        "job_id": id,
        "status": status,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

pub fn completed_job(id: &str, result: Value) -> Value {
    let mut v = job(id, "completed");
    v["result"] = result;
    v["progress"] = json!(100);
    v
}

pub fn failed_job(id: &str, message: &str) -> Value {
    let mut v = job(id, "failed");
    v["error"] = json!({"code": "execution_error", "message": message});
    v
}

pub fn error_envelope(code: &str, message: &str) -> Value {
    json!({
        "protocol_version": "2024.1",
        "status": "error",
        "error": {"code": code, "message": message, "details": {}}
    })
}

pub fn execution_envelope(output: &str, exit_code: i32) -> Value {
    json!({
        "protocol_version": "2024.1",
        "type": "code_execution_result",
        "status": "success",
        "session_id": SESSION_ID,
        "output": {"execution_result": {
            "output": output,
            "exit_code": exit_code,
            "execution_time": 15,
            "memory_usage": 8
        }},
        "metadata": {}
    })
}

pub fn generation_envelope(text: &str) -> Value {
    json!({
        "protocol_version": "2024.1",
        "type": "text_generation_result",
        "status": "success",
        "output": {"text": text},
        "metadata": {
            "model": "deepseek-v3",
            "generation_time": 42,
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }
    })
}
