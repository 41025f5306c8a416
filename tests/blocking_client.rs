//! `BlockingClient` over real HTTP against a mock server.

use deepexec_mcp::{
    BlockingClient, ClientBuilder, CodeExecutionRequest, ErrorKind, JitterSource,
    TextGenerationRequest,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;

const SESSION_ID: &str = "sess_blocking_01";

fn client_for(server: &ServerGuard) -> BlockingClient {
    ClientBuilder::new()
        .without_env()
        .endpoint(format!("{}/v1", server.url()))
        .deepseek_key("ds-key")
        .e2b_key("e2b-key")
        .user_id("carol")
        .retry_delay(Duration::ZERO)
        .poll_interval(Duration::from_millis(5))
        .jitter(JitterSource::Fixed(0.0))
        .build_blocking()
        .unwrap()
}

fn mock_session(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/v1/sessions")
        .match_header("x-deepseek-key", "ds-key")
        .match_body(Matcher::PartialJson(json!({"input": {"user_id": "carol"}})))
        .with_status(200)
        .with_body(
            json!({
                "protocol_version": "2024.1",
                "type": "session_created",
                "status": "success",
                "session_id": SESSION_ID
            })
            .to_string(),
        )
        .expect(1)
        .create()
}

#[test]
fn execute_code_and_wait_with_completed_job() {
    let mut server = Server::new();
    let session = mock_session(&mut server);
    server
        .mock("POST", "/v1/jobs")
        .with_status(200)
        .with_body(
            json!({"protocol_version": "2024.1", "job_id": "job-b1", "status": "running"})
                .to_string(),
        )
        .create();
    server
        .mock("POST", "/v1/jobs/job-b1/status")
        .with_status(200)
        .with_body(
            json!({
                "protocol_version": "2024.1",
                "job_id": "job-b1",
                "status": "completed",
                "result": {"output": "42\n", "exit_code": 0}
            })
            .to_string(),
        )
        .create();

    let client = client_for(&server);
    let result = client
        .execute_code_and_wait(&CodeExecutionRequest::new("print(42)", "python"))
        .unwrap();

    assert_eq!(result.output, "42\n");
    assert!(result.succeeded());
    session.assert();
}

#[test]
fn generate_text_reads_usage() {
    let mut server = Server::new();
    mock_session(&mut server);
    let generate = server
        .mock("POST", "/v1/generate")
        .match_body(Matcher::PartialJson(json!({
            "type": "text_generation",
            "input": {"prompt": "Say hi"}
        })))
        .with_status(200)
        .with_body(
            json!({
                "protocol_version": "2024.1",
                "type": "text_generation_result",
                "status": "success",
                "output": {"text": "hi"},
                "metadata": {
                    "model": "deepseek-v3",
                    "generation_time": 30,
                    "usage": {"prompt_tokens": 2, "completion_tokens": 1, "total_tokens": 3}
                }
            })
            .to_string(),
        )
        .create();

    let client = client_for(&server);
    let result = client
        .generate_text(&TextGenerationRequest::new("Say hi"))
        .unwrap();
    assert_eq!(result.text, "hi");
    assert_eq!(result.model, "deepseek-v3");
    assert_eq!(result.usage.total_tokens, 3);
    generate.assert();
}

#[test]
fn server_errors_are_retried_then_reported() {
    let mut server = Server::new();
    mock_session(&mut server);
    let execute = server
        .mock("POST", "/v1/execute")
        .with_status(502)
        .with_body("bad gateway")
        .expect(4)
        .create();

    let client = client_for(&server);
    let err = client
        .execute_code(&CodeExecutionRequest::new("print(1)", "python"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.message(), "Server error: bad gateway");
    execute.assert();
}

#[test]
fn close_is_idempotent() {
    let server = Server::new();
    let mut client = client_for(&server);
    client.close();
    client.close();
    assert!(client.is_closed());

    let err = client.create_session("carol").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}
