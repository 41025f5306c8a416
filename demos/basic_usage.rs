//! Basic usage example
//!
//! Runs a snippet of Python through the job API, then asks for a short
//! text generation.
//!
//! API keys are read from the environment:
//! - DEEPEXEC_DEEPSEEK_KEY
//! - DEEPEXEC_E2B_KEY
//!
//! Usage:
//!   DEEPEXEC_DEEPSEEK_KEY=... DEEPEXEC_E2B_KEY=... cargo run --example basic_usage

use deepexec_mcp::logging::init_tracing;
use deepexec_mcp::{ClientBuilder, CodeExecutionRequest, TextGenerationRequest};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,deepexec_mcp=debug")?;

    let mut client = ClientBuilder::new().user_id("demo").build()?;
    if !client.config().has_credentials() {
        eprintln!("Warning: DEEPEXEC_DEEPSEEK_KEY and DEEPEXEC_E2B_KEY must both be set.");
    }

    let request = CodeExecutionRequest::new("import math\nprint(math.factorial(10))", "python")
        .timeout(Duration::from_secs(20));
    let job = client.execute_code_job(&request).await?;
    println!("submitted job {} ({})", job.job_id, job.status);

    let done = client
        .wait_for_completion(&job.job_id, Duration::from_secs(1), Some(request.timeout))
        .await?;
    let result = client.get_code_execution_result(&done.job_id).await?;
    println!("exit={} output:\n{}", result.exit_code, result.output);

    let reply = client
        .generate_text(&TextGenerationRequest::new("Explain factorials in one sentence.").max_tokens(80))
        .await?;
    println!("\n{} ({} tokens)", reply.text, reply.usage.total_tokens);

    client.close();
    Ok(())
}
