//! Streaming text generation example.
//!
//! Prints chunks as they arrive and stops after the final chunk.
//!
//! Run:
//!   DEEPEXEC_DEEPSEEK_KEY=... DEEPEXEC_E2B_KEY=... cargo run --example streaming_generation

use deepexec_mcp::logging::init_tracing;
use deepexec_mcp::{ClientBuilder, TextGenerationRequest};
use futures::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("warn")?;

    let client = ClientBuilder::new().build()?;
    if !client.config().has_credentials() {
        eprintln!("Error: DEEPEXEC_DEEPSEEK_KEY and DEEPEXEC_E2B_KEY must both be set.");
        std::process::exit(1);
    }

    let request = TextGenerationRequest::new("Write a haiku about retry loops.").temperature(0.9);
    let mut stream = client.stream_generate_text(&request).await?;

    let mut out = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        write!(out, "{}", chunk.text)?;
        out.flush()?;
        if chunk.done {
            break;
        }
    }
    println!();
    Ok(())
}
