//! # deepexec-mcp
//!
//! DeepExec MCP 协议的 Rust 客户端：会话管理、作业生命周期、重试与轮询。
//!
//! Client runtime for the DeepExec MCP protocol: versioned JSON envelopes over
//! HTTP for remote code execution and text generation jobs.
//!
//! ## Overview
//!
//! Every call flows through the same pipeline:
//!
//! facade → session (created once) → envelope codec → retry engine →
//! transport → envelope codec → error classifier → job poller → typed result.
//!
//! The retry engine and the job poller are plain state machines. The
//! [`AsyncClient`] drives them with `tokio::time::sleep`, the
//! [`BlockingClient`] with `std::thread::sleep`; both behave identically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deepexec_mcp::{ClientBuilder, CodeExecutionRequest};
//!
//! #[tokio::main]
//! async fn main() -> deepexec_mcp::Result<()> {
//!     let mut client = ClientBuilder::new()
//!         .deepseek_key("ds-key")
//!         .e2b_key("e2b-key")
//!         .build()?;
//!
//!     let result = client
//!         .execute_code_and_wait(&CodeExecutionRequest::new("print(1)", "python"))
//!         .await?;
//!     println!("exit={} output={}", result.exit_code, result.output);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Envelope construction, response parsing, version and session id checks |
//! | [`client`] | Async and blocking facades, retry engine, job poller, error classification |
//! | [`transport`] | HTTP transports behind the "perform one request" capability traits |
//! | [`types`] | Requests, results, jobs |
//! | [`config`] | Layered configuration (args > env > file > defaults) |
//! | [`logging`] | Optional `tracing` subscriber setup |

pub mod client;
pub mod config;
pub mod error;
pub mod error_code;
pub mod logging;
pub mod protocol;
pub mod transport;
pub mod types;

pub use client::{AsyncClient, BlockingClient, ClientBuilder, JitterSource, RetryPolicy};
pub use config::{ClientConfig, SecurityOptions};
pub use error::{Error, ErrorKind};
pub use error_code::McpErrorCode;
pub use protocol::{SessionId, PROTOCOL_VERSION};
pub use types::{
    CodeExecutionRequest, ExecutionResult, GenerationResult, Job, JobStatus, JobType,
    StreamChunk, SubmitJobRequest, TextGenerationRequest, TokenUsage,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;
