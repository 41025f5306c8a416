//! 类型系统模块：作业、代码执行与文本生成的核心数据类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of everything that crosses the MCP wire
//! apart from the envelope itself.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Job`] | Snapshot of a remote job (status, progress, result or error) |
//! | [`JobStatus`] | Job state machine (`pending → running → terminal`) |
//! | [`SubmitJobRequest`] | Parameters for `POST /jobs` |
//! | [`ExecutionResult`] | Normalized code execution output |
//! | [`GenerationResult`] | Normalized text generation output |
//! | [`StreamChunk`] | One chunk of a streamed generation |
//!
//! ## Example
//!
//! ```rust
//! use deepexec_mcp::types::{CodeExecutionRequest, JobStatus};
//!
//! let req = CodeExecutionRequest::new("print(1)", "Python");
//! assert_eq!(req.normalized_language(), "python");
//! assert!(JobStatus::Completed.is_terminal());
//! ```

pub mod execution;
pub mod generation;
pub mod job;

pub use execution::{CodeExecutionRequest, ExecutionResult, SUPPORTED_LANGUAGES};
pub use generation::{GenerationResult, StreamChunk, TextGenerationRequest, TokenUsage};
pub use job::{Job, JobFailure, JobStatus, JobType, SubmitJobRequest};
