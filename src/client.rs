//! MCP client facades and the shared request/poll engine.
//!
//! Both facades are thin drivers over the same pieces: [`policy`] decides
//! retries, [`lifecycle`] decides polling, [`execution`] interprets
//! responses. [`AsyncClient`] sleeps with tokio, [`BlockingClient`] with the
//! calling thread. Implementation details are split into submodules under
//! `src/client/`.

pub mod blocking;
pub mod builder;
pub mod core;
pub mod endpoint;
pub mod error_classification;
mod execution;
pub mod lifecycle;
pub mod policy;
mod session;
pub mod stream;

pub use blocking::BlockingClient;
pub use builder::ClientBuilder;
pub use self::core::AsyncClient;
pub use endpoint::Endpoint;
pub use lifecycle::JobOutput;
pub use policy::{JitterSource, RetryPolicy};
