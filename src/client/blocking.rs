//! 阻塞客户端：与异步客户端共享重试与轮询状态机。
//!
//! Blocking MCP client.
//!
//! Same operations and observable behavior as [`crate::AsyncClient`] minus
//! streaming. Retries and polling suspend the calling thread with
//! `std::thread::sleep`. Do not use it from inside an async runtime.

use crate::client::core::{code_job, generation_job};
use crate::client::endpoint::{self, check_job_id};
use crate::client::execution::{
    decode_cancel_ack, decode_execution, decode_generation, decode_job,
};
use crate::client::lifecycle::{settle, JobOutput, PollLoop, PollStep};
use crate::client::policy::{RetryLoop, RetryPolicy};
use crate::client::session::{self, decode_session};
use crate::config::ClientConfig;
use crate::protocol::SessionId;
use crate::transport::{BlockingHttpTransport, BlockingTransport, Call, WireResponse};
use crate::types::{
    CodeExecutionRequest, ExecutionResult, GenerationResult, Job, SubmitJobRequest,
    TextGenerationRequest,
};
use crate::{ErrorKind, Result};
use once_cell::sync::OnceCell;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Blocking MCP client with one thread of control.
pub struct BlockingClient<T = BlockingHttpTransport> {
    config: ClientConfig,
    retry: RetryPolicy,
    transport: Option<T>,
    session: OnceCell<SessionId>,
}

impl BlockingClient<BlockingHttpTransport> {
    /// Open a client over HTTP. No network traffic happens until the first operation.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = BlockingHttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: BlockingTransport> BlockingClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            config,
            retry,
            transport: Some(transport),
            session: OnceCell::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.get()
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Release the transport and forget the session. Idempotent.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            info!(session_id = ?self.session.get().map(SessionId::as_str), "client closed");
        }
        self.session = OnceCell::new();
    }

    fn transport(&self) -> Result<&T> {
        self.transport.as_ref().ok_or_else(session::closed)
    }

    fn send<R>(&self, call: &Call, decode: fn(WireResponse) -> Result<R>) -> Result<R> {
        let transport = self.transport()?;
        let mut retry = RetryLoop::new(&self.retry, call.operation);
        while let Some(attempt) = retry.next_attempt() {
            debug!(operation = call.operation, path = %call.path, attempt, "request attempt");
            match transport.post(call).and_then(decode) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if let Some(delay) = retry.record_failure(e) {
                        thread::sleep(delay);
                    }
                }
            }
        }
        Err(retry.into_error())
    }

    fn handshake(&self, user_id: &str) -> Result<SessionId> {
        session::require_credentials(&self.config)?;
        self.transport()?;
        let call = endpoint::create_session(user_id, self.config.timeout);
        let id = self.send(&call, decode_session)?;
        info!(session_id = %id, "session created");
        Ok(id)
    }

    pub fn create_session(&self, user_id: &str) -> Result<SessionId> {
        if let Some(active) = self.session.get() {
            return Err(session::already_active(active));
        }
        let id = self.handshake(user_id)?;
        match self.session.set(id.clone()) {
            Ok(()) => Ok(id),
            Err(_) => Err(self
                .session
                .get()
                .map(session::already_active)
                .unwrap_or_else(session::no_session)),
        }
    }

    fn active_session(&self) -> Result<&SessionId> {
        self.transport()?;
        self.session.get().ok_or_else(session::no_session)
    }

    fn ensure_session(&self) -> Result<&SessionId> {
        self.transport()?;
        self.session
            .get_or_try_init(|| self.handshake(&self.config.user_id))
    }

    pub fn submit_job(&self, request: SubmitJobRequest) -> Result<Job> {
        let job_type = request.validate()?;
        let session = self.active_session()?;
        let call = endpoint::submit_job(session, job_type, &request, self.config.timeout);
        let job = self.send(&call, decode_job)?;
        info!(job_id = %job.job_id, job_type = job_type.as_str(), name = %request.name, "job submitted");
        Ok(job)
    }

    pub fn get_job_status(&self, job_id: &str) -> Result<Job> {
        check_job_id(job_id)?;
        let session = self.active_session()?;
        let call = endpoint::job_status(session, job_id, self.config.timeout);
        self.send(&call, decode_job)
    }

    pub fn cancel_job(&self, job_id: &str, reason: Option<&str>) -> Result<Job> {
        check_job_id(job_id)?;
        let session = self.active_session()?;
        let call = endpoint::job_cancel(session, job_id, reason, self.config.timeout);
        let job = self.send(&call, decode_job)?;
        info!(job_id, status = %job.status, "job cancel requested");
        Ok(job)
    }

    pub fn wait_for_completion(
        &self,
        job_id: &str,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> Result<Job> {
        let mut poll = PollLoop::new(job_id, poll_interval, max_wait);
        loop {
            let job = self.get_job_status(poll.job_id())?;
            match poll.observe(job) {
                PollStep::Finished(job) => return Ok(job),
                PollStep::Sleep(delay) => thread::sleep(delay),
                PollStep::Expired => return Err(poll.timeout_error()),
            }
        }
    }

    pub fn execute_code_job(&self, request: &CodeExecutionRequest) -> Result<Job> {
        request.validate(&self.config.security)?;
        self.ensure_session()?;
        self.submit_job(code_job(request))
    }

    pub fn generate_text_job(&self, request: &TextGenerationRequest) -> Result<Job> {
        request.validate()?;
        self.ensure_session()?;
        self.submit_job(generation_job(request))
    }

    pub fn get_code_execution_result(&self, job_id: &str) -> Result<ExecutionResult> {
        self.ensure_session()?;
        settle(&self.get_job_status(job_id)?)
    }

    pub fn get_text_generation_result(&self, job_id: &str) -> Result<GenerationResult> {
        self.ensure_session()?;
        settle(&self.get_job_status(job_id)?)
    }

    pub fn execute_code_and_wait(&self, request: &CodeExecutionRequest) -> Result<ExecutionResult> {
        let job = self.execute_code_job(request)?;
        self.wait_for_output(&job, request.timeout)
    }

    pub fn generate_text_and_wait(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<GenerationResult> {
        let job = self.generate_text_job(request)?;
        self.wait_for_output(&job, request.timeout)
    }

    fn wait_for_output<O: JobOutput>(&self, job: &Job, max_wait: Duration) -> Result<O> {
        match self.wait_for_completion(&job.job_id, self.config.poll_interval, Some(max_wait)) {
            Ok(done) => settle::<O>(&done),
            Err(e) if e.kind() == ErrorKind::Timeout => {
                if let Err(cancel_err) = self.cancel_job(&job.job_id, Some("Client timeout")) {
                    debug!(job_id = %job.job_id, error = %cancel_err, "best-effort cancel failed");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn execute_code(&self, request: &CodeExecutionRequest) -> Result<ExecutionResult> {
        request.validate(&self.config.security)?;
        let session = self.ensure_session()?;
        let call = endpoint::execute(session, request);
        match self.send(&call, decode_execution) {
            Err(e) if e.kind() == ErrorKind::Timeout => {
                if let Err(cancel_err) = self.cancel_execution() {
                    debug!(error = %cancel_err, "best-effort cancel_execution failed");
                }
                Err(e)
            }
            other => other,
        }
    }

    pub fn generate_text(&self, request: &TextGenerationRequest) -> Result<GenerationResult> {
        request.validate()?;
        let session = self.ensure_session()?;
        let call = endpoint::generate(session, request);
        self.send(&call, decode_generation)
    }

    pub fn cancel_execution(&self) -> Result<()> {
        let session = self.ensure_session()?;
        let call = endpoint::cancel_execution(session, self.config.timeout);
        self.send(&call, decode_cancel_ack)
    }
}
