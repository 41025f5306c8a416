use crate::client::endpoint::{self, check_job_id};
use crate::client::execution::{
    decode_cancel_ack, decode_execution, decode_generation, decode_job,
};
use crate::client::lifecycle::{job_name, settle, JobOutput, PollLoop, PollStep};
use crate::client::policy::{RetryLoop, RetryPolicy};
use crate::client::session::{self, decode_session};
use crate::client::stream::decode_chunks;
use crate::config::ClientConfig;
use crate::protocol::SessionId;
use crate::transport::{Call, HttpTransport, Transport, WireResponse};
use crate::types::{
    CodeExecutionRequest, ExecutionResult, GenerationResult, Job, JobType, StreamChunk,
    SubmitJobRequest, TextGenerationRequest,
};
use crate::{BoxStream, ErrorKind, Result};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Non-blocking MCP client.
///
/// Many operations may be in flight at once on one client; they share a
/// single session, created once and read-only afterwards. The transport is
/// owned exclusively by this client and released by [`AsyncClient::close`].
pub struct AsyncClient<T = HttpTransport> {
    config: ClientConfig,
    retry: RetryPolicy,
    transport: Option<T>,
    session: OnceCell<SessionId>,
}

impl AsyncClient<HttpTransport> {
    /// Open a client over HTTP. No network traffic happens until the first operation.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> AsyncClient<T> {
    /// Open a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            config,
            retry,
            transport: Some(transport),
            session: OnceCell::new(),
        }
    }

    /// Replace the retry policy (e.g. to pin the jitter source).
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

    /// One retried request. `decode` runs inside the loop so its verdict drives retries.
    async fn send<R>(&self, call: &Call, decode: fn(WireResponse) -> Result<R>) -> Result<R> {
        let transport = self.transport()?;
        let mut retry = RetryLoop::new(&self.retry, call.operation);
        while let Some(attempt) = retry.next_attempt() {
            debug!(operation = call.operation, path = %call.path, attempt, "request attempt");
            match transport.post(call).await.and_then(decode) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if let Some(delay) = retry.record_failure(e) {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(retry.into_error())
    }

    async fn handshake(&self, user_id: &str) -> Result<SessionId> {
        session::require_credentials(&self.config)?;
        self.transport()?;
        let call = endpoint::create_session(user_id, self.config.timeout);
        let id = self.send(&call, decode_session).await?;
        info!(session_id = %id, "session created");
        Ok(id)
    }

    /// Create the session explicitly. Fails if one is already active.
    pub async fn create_session(&self, user_id: &str) -> Result<SessionId> {
        if let Some(active) = self.session.get() {
            return Err(session::already_active(active));
        }
        let id = self.handshake(user_id).await?;
        match self.session.set(id.clone()) {
            Ok(()) => Ok(id),
            Err(_) => Err(self
                .session
                .get()
                .map(session::already_active)
                .unwrap_or_else(session::no_session)),
        }
    }

    /// Active session or fail fast.
    fn active_session(&self) -> Result<&SessionId> {
        self.transport()?;
        self.session.get().ok_or_else(session::no_session)
    }

    /// Active session, created on first use with the configured user id.
    async fn ensure_session(&self) -> Result<&SessionId> {
        self.transport()?;
        self.session
            .get_or_try_init(|| self.handshake(&self.config.user_id))
            .await
    }

    // ---- job API (requires an active session) ----

    pub async fn submit_job(&self, request: SubmitJobRequest) -> Result<Job> {
        let job_type = request.validate()?;
        let session = self.active_session()?;
        let call = endpoint::submit_job(session, job_type, &request, self.config.timeout);
        let job = self.send(&call, decode_job).await?;
        info!(job_id = %job.job_id, job_type = job_type.as_str(), name = %request.name, "job submitted");
        Ok(job)
    }

    pub async fn get_job_status(&self, job_id: &str) -> Result<Job> {
        check_job_id(job_id)?;
        let session = self.active_session()?;
        let call = endpoint::job_status(session, job_id, self.config.timeout);
        self.send(&call, decode_job).await
    }

    /// Cancel a job. Canceling a terminal job surfaces the server's rejection as an error.
    pub async fn cancel_job(&self, job_id: &str, reason: Option<&str>) -> Result<Job> {
        check_job_id(job_id)?;
        let session = self.active_session()?;
        let call = endpoint::job_cancel(session, job_id, reason, self.config.timeout);
        let job = self.send(&call, decode_job).await?;
        info!(job_id, status = %job.status, "job cancel requested");
        Ok(job)
    }

    /// Poll until the job is terminal. With `max_wait`, fails with a timeout
    /// error once the budget is spent.
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> Result<Job> {
        let mut poll = PollLoop::new(job_id, poll_interval, max_wait);
        loop {
            let job = self.get_job_status(poll.job_id()).await?;
            match poll.observe(job) {
                PollStep::Finished(job) => return Ok(job),
                PollStep::Sleep(delay) => tokio::time::sleep(delay).await,
                PollStep::Expired => return Err(poll.timeout_error()),
            }
        }
    }

    // ---- job helpers (create the session lazily) ----

    pub async fn execute_code_job(&self, request: &CodeExecutionRequest) -> Result<Job> {
        request.validate(&self.config.security)?;
        self.ensure_session().await?;
        self.submit_job(code_job(request)).await
    }

    pub async fn generate_text_job(&self, request: &TextGenerationRequest) -> Result<Job> {
        request.validate()?;
        self.ensure_session().await?;
        self.submit_job(generation_job(request)).await
    }

    /// One status read; the job must already be completed.
    pub async fn get_code_execution_result(&self, job_id: &str) -> Result<ExecutionResult> {
        self.ensure_session().await?;
        settle(&self.get_job_status(job_id).await?)
    }

    /// One status read; the job must already be completed.
    pub async fn get_text_generation_result(&self, job_id: &str) -> Result<GenerationResult> {
        self.ensure_session().await?;
        settle(&self.get_job_status(job_id).await?)
    }

    pub async fn execute_code_and_wait(
        &self,
        request: &CodeExecutionRequest,
    ) -> Result<ExecutionResult> {
        let job = self.execute_code_job(request).await?;
        self.wait_for_output(&job, request.timeout).await
    }

    pub async fn generate_text_and_wait(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<GenerationResult> {
        let job = self.generate_text_job(request).await?;
        self.wait_for_output(&job, request.timeout).await
    }

    /// Bounded wait on a submitted job. A client-side timeout triggers a
    /// best-effort cancel whose failure is only logged.
    async fn wait_for_output<O: JobOutput>(&self, job: &Job, max_wait: Duration) -> Result<O> {
        match self
            .wait_for_completion(&job.job_id, self.config.poll_interval, Some(max_wait))
            .await
        {
            Ok(done) => settle::<O>(&done),
            Err(e) if e.kind() == ErrorKind::Timeout => {
                if let Err(cancel_err) = self.cancel_job(&job.job_id, Some("Client timeout")).await {
                    debug!(job_id = %job.job_id, error = %cancel_err, "best-effort cancel failed");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    // ---- direct operations (create the session lazily) ----

    /// Run code synchronously on the server. A timeout triggers a best-effort
    /// `cancel_execution` before the timeout error is returned.
    pub async fn execute_code(&self, request: &CodeExecutionRequest) -> Result<ExecutionResult> {
        request.validate(&self.config.security)?;
        let session = self.ensure_session().await?;
        let call = endpoint::execute(session, request);
        match self.send(&call, decode_execution).await {
            Err(e) if e.kind() == ErrorKind::Timeout => {
                if let Err(cancel_err) = self.cancel_execution().await {
                    debug!(error = %cancel_err, "best-effort cancel_execution failed");
                }
                Err(e)
            }
            other => other,
        }
    }

    pub async fn generate_text(&self, request: &TextGenerationRequest) -> Result<GenerationResult> {
        request.validate()?;
        let session = self.ensure_session().await?;
        let call = endpoint::generate(session, request);
        self.send(&call, decode_generation).await
    }

    pub async fn cancel_execution(&self) -> Result<()> {
        let session = self.ensure_session().await?;
        let call = endpoint::cancel_execution(session, self.config.timeout);
        self.send(&call, decode_cancel_ack).await
    }

    /// Stream generated text. The stream ends after the chunk with `done = true`.
    ///
    /// Opening the stream is retried like any other request; dropping the
    /// stream sends no cancel.
    pub async fn stream_generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<BoxStream<'static, StreamChunk>> {
        request.validate()?;
        let session = self.ensure_session().await?;
        let call = endpoint::generate_stream(session, request);
        let transport = self.transport()?;

        let mut retry = RetryLoop::new(&self.retry, call.operation);
        while let Some(attempt) = retry.next_attempt() {
            debug!(operation = call.operation, attempt, "opening stream");
            match transport.open_stream(&call).await {
                Ok(bytes) => return Ok(decode_chunks(bytes)),
                Err(e) => {
                    if let Some(delay) = retry.record_failure(e) {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(retry.into_error())
    }
}

pub(crate) fn code_job(request: &CodeExecutionRequest) -> SubmitJobRequest {
    let language = request.normalized_language();
    SubmitJobRequest::new(
        job_name(JobType::CodeExecution, &language),
        JobType::CodeExecution.as_str(),
        request.job_data(),
    )
    .timeout(request.timeout.as_secs().max(1))
}

pub(crate) fn generation_job(request: &TextGenerationRequest) -> SubmitJobRequest {
    SubmitJobRequest::new(
        job_name(JobType::TextGeneration, &request.model),
        JobType::TextGeneration.as_str(),
        request.job_data(),
    )
    .timeout(request.timeout.as_secs().max(1))
}
