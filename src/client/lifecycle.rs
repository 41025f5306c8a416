//! 作业生命周期：轮询状态机与终态结果提取。
//!
//! Job lifecycle engine.
//!
//! [`PollLoop`] decides, from each status snapshot, whether to stop or how
//! long to sleep. It performs no I/O and never sleeps itself: the async
//! facade drives it with `tokio::time::sleep`, the blocking facade with
//! `std::thread::sleep`.

use crate::types::{ExecutionResult, GenerationResult, Job, JobStatus, JobType};
use crate::{Error, Result};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Next step of a wait loop after one status read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PollStep {
    /// Terminal snapshot reached.
    Finished(Job),
    /// Not terminal yet; read again after this delay.
    Sleep(Duration),
    /// The wait budget is spent.
    Expired,
}

/// Polling state machine for one job.
///
/// With a `max_wait`, at most `ceil(max_wait / interval) + 1` status reads are
/// allowed, whatever the wall clock says.
#[derive(Debug)]
pub(crate) struct PollLoop {
    job_id: String,
    interval: Duration,
    max_wait: Option<Duration>,
    max_cycles: Option<u64>,
    started: Instant,
    cycles: u64,
    last_status: Option<JobStatus>,
}

impl PollLoop {
    pub fn new(job_id: impl Into<String>, interval: Duration, max_wait: Option<Duration>) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            job_id: job_id.into(),
            interval,
            max_wait,
            max_cycles: max_wait.map(|w| cycle_bound(w, interval)),
            started: Instant::now(),
            cycles: 0,
            last_status: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Number of status reads observed so far.
    #[cfg(test)]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn observe(&mut self, job: Job) -> PollStep {
        self.cycles += 1;
        if let Some(prev) = self.last_status {
            if !prev.can_transition_to(job.status) {
                tracing::warn!(
                    job_id = %self.job_id,
                    from = %prev,
                    to = %job.status,
                    "job reported an illegal status transition"
                );
            }
        }
        self.last_status = Some(job.status);

        if job.is_terminal() {
            tracing::debug!(job_id = %self.job_id, status = %job.status, cycles = self.cycles, "job reached terminal state");
            return PollStep::Finished(job);
        }

        let Some(max_wait) = self.max_wait else {
            return PollStep::Sleep(self.interval);
        };
        let elapsed = self.started.elapsed();
        let out_of_cycles = self.max_cycles.map(|m| self.cycles >= m).unwrap_or(false);
        if elapsed >= max_wait || out_of_cycles {
            return PollStep::Expired;
        }
        PollStep::Sleep(self.interval.min(max_wait - elapsed))
    }

    pub fn timeout_error(&self) -> Error {
        let waited = self.max_wait.unwrap_or_else(|| self.started.elapsed());
        Error::timeout(format!(
            "Job {} did not complete within {:.1}s",
            self.job_id,
            waited.as_secs_f64()
        ))
        .with_detail("job_id", self.job_id.as_str())
        .with_detail("poll_cycles", self.cycles)
    }
}

fn cycle_bound(max_wait: Duration, interval: Duration) -> u64 {
    let ratio = max_wait.as_nanos().div_ceil(interval.as_nanos());
    u64::try_from(ratio).unwrap_or(u64::MAX).saturating_add(1)
}

/// Typed result of a completed job.
pub trait JobOutput: Sized {
    fn from_job_result(result: &Value) -> Self;
}

impl JobOutput for ExecutionResult {
    fn from_job_result(result: &Value) -> Self {
        ExecutionResult::from_job_result(result)
    }
}

impl JobOutput for GenerationResult {
    fn from_job_result(result: &Value) -> Self {
        GenerationResult::from_job_result(result)
    }
}

/// Turn a job snapshot into its typed result.
///
/// - `completed` → result (a missing payload is a protocol error)
/// - `failed` → execution error carrying the server's message
/// - `canceled` → execution error
/// - `timeout` → timeout error
/// - non-terminal → execution error "not complete"
pub(crate) fn settle<T: JobOutput>(job: &Job) -> Result<T> {
    match job.status {
        JobStatus::Completed => job
            .result()
            .map(T::from_job_result)
            .ok_or_else(|| {
                Error::protocol(format!("Completed job {} has no result", job.job_id))
                    .with_detail("job_id", job.job_id.as_str())
            }),
        JobStatus::Failed => Err(failure_error(job)),
        JobStatus::Canceled => Err(Error::execution(format!("Job {} was canceled", job.job_id))
            .with_detail("job_id", job.job_id.as_str())
            .with_detail("status", job.status.as_str())),
        JobStatus::Timeout => Err(Error::timeout(format!(
            "Job {} timed out on the server",
            job.job_id
        ))
        .with_detail("job_id", job.job_id.as_str())),
        JobStatus::Pending | JobStatus::Running => Err(Error::execution(format!(
            "Job {} is not complete (status: {})",
            job.job_id, job.status
        ))
        .with_detail("job_id", job.job_id.as_str())
        .with_detail("status", job.status.as_str())),
    }
}

fn failure_error(job: &Job) -> Error {
    let Some(failure) = job.error() else {
        return Error::execution(format!("Job {} failed", job.job_id))
            .with_detail("job_id", job.job_id.as_str());
    };
    let exit_code = failure
        .details
        .get("exit_code")
        .and_then(Value::as_i64)
        .and_then(|c| i32::try_from(c).ok());
    let output = failure
        .details
        .get("output")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut err = Error::execution(failure.message.clone())
        .with_execution_context(exit_code, output)
        .with_detail("job_id", job.job_id.as_str());
    if let Some(code) = &failure.code {
        err = err.with_detail("error_code", code.as_str());
    }
    for (k, v) in &failure.details {
        err = err.with_detail(k.as_str(), v.clone());
    }
    err
}

/// Job name used by the job helpers: `{type}_{qualifier}_{unix_seconds}`.
pub(crate) fn job_name(job_type: JobType, qualifier: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}_{}_{}", job_type.as_str(), qualifier, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(status: &str) -> Job {
        Job::from_wire(&json!({"job_id": "job-1", "status": status})).unwrap()
    }

    #[test]
    fn terminal_snapshot_finishes_immediately() {
        let mut poll = PollLoop::new("job-1", Duration::from_millis(10), None);
        assert!(matches!(poll.observe(job("failed")), PollStep::Finished(_)));
        assert_eq!(poll.cycles(), 1);
    }

    #[test]
    fn unbounded_wait_sleeps_interval() {
        let mut poll = PollLoop::new("job-1", Duration::from_millis(25), None);
        for _ in 0..100 {
            assert_eq!(poll.observe(job("running")), PollStep::Sleep(Duration::from_millis(25)));
        }
    }

    #[test]
    fn bounded_wait_caps_cycles() {
        // ceil(100 / 30) + 1 = 5 reads at most.
        let mut poll = PollLoop::new(
            "job-1",
            Duration::from_millis(30),
            Some(Duration::from_millis(100)),
        );
        let mut reads = 0;
        loop {
            reads += 1;
            match poll.observe(job("pending")) {
                PollStep::Sleep(d) => assert!(d <= Duration::from_millis(30)),
                PollStep::Expired => break,
                PollStep::Finished(_) => unreachable!(),
            }
        }
        assert!(reads <= 5);
        let err = poll.timeout_error();
        assert_eq!(err.kind(), crate::ErrorKind::Timeout);
        assert_eq!(err.details()["job_id"], "job-1");
    }

    #[test]
    fn zero_max_wait_expires_on_first_non_terminal_read() {
        let mut poll = PollLoop::new("job-1", Duration::from_millis(10), Some(Duration::ZERO));
        assert_eq!(poll.observe(job("running")), PollStep::Expired);
    }

    #[test]
    fn cycle_bound_math() {
        assert_eq!(cycle_bound(Duration::from_secs(30), Duration::from_millis(500)), 61);
        assert_eq!(cycle_bound(Duration::from_millis(100), Duration::from_millis(30)), 5);
        assert_eq!(cycle_bound(Duration::ZERO, Duration::from_millis(30)), 1);
    }

    #[test]
    fn settle_completed_and_failed() {
        let done = Job::from_wire(&json!({
            "job_id": "j", "status": "completed",
            "result": {"output": "1\n", "exit_code": 0}
        }))
        .unwrap();
        let r: ExecutionResult = settle(&done).unwrap();
        assert_eq!(r.exit_code, 0);

        let failed = Job::from_wire(&json!({
            "job_id": "j", "status": "failed",
            "error": {"code": "execution_error", "message": "boom", "details": {"exit_code": 2}}
        }))
        .unwrap();
        let err = settle::<ExecutionResult>(&failed).unwrap_err();
        match err {
            Error::Execution { message, exit_code, details, .. } => {
                assert_eq!(message, "boom");
                assert_eq!(exit_code, Some(2));
                assert_eq!(details["error_code"], "execution_error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn failure_with_oversized_exit_code_drops_it() {
        let failed = Job::from_wire(&json!({
            "job_id": "j", "status": "failed",
            "error": {"message": "boom", "details": {"exit_code": 4_294_967_298i64}}
        }))
        .unwrap();
        match settle::<ExecutionResult>(&failed).unwrap_err() {
            Error::Execution { exit_code, details, .. } => {
                assert_eq!(exit_code, None);
                assert_eq!(details["exit_code"], 4_294_967_298i64);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn settle_other_terminal_states() {
        assert_eq!(
            settle::<GenerationResult>(&job("canceled")).unwrap_err().kind(),
            crate::ErrorKind::Execution
        );
        assert_eq!(
            settle::<GenerationResult>(&job("timeout")).unwrap_err().kind(),
            crate::ErrorKind::Timeout
        );
        let err = settle::<GenerationResult>(&job("running")).unwrap_err();
        assert!(err.message().contains("not complete"));
        let err = settle::<GenerationResult>(&job("completed")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Protocol);
    }

    #[test]
    fn job_names() {
        let name = job_name(JobType::CodeExecution, "python");
        assert!(name.starts_with("code_execution_python_"));
        assert!(name.rsplit('_').next().unwrap().parse::<u64>().is_ok());
    }
}
