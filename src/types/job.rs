//! Job model and state machine.

use crate::error::Details;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Job status as reported by the server.
///
/// `pending → running → {completed | failed | canceled | timeout}`; nothing
/// leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
    Timeout,
}

impl JobStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled | JobStatus::Timeout
        )
    }

    /// Whether a later snapshot with status `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => true,
            JobStatus::Running => next != JobStatus::Pending,
            _ => next == self,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "canceled" | "cancelled" => Ok(JobStatus::Canceled),
            "timeout" => Ok(JobStatus::Timeout),
            other => Err(Error::protocol(format!("unknown job status: {}", other))
                .with_detail("status", other)),
        }
    }
}

/// Kinds of work a job can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    CodeExecution,
    TextGeneration,
    TextGenerationStream,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::CodeExecution => "code_execution",
            JobType::TextGeneration => "text_generation",
            JobType::TextGenerationStream => "text_generation_stream",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "code_execution" => Ok(JobType::CodeExecution),
            "text_generation" => Ok(JobType::TextGeneration),
            "text_generation_stream" => Ok(JobType::TextGenerationStream),
            other => Err(Error::validation(
                "type",
                format!(
                    "Invalid job type: {}. Valid types: code_execution, text_generation, text_generation_stream",
                    other
                ),
            )),
        }
    }
}

/// Failure detail of a `failed` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_failure_message")]
    pub message: String,
    #[serde(default)]
    pub details: Details,
}

fn default_failure_message() -> String {
    "Unknown error".to_string()
}

/// Snapshot of a remote job.
///
/// `result` is only ever present on `completed` jobs and `error` only on
/// `failed` jobs; [`Job::from_wire`] drops whatever the server sent otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    /// Percentage in `0.0..=100.0`.
    pub progress: Option<f64>,
    pub created_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub canceled_at: Option<String>,
    /// Estimated seconds until completion, as reported on submission.
    pub estimated_time: Option<u64>,
    pub priority: Option<i64>,
    pub tags: Vec<String>,
    /// Job timeout budget in seconds.
    pub timeout: Option<u64>,
    result: Option<Value>,
    error: Option<JobFailure>,
}

#[derive(Deserialize)]
struct WireJob {
    #[serde(alias = "id")]
    job_id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    canceled_at: Option<String>,
    #[serde(default)]
    estimated_time: Option<u64>,
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Job {
    /// Build a job snapshot from a (passthrough) response body.
    pub fn from_wire(raw: &Value) -> Result<Self> {
        let wire: WireJob = serde_json::from_value(raw.clone())
            .map_err(|e| Error::protocol(format!("malformed job payload: {}", e)))?;

        let job_id = wire
            .job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::protocol("job payload is missing job_id"))?;
        let status: JobStatus = wire
            .status
            .as_deref()
            .ok_or_else(|| Error::protocol("job payload is missing status").with_detail("job_id", job_id.as_str()))?
            .parse()?;

        let result = match status {
            JobStatus::Completed => wire.result.filter(|v| !v.is_null()),
            _ => None,
        };
        let error = match status {
            JobStatus::Failed => Some(failure_from_value(wire.error)),
            _ => None,
        };

        Ok(Self {
            job_id,
            status,
            progress: wire.progress.map(|p| p.clamp(0.0, 100.0)),
            created_at: wire.created_at,
            started_at: wire.started_at,
            completed_at: wire.completed_at,
            canceled_at: wire.canceled_at,
            estimated_time: wire.estimated_time,
            priority: wire.priority,
            tags: wire.tags.unwrap_or_default(),
            timeout: wire.timeout,
            result,
            error,
        })
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Result payload; `Some` only when the job completed.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Failure detail; `Some` only when the job failed.
    pub fn error(&self) -> Option<&JobFailure> {
        self.error.as_ref()
    }
}

fn failure_from_value(raw: Option<Value>) -> JobFailure {
    match raw {
        Some(Value::String(message)) => JobFailure {
            code: None,
            message,
            details: Details::new(),
        },
        Some(v @ Value::Object(_)) => serde_json::from_value(v).unwrap_or_else(|_| JobFailure {
            code: None,
            message: default_failure_message(),
            details: Details::new(),
        }),
        _ => JobFailure {
            code: None,
            message: default_failure_message(),
            details: Details::new(),
        },
    }
}

/// Parameters for submitting a job.
#[derive(Debug, Clone)]
pub struct SubmitJobRequest {
    pub name: String,
    pub job_type: String,
    pub data: Map<String, Value>,
    /// Job timeout in seconds.
    pub timeout: Option<u64>,
    pub priority: i64,
    pub tags: Vec<String>,
}

impl SubmitJobRequest {
    pub fn new(name: impl Into<String>, job_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            job_type: job_type.into(),
            data,
            timeout: Some(60),
            priority: 0,
            tags: Vec::new(),
        }
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Checks name and type before anything goes on the wire.
    pub fn validate(&self) -> Result<JobType> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "Job name cannot be empty"));
        }
        self.job_type.parse()
    }

    /// Envelope metadata block for the submission.
    pub(crate) fn metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("name".into(), Value::from(self.name.clone()));
        meta.insert(
            "timeout".into(),
            self.timeout.map(Value::from).unwrap_or(Value::Null),
        );
        meta.insert("priority".into(), Value::from(self.priority));
        meta.insert("tags".into(), Value::from(self.tags.clone()));
        meta
    }
}
