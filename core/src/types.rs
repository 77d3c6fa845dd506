//! Domain types for Scrapyd requests and responses.
//!
//! # Design
//! Responses keep the fields this crate names as typed members and collect
//! everything else into a `serde_json::Map`, so fields newer services add are
//! still available to callers.

use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a job as reported by `listjobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Finished,
}

impl JobState {
    /// Every state, in the order job lookups scan them.
    pub const ALL: [JobState; 3] = [JobState::Pending, JobState::Running, JobState::Finished];

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Finished => "finished",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "finished" => Ok(JobState::Finished),
            other => Err(format!("unknown job state `{other}`")),
        }
    }
}

/// One job record from `listjobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Jobs of a project grouped by state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub pending: Vec<Job>,
    #[serde(default)]
    pub running: Vec<Job>,
    #[serde(default)]
    pub finished: Vec<Job>,
    /// Remaining envelope fields, such as `node_name`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobList {
    pub fn jobs(&self, state: JobState) -> &[Job] {
        match state {
            JobState::Pending => &self.pending,
            JobState::Running => &self.running,
            JobState::Finished => &self.finished,
        }
    }

    /// State whose list holds `job_id`. States are scanned in
    /// [`JobState::ALL`] order and the first match wins.
    pub fn state_of(&self, job_id: &str) -> Option<JobState> {
        JobState::ALL
            .into_iter()
            .find(|state| self.jobs(*state).iter().any(|job| job.id == job_id))
    }
}

/// The `spiders` field of an `addversion` reply.
///
/// Scrapyd reports how many spiders the uploaded version contains; some
/// deployments report their names instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadedSpiders {
    Count(u64),
    Names(Vec<String>),
}

impl UploadedSpiders {
    pub fn count(&self) -> u64 {
        match self {
            UploadedSpiders::Count(count) => *count,
            UploadedSpiders::Names(names) => names.len() as u64,
        }
    }
}

/// Optional parts of a `schedule` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub(crate) settings: Vec<(String, String)>,
    pub(crate) fields: Vec<(String, String)>,
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scrapy setting override, sent as `setting=NAME=VALUE`.
    pub fn setting(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.settings.push((name.into(), value.to_string()));
        self
    }

    /// Extra request field passed through verbatim (spider arguments,
    /// `jobid`, `priority`, ...).
    pub fn field(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((name.into(), value.to_string()));
        self
    }
}

/// A packaged project version uploaded by `add_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Egg {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Egg {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::named("egg", bytes)
    }

    pub fn named(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an egg from disk, keeping its file name for the upload.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "egg".to_string());
        Ok(Self { file_name, bytes })
    }
}
