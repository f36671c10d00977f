use std::fmt;

use serde::Deserialize;

/// Reported status of a workflow run.
///
/// The closed set the API documents. Only `queued`, `in_progress` and
/// `completed` are actionable; the remaining variants are recognized so they
/// can be surfaced verbatim when the resolver rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Requested,
    Waiting,
    Pending,
    Completed,
}

impl RunStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            "in_progress" => Some(Self::InProgress),
            "requested" => Some(Self::Requested),
            "waiting" => Some(Self::Waiting),
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Requested => "requested",
            Self::Waiting => "waiting",
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Reported conclusion of a workflow run. Only meaningful once the status is
/// `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    Stale,
    StartupFailure,
    ActionRequired,
}

impl RunConclusion {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "neutral" => Some(Self::Neutral),
            "cancelled" => Some(Self::Cancelled),
            "skipped" => Some(Self::Skipped),
            "timed_out" => Some(Self::TimedOut),
            "stale" => Some(Self::Stale),
            "startup_failure" => Some(Self::StartupFailure),
            "action_required" => Some(Self::ActionRequired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::Stale => "stale",
            Self::StartupFailure => "startup_failure",
            Self::ActionRequired => "action_required",
        }
    }
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Expected non-success outcomes of the wait.
///
/// These are ordinary values, not errors in the `anyhow` sense; transport
/// contract violations propagate separately as hard errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A deadline elapsed, or the run concluded `timed_out`.
    Timeout,
    /// The run has not finished yet; keep waiting.
    Pending(RunStatus),
    /// The run finished with a non-success conclusion.
    Inconclusive(RunConclusion),
    /// The API returned a value this crate does not recognize. Carries the
    /// offending raw value; retrying cannot help.
    Unsupported(String),
}

pub type RunResult<T> = Result<T, Failure>;

/// Terminal observation of a run: status is always `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedRun {
    pub status: RunStatus,
    pub conclusion: RunConclusion,
}

/// Wire model for the get-workflow-run endpoint. Status and conclusion stay
/// raw strings so unrecognized values survive to the resolver.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunState {
    pub status: Option<String>,
    pub conclusion: Option<String>,
}

/// Wire model for one job in the list-jobs endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunJob {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    #[serde(rename = "html_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub steps: Vec<WorkflowRunJobStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunJobStep {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsResponse {
    pub jobs: Vec<WorkflowRunJob>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_values() {
        let cases: &[(&str, Option<RunStatus>)] = &[
            ("queued", Some(RunStatus::Queued)),
            ("in_progress", Some(RunStatus::InProgress)),
            ("completed", Some(RunStatus::Completed)),
            ("waiting", Some(RunStatus::Waiting)),
            ("finished", None),
            ("", None),
        ];
        for &(value, expected) in cases {
            assert_eq!(RunStatus::parse(value), expected);
        }
        assert_eq!(RunConclusion::parse("timed_out"), Some(RunConclusion::TimedOut));
        assert_eq!(RunConclusion::parse("startup_failure"), Some(RunConclusion::StartupFailure));
        assert_eq!(RunConclusion::parse("mystery"), None);
    }
}
