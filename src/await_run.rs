use anyhow::Result;
use tokio::time::{Duration, Instant, sleep};

use crate::{
    models::{
        CompletedRun, Failure, RunConclusion, RunResult, RunStatus, WorkflowRunJob,
        WorkflowRunState,
    },
    retry::retry_on_error,
};

/// Budget for a single state fetch inside the poll loop. Nested inside the
/// overall run deadline; absorbs one-off transient failures of a single call.
const STATE_FETCH_TIMEOUT: Duration = Duration::from_millis(400);

/// Interval between job-list polls while looking for an active job.
const ACTIVE_JOB_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Sentinel reported when a job exists but the API supplied no URL for it.
pub const NO_JOB_URL: &str = "URL unavailable";

/// Data the poll loop needs from the API. Implemented by [`crate::github::GitHub`]
/// and by scripted mocks in tests.
#[allow(async_fn_in_trait)]
pub trait RunApi {
    async fn fetch_run_state(&self, run_id: u64) -> Result<WorkflowRunState>;
    async fn fetch_run_jobs(&self, run_id: u64) -> Result<Vec<WorkflowRunJob>>;
}

/// Maps an observed run status to a verdict on whether to keep waiting.
///
/// `completed` is the only terminal status. `queued` and `in_progress` mean
/// the run is still pending. Everything else, including an absent status, is
/// unsupported: polling against a value we cannot interpret would never
/// resolve, so the caller must stop.
pub fn resolve_status(status: Option<&str>, attempt_no: u64) -> RunResult<RunStatus> {
    match status.and_then(RunStatus::parse) {
        Some(RunStatus::Completed) => {
            tracing::debug!("Run has completed");
            Ok(RunStatus::Completed)
        }
        Some(status @ RunStatus::Queued) => {
            tracing::debug!("Run is queued to begin, attempt {}...", attempt_no);
            Err(Failure::Pending(status))
        }
        Some(status @ RunStatus::InProgress) => {
            tracing::debug!("Run is in progress, attempt {}...", attempt_no);
            Err(Failure::Pending(status))
        }
        _ => {
            let raw = status.unwrap_or("null");
            tracing::debug!("Run has returned an unsupported status: {}", raw);
            Err(Failure::Unsupported(raw.to_string()))
        }
    }
}

/// Maps a conclusion observed on a completed run to the final verdict.
pub fn resolve_conclusion(conclusion: Option<&str>) -> RunResult<RunConclusion> {
    match conclusion.and_then(RunConclusion::parse) {
        Some(RunConclusion::Success) => Ok(RunConclusion::Success),
        Some(
            conclusion @ (RunConclusion::ActionRequired
            | RunConclusion::Cancelled
            | RunConclusion::Failure
            | RunConclusion::Neutral
            | RunConclusion::Skipped),
        ) => {
            tracing::error!("Run has failed with conclusion: {}", conclusion);
            Err(Failure::Inconclusive(conclusion))
        }
        Some(RunConclusion::TimedOut) => {
            tracing::error!("Run has failed with conclusion: timed_out");
            Err(Failure::Timeout)
        }
        _ => {
            let raw = conclusion.unwrap_or("null");
            tracing::error!("Run has failed with unsupported conclusion: {}", raw);
            Err(Failure::Unsupported(raw.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub run_id: u64,
    pub poll_interval: Duration,
    pub run_timeout: Duration,
    pub start_time: Instant,
}

/// Polls the run state until it completes or `run_timeout` elapses.
///
/// The first observation of a `completed` status terminates the loop
/// unconditionally with the resolved conclusion. An unsupported status or
/// conclusion terminates immediately. A state fetch whose inner retry budget
/// is exhausted counts as "not yet known" and the loop keeps waiting.
pub async fn await_run_completion<A: RunApi>(api: &A, opts: &PollOptions) -> RunResult<CompletedRun> {
    let mut attempt_no = 0u64;
    while opts.start_time.elapsed() < opts.run_timeout {
        attempt_no += 1;

        let state = retry_on_error(
            || api.fetch_run_state(opts.run_id),
            STATE_FETCH_TIMEOUT,
            Some("fetch_run_state"),
        )
        .await;
        match state {
            Ok(state) => match resolve_status(state.status.as_deref(), attempt_no) {
                Ok(status) => {
                    return resolve_conclusion(state.conclusion.as_deref())
                        .map(|conclusion| CompletedRun { status, conclusion });
                }
                Err(Failure::Pending(_)) => {}
                Err(failure) => return Err(failure),
            },
            Err(_) => {
                tracing::debug!("Run has not yet been identified, attempt {}...", attempt_no);
            }
        }

        sleep(opts.poll_interval).await;
    }

    Err(Failure::Timeout)
}

/// Looks for a job to link the user to while the run is underway.
///
/// Best-effort, bounded by `timeout`, and runs once before the main wait: the
/// first job observed as `in_progress` or `completed` yields its URL (or
/// [`NO_JOB_URL`] when the API supplied none). Transport contract violations
/// propagate as hard errors.
pub async fn locate_active_job_url<A: RunApi>(
    api: &A,
    run_id: u64,
    timeout: Duration,
) -> Result<RunResult<String>> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        let jobs = api.fetch_run_jobs(run_id).await?;
        if let Some(job) =
            jobs.iter().find(|job| job.status == "in_progress" || job.status == "completed")
        {
            return Ok(Ok(job.url.clone().unwrap_or_else(|| NO_JOB_URL.to_string())));
        }

        tracing::debug!("No in_progress or completed jobs found for run {}, retrying...", run_id);
        sleep(ACTIVE_JOB_POLL_INTERVAL).await;
    }

    tracing::debug!("Timed out while trying to fetch a job URL for run {}", run_id);
    Ok(Err(Failure::Timeout))
}

/// Logs identifying metadata for every failed job in the run, keeping only
/// the steps that did not succeed.
pub async fn report_failed_jobs<A: RunApi>(api: &A, run_id: u64) -> Result<()> {
    let jobs = api.fetch_run_jobs(run_id).await?;
    let failed = failed_jobs(jobs);
    if failed.is_empty() {
        tracing::warn!("Failed to find failed jobs for run {}", run_id);
        return Ok(());
    }

    for job in &failed {
        tracing::error!("{}", format_failed_job(job));
    }
    Ok(())
}

fn failed_jobs(jobs: Vec<WorkflowRunJob>) -> Vec<WorkflowRunJob> {
    jobs.into_iter().filter(|job| job.conclusion.as_deref() == Some("failure")).collect()
}

fn format_failed_job(job: &WorkflowRunJob) -> String {
    let mut out = format!(
        "Job {}:\n  ID: {}\n  Status: {}\n  Conclusion: {}\n  URL: {}\n  Steps (non-success):",
        job.name,
        job.id,
        job.status,
        job.conclusion.as_deref().unwrap_or("null"),
        job.url.as_deref().unwrap_or(NO_JOB_URL),
    );
    for step in job.steps.iter().filter(|step| step.conclusion.as_deref() != Some("success")) {
        out.push_str(&format!(
            "\n    {}: {}\n      Status: {}\n      Conclusion: {}",
            step.number,
            step.name,
            step.status,
            step.conclusion.as_deref().unwrap_or("null"),
        ));
    }
    out
}
