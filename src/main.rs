use std::process::ExitCode;

use anyhow::{Result, bail};
use gh_await_run::{
    await_run::{PollOptions, await_run_completion, locate_active_job_url, report_failed_jobs},
    config::Config,
    github::GitHub,
    models::Failure,
};
use tokio::time::{Duration, Instant};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// How long to look for an active job to link the user to before the wait.
const ACTIVE_JOB_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let start_time = Instant::now();
    let config = Config::from_env()?;
    let github = GitHub::new(&config)?;

    let active_job_url =
        match locate_active_job_url(&github, config.run_id, ACTIVE_JOB_TIMEOUT).await? {
            Ok(url) => url,
            Err(_) => "Unable to fetch URL".to_string(),
        };
    tracing::info!(
        "Awaiting completion of workflow run {}...\n  URL: {}",
        config.run_id,
        active_job_url
    );

    let options = PollOptions {
        run_id: config.run_id,
        poll_interval: config.poll_interval,
        run_timeout: config.run_timeout,
        start_time,
    };
    match await_run_completion(&github, &options).await {
        Ok(run) => {
            tracing::info!(
                "Run completed:\n  Run ID: {}\n  Status: {}\n  Conclusion: {}",
                config.run_id,
                run.status,
                run.conclusion
            );
            Ok(())
        }
        Err(failure) => {
            let message = failure_message(&failure, start_time.elapsed());
            // Diagnostics are best-effort; their failure must not mask the verdict.
            if let Err(err) = report_failed_jobs(&github, config.run_id).await {
                tracing::error!("Failed to fetch failure details: {:#}", err);
            }
            bail!(message)
        }
    }
}

fn failure_message(failure: &Failure, elapsed: Duration) -> String {
    match failure {
        Failure::Timeout => format!(
            "Timeout exceeded while attempting to await run conclusion ({}ms)",
            elapsed.as_millis()
        ),
        Failure::Inconclusive(conclusion) => format!("Run concluded with: {conclusion}"),
        Failure::Unsupported(value) => format!("Unsupported value was returned: {value}"),
        Failure::Pending(status) => format!("Run is still pending with status: {status}"),
    }
}
