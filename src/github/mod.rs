pub mod etag;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use reqwest::{
    StatusCode,
    header::{self, HeaderMap, HeaderValue},
};

use crate::{
    await_run::RunApi,
    config::Config,
    github::etag::{EtagCache, RawResponse},
    models::{JobsResponse, WorkflowRunJob, WorkflowRunState},
};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One polling session's view of the GitHub API: an authenticated client,
/// the repository coordinates, and the conditional-request cache.
pub struct GitHub {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    cache: EtagCache,
}

impl GitHub {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .context("Token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            cache: EtagCache::default(),
        })
    }

    /// Drops all cached validators. Only needed between independent sessions
    /// sharing one client.
    pub async fn clear_cache(&self) { self.cache.clear().await }

    /// Conditional GET of `url`, replaying the cached body on 304. Any status
    /// other than 200 after replay is a contract violation.
    async fn get_cached(&self, url: &str) -> Result<Bytes> {
        let response = self
            .cache
            .fetch(url, |validator| {
                let mut request = self.client.get(url);
                if let Some(validator) = validator {
                    request = request.header(header::IF_NONE_MATCH, validator);
                }
                async move {
                    let response = request.send().await.context("Request failed")?;
                    let status = response.status();
                    let etag = response
                        .headers()
                        .get(header::ETAG)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned);
                    let body = response.bytes().await.context("Failed to read response body")?;
                    Ok(RawResponse { status, etag, body })
                }
            })
            .await?;
        if response.status != StatusCode::OK {
            bail!("Expected 200 but received {}", response.status);
        }
        Ok(response.body)
    }
}

impl RunApi for GitHub {
    async fn fetch_run_state(&self, run_id: u64) -> Result<WorkflowRunState> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{}",
            self.api_base, self.owner, self.repo, run_id
        );
        let body = self.get_cached(&url).await.context("Failed to fetch workflow run state")?;
        let state: WorkflowRunState =
            serde_json::from_slice(&body).context("Failed to parse workflow run state")?;
        tracing::debug!(
            "Fetched run:\n  Repository: {}/{}\n  Run ID: {}\n  Status: {}\n  Conclusion: {}",
            self.owner,
            self.repo,
            run_id,
            state.status.as_deref().unwrap_or("null"),
            state.conclusion.as_deref().unwrap_or("null"),
        );
        Ok(state)
    }

    async fn fetch_run_jobs(&self, run_id: u64) -> Result<Vec<WorkflowRunJob>> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{}/jobs?filter=latest",
            self.api_base, self.owner, self.repo, run_id
        );
        let body =
            self.get_cached(&url).await.context("Failed to fetch jobs for workflow run")?;
        let response: JobsResponse =
            serde_json::from_slice(&body).context("Failed to parse workflow run jobs")?;
        tracing::debug!(
            "Fetched jobs for run {}: [{}]",
            run_id,
            response.jobs.iter().map(|job| job.name.as_str()).collect::<Vec<_>>().join(", "),
        );
        Ok(response.jobs)
    }
}
