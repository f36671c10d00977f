use std::{env, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Inputs for one polling session, resolved before any request is made.
#[derive(Debug, Clone)]
pub struct Config {
    /// API token for authenticated requests.
    pub token: String,
    /// Owner of the repository the run belongs to.
    pub owner: String,
    /// Repository the run belongs to.
    pub repo: String,
    /// Workflow run to await.
    pub run_id: u64,
    /// Overall deadline for the wait.
    pub run_timeout: Duration,
    /// Interval between run state polls.
    pub poll_interval: Duration,
    /// API base URL, overridable for GitHub Enterprise.
    pub api_base: String,
}

impl Config {
    /// Reads the action inputs from the environment. Invalid numeric inputs
    /// are a hard error before polling starts.
    pub fn from_env() -> Result<Self> { Self::from_lookup(|name| env::var(name).ok()) }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Empty inputs count as absent, matching how actions pass unset values.
        let input = |name: &str| lookup(&format!("INPUT_{name}")).filter(|value| !value.is_empty());

        let token = input("TOKEN").context("Input TOKEN must be provided")?;
        let owner = input("OWNER").context("Input OWNER must be provided")?;
        let repo = input("REPO").context("Input REPO must be provided")?;
        let run_id = parse_number(&input("RUN_ID").context("Input RUN_ID must be provided")?)?;
        let run_timeout = match input("RUN_TIMEOUT_SECONDS") {
            Some(value) => Duration::from_secs(parse_number(&value)?),
            None => DEFAULT_RUN_TIMEOUT,
        };
        let poll_interval = match input("POLL_INTERVAL_MS") {
            Some(value) => Duration::from_millis(parse_number(&value)?),
            None => DEFAULT_POLL_INTERVAL,
        };
        let api_base = lookup("GITHUB_API_URL")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self { token, owner, repo, run_id, run_timeout, poll_interval, api_base })
    }
}

fn parse_number(value: &str) -> Result<u64> {
    value.trim().parse().with_context(|| format!("Unable to parse value: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        move |name| pairs.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
    }

    #[test]
    fn applies_defaults_for_absent_inputs() {
        let config = Config::from_lookup(lookup(&[
            ("INPUT_TOKEN", "secret"),
            ("INPUT_OWNER", "octo"),
            ("INPUT_REPO", "widgets"),
            ("INPUT_RUN_ID", "4242"),
        ]))
        .unwrap();
        assert_eq!(config.run_id, 4242);
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.api_base, "https://api.github.com");
    }

    #[test]
    fn empty_numeric_input_uses_default() {
        let config = Config::from_lookup(lookup(&[
            ("INPUT_TOKEN", "secret"),
            ("INPUT_OWNER", "octo"),
            ("INPUT_REPO", "widgets"),
            ("INPUT_RUN_ID", "1"),
            ("INPUT_RUN_TIMEOUT_SECONDS", ""),
            ("INPUT_POLL_INTERVAL_MS", ""),
        ]))
        .unwrap();
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
    }

    #[test]
    fn overrides_defaults_when_given() {
        let config = Config::from_lookup(lookup(&[
            ("INPUT_TOKEN", "secret"),
            ("INPUT_OWNER", "octo"),
            ("INPUT_REPO", "widgets"),
            ("INPUT_RUN_ID", "1"),
            ("INPUT_RUN_TIMEOUT_SECONDS", "30"),
            ("INPUT_POLL_INTERVAL_MS", "250"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
        ]))
        .unwrap();
        assert_eq!(config.run_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.api_base, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn rejects_non_numeric_input() {
        let err = Config::from_lookup(lookup(&[
            ("INPUT_TOKEN", "secret"),
            ("INPUT_OWNER", "octo"),
            ("INPUT_REPO", "widgets"),
            ("INPUT_RUN_ID", "1"),
            ("INPUT_POLL_INTERVAL_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("Unable to parse value: soon"));
    }

    #[test]
    fn requires_run_id() {
        let err = Config::from_lookup(lookup(&[
            ("INPUT_TOKEN", "secret"),
            ("INPUT_OWNER", "octo"),
            ("INPUT_REPO", "widgets"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("RUN_ID"));
    }
}
