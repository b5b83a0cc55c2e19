use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PullRequestContext;
use crate::error::{Error, Result};
use crate::report::{CheckOutput, Conclusion};

const API_URL: &str = "https://api.github.com";
const GRAPHQL_URL: &str = "https://api.github.com/graphql";
const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("prlint/", env!("CARGO_PKG_VERSION"));
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

const HEAD_COMMIT_QUERY: &str = r#"
query($owner: String!, $name: String!, $prNumber: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $prNumber) {
      commits(last: 1) {
        nodes {
          commit {
            oid
          }
        }
      }
    }
  }
}
"#;

/// One changed file of a pull request, as listed by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullFile {
    pub filename: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRunSummary {
    pub id: u64,
    pub name: String,
}

/// Payload for a check-run update call. Progress updates leave
/// `completed_at` and `conclusion` unset; only the terminal update
/// carries them.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRunUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckOutput>,
}

/// Abstraction over the source-control query/check-run API, for testability.
pub trait ChecksClient {
    /// Most recent commit id on the pull request.
    fn latest_commit_sha(&self, pr: &PullRequestContext) -> Result<String>;

    /// Changed files of the pull request.
    fn list_pull_files(&self, pr: &PullRequestContext) -> Result<Vec<PullFile>>;

    /// Check runs on `head_sha` that are still in progress.
    fn list_in_progress_check_runs(
        &self,
        pr: &PullRequestContext,
        head_sha: &str,
    ) -> Result<Vec<CheckRunSummary>>;

    /// Create an in-progress check run, returning its id.
    fn create_check_run(
        &self,
        pr: &PullRequestContext,
        name: &str,
        head_sha: &str,
        started_at: &str,
    ) -> Result<u64>;

    fn update_check_run(
        &self,
        pr: &PullRequestContext,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> Result<()>;
}

/// Real client speaking to the GitHub REST and GraphQL APIs with retry
/// and exponential backoff on transient errors.
pub struct HttpChecksClient {
    token: String,
}

impl HttpChecksClient {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    fn execute(
        &self,
        method: &str,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 1..=MAX_RETRIES {
            let request = ureq::request(method, url)
                .set("Authorization", &format!("Bearer {}", self.token))
                .set("Accept", ACCEPT)
                .set("User-Agent", USER_AGENT);
            let result = match body {
                Some(json) => request.send_json(json),
                None => request.call(),
            };
            match result {
                Ok(response) => {
                    return response
                        .into_json()
                        .map_err(|e| Error::Api(format!("failed to parse GitHub response: {e}")));
                }
                Err(ref e) if attempt < MAX_RETRIES && is_retryable(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        backoff_ms,
                        "retrying GitHub API after transient error"
                    );
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(e) => return Err(Error::Api(format!("{method} {url} failed: {e}"))),
            }
        }
        unreachable!()
    }

    fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });
        let json = self.execute("POST", GRAPHQL_URL, Some(&body))?;
        if let Some(errors) = json.get("errors") {
            return Err(Error::Api(format!("GraphQL errors: {errors}")));
        }
        json.get("data")
            .cloned()
            .ok_or_else(|| Error::Api("GraphQL response missing data".to_string()))
    }
}

impl ChecksClient for HttpChecksClient {
    fn latest_commit_sha(&self, pr: &PullRequestContext) -> Result<String> {
        let data = self.graphql(
            HEAD_COMMIT_QUERY,
            serde_json::json!({
                "owner": pr.owner,
                "name": pr.repo,
                "prNumber": pr.number,
            }),
        )?;
        let info: HeadCommitData = serde_json::from_value(data)
            .map_err(|e| Error::Api(format!("unexpected head-commit response: {e}")))?;
        let sha = info
            .repository
            .pull_request
            .commits
            .nodes
            .into_iter()
            .next()
            .map(|node| node.commit.oid)
            .ok_or_else(|| Error::Api(format!("pull request #{} has no commits", pr.number)))?;
        debug!(%sha, "resolved head commit");
        Ok(sha)
    }

    fn list_pull_files(&self, pr: &PullRequestContext) -> Result<Vec<PullFile>> {
        let url = format!(
            "{API_URL}/repos/{}/{}/pulls/{}/files",
            pr.owner, pr.repo, pr.number
        );
        let json = self.execute("GET", &url, None)?;
        serde_json::from_value(json)
            .map_err(|e| Error::Api(format!("unexpected file-list response: {e}")))
    }

    fn list_in_progress_check_runs(
        &self,
        pr: &PullRequestContext,
        head_sha: &str,
    ) -> Result<Vec<CheckRunSummary>> {
        let url = format!(
            "{API_URL}/repos/{}/{}/commits/{head_sha}/check-runs?status=in_progress",
            pr.owner, pr.repo
        );
        let json = self.execute("GET", &url, None)?;
        let list: CheckRunList = serde_json::from_value(json)
            .map_err(|e| Error::Api(format!("unexpected check-run list response: {e}")))?;
        Ok(list.check_runs)
    }

    fn create_check_run(
        &self,
        pr: &PullRequestContext,
        name: &str,
        head_sha: &str,
        started_at: &str,
    ) -> Result<u64> {
        let url = format!("{API_URL}/repos/{}/{}/check-runs", pr.owner, pr.repo);
        let body = serde_json::json!({
            "name": name,
            "head_sha": head_sha,
            "status": "in_progress",
            "started_at": started_at,
        });
        let json = self.execute("POST", &url, Some(&body))?;
        let created: CreatedCheckRun = serde_json::from_value(json)
            .map_err(|e| Error::Api(format!("unexpected check-run create response: {e}")))?;
        Ok(created.id)
    }

    fn update_check_run(
        &self,
        pr: &PullRequestContext,
        check_run_id: u64,
        update: &CheckRunUpdate,
    ) -> Result<()> {
        let url = format!(
            "{API_URL}/repos/{}/{}/check-runs/{check_run_id}",
            pr.owner, pr.repo
        );
        let body = serde_json::to_value(update)
            .map_err(|e| Error::Api(format!("failed to encode check-run update: {e}")))?;
        self.execute("PATCH", &url, Some(&body))?;
        Ok(())
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport/network errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Wire response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HeadCommitData {
    repository: RepositoryNode,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    #[serde(rename = "pullRequest")]
    pull_request: PullRequestNode,
}

#[derive(Debug, Deserialize)]
struct PullRequestNode {
    commits: CommitConnection,
}

#[derive(Debug, Deserialize)]
struct CommitConnection {
    nodes: Vec<CommitNode>,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    commit: CommitOid,
}

#[derive(Debug, Deserialize)]
struct CommitOid {
    oid: String,
}

#[derive(Debug, Deserialize)]
struct CheckRunList {
    check_runs: Vec<CheckRunSummary>,
}

#[derive(Debug, Deserialize)]
struct CreatedCheckRun {
    id: u64,
}
