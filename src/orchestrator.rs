use std::collections::VecDeque;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_CHECK_NAME};
use crate::error::{Error, Result};
use crate::github::{CheckRunUpdate, ChecksClient, PullFile};
use crate::lint::LintRunner;
use crate::report::{Annotation, CheckOutput, Conclusion, LintReport};

/// The check-run update API accepts at most 50 annotations per call.
pub const MAX_ANNOTATIONS_PER_CALL: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Lint ran to completion without errors.
    Clean,
    /// No changed file matched the lintable extensions; nothing was published.
    NothingToLint,
    /// Lint ran to completion and reported errors. The check run is closed
    /// normally, but the job must still signal failure to the CI host.
    LintFailure,
}

/// Drives one lint-and-report pass over a pull request: resolve the head
/// commit, filter the changed files, resolve or create the check run, run
/// the linter, and publish its annotations in batches.
pub struct Orchestrator<R: LintRunner> {
    config: Config,
    client: Box<dyn ChecksClient>,
    runner: R,
}

impl<R: LintRunner> Orchestrator<R> {
    pub fn new(config: Config, client: Box<dyn ChecksClient>, runner: R) -> Self {
        Self {
            config,
            client,
            runner,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let pr = &self.config.pull_request;

        let head_sha = self.client.latest_commit_sha(pr)?;
        info!(pr = pr.number, sha = %head_sha, "resolved head commit");

        let changed = self.client.list_pull_files(pr)?;
        let files = lintable_files(&changed, &self.config.extensions);
        if files.is_empty() {
            warn!(
                extensions = ?self.config.extensions,
                "no files with lintable extensions added or modified in this PR, nothing to lint"
            );
            return Ok(RunOutcome::NothingToLint);
        }
        info!(changed = changed.len(), lintable = files.len(), "filtered changed files");

        let check_run_id = self.resolve_check_run(&head_sha)?;

        // From here on a check run exists; any hard error must close it out.
        let report = match self.runner.lint(&files).await {
            Ok(report) => report,
            Err(e) => return self.close_as_failed(check_run_id, e),
        };

        if let Err(e) = self.publish(check_run_id, &report) {
            return self.close_as_failed(check_run_id, e);
        }

        if report.conclusion == Conclusion::Failure {
            info!(check_run_id, "lint reported errors");
            return Ok(RunOutcome::LintFailure);
        }
        Ok(RunOutcome::Clean)
    }

    /// Reuse an in-progress check run matching the configured name, or
    /// create a fresh one. Re-running against the same commit with the same
    /// name attaches to the same check run instead of duplicating it.
    fn resolve_check_run(&self, head_sha: &str) -> Result<u64> {
        let pr = &self.config.pull_request;
        if let Some(ref name) = self.config.check_name {
            let runs = self.client.list_in_progress_check_runs(pr, head_sha)?;
            if let Some(run) = runs.into_iter().find(|run| run.name == *name) {
                info!(check_run_id = run.id, name = %run.name, "reusing in-progress check run");
                return Ok(run.id);
            }
        }
        let id = self
            .client
            .create_check_run(pr, DEFAULT_CHECK_NAME, head_sha, &now_rfc3339())?;
        info!(check_run_id = id, sha = %head_sha, "created check run");
        Ok(id)
    }

    /// Publish the report as a sequence of update calls carrying at most 50
    /// annotations each. Only the final call carries the completion time and
    /// conclusion; with zero annotations a single call is both first and
    /// final.
    fn publish(&self, check_run_id: u64, report: &LintReport) -> Result<()> {
        let pr = &self.config.pull_request;
        let mut remaining: VecDeque<Annotation> =
            report.output.annotations.iter().cloned().collect();
        loop {
            let batch = next_batch(&mut remaining);
            // Terminal exactly when nothing remains after this split; never
            // inferred from the size of the batch itself.
            let is_final = remaining.is_empty();
            let update = CheckRunUpdate {
                completed_at: is_final.then(now_rfc3339),
                conclusion: is_final.then_some(report.conclusion),
                output: Some(CheckOutput {
                    title: report.output.title.clone(),
                    summary: report.output.summary.clone(),
                    annotations: batch,
                }),
            };
            self.client.update_check_run(pr, check_run_id, &update)?;
            if is_final {
                return Ok(());
            }
        }
    }

    /// Best-effort terminal update after a hard error: force the check run
    /// to a failure conclusion, then surface the original error. If this
    /// update itself fails, that error propagates instead.
    fn close_as_failed(&self, check_run_id: u64, cause: Error) -> Result<RunOutcome> {
        warn!(check_run_id, error = %cause, "closing check run as failed");
        self.client.update_check_run(
            &self.config.pull_request,
            check_run_id,
            &CheckRunUpdate {
                completed_at: Some(now_rfc3339()),
                conclusion: Some(Conclusion::Failure),
                output: None,
            },
        )?;
        Err(cause)
    }
}

/// Changed files worth linting: extension in the allow-set and not removed
/// by the pull request. Order is preserved.
pub fn lintable_files(changed: &[PullFile], extensions: &[String]) -> Vec<String> {
    changed
        .iter()
        .filter(|file| {
            file.status != "removed" && has_lintable_extension(&file.filename, extensions)
        })
        .map(|file| file.filename.clone())
        .collect()
}

fn has_lintable_extension(filename: &str, extensions: &[String]) -> bool {
    match Path::new(filename).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|allowed| allowed.strip_prefix('.') == Some(ext.as_ref()))
        }
        None => false,
    }
}

fn next_batch(remaining: &mut VecDeque<Annotation>) -> Vec<Annotation> {
    let take = remaining.len().min(MAX_ANNOTATIONS_PER_CALL);
    remaining.drain(..take).collect()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
