use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::process::{ProcessConfig, spawn_and_stream};
use crate::report::{Annotation, AnnotationLevel, CheckOutput, Conclusion, LintReport};

/// Black-box static-analysis runner: takes an ordered file list, returns a
/// conclusion plus the check-run output to publish.
pub trait LintRunner {
    fn lint(
        &self,
        files: &[String],
    ) -> impl std::future::Future<Output = Result<LintReport>> + Send;
}

/// Runs an eslint-compatible command and parses its JSON formatter output.
pub struct EslintRunner {
    command: String,
    extra_args: Vec<String>,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl EslintRunner {
    pub fn new(
        command: String,
        extra_args: Vec<String>,
        working_dir: PathBuf,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            command,
            extra_args,
            working_dir,
            timeout,
        }
    }

    /// Build the command and arguments for a given file list.
    pub fn build_command(&self, files: &[String]) -> (String, Vec<String>) {
        let mut args = self.extra_args.clone();
        args.push("--format".to_string());
        args.push("json".to_string());
        args.extend(files.iter().cloned());
        (self.command.clone(), args)
    }
}

impl LintRunner for EslintRunner {
    async fn lint(&self, files: &[String]) -> Result<LintReport> {
        let (command, args) = self.build_command(files);

        let config = ProcessConfig {
            command,
            args,
            working_dir: self.working_dir.clone(),
            timeout: self.timeout,
            log_prefix: "eslint".to_string(),
        };

        let output = spawn_and_stream(config).await?;

        if let Some(sig) = output.signal {
            return Err(Error::LintRunner(format!("linter killed by signal {sig}")));
        }

        // ESLint exits 1 when lint errors exist; that is a clean execution,
        // surfaced through the report's conclusion. Anything above 1 means
        // the linter itself broke.
        if output.exit_code > 1 {
            return Err(Error::LintRunner(format!(
                "linter exited with code {}: {}",
                output.exit_code,
                output.stderr_lines.join("\n")
            )));
        }

        let stdout = output.stdout_lines.join("\n");
        let results: Vec<FileResult> = serde_json::from_str(&stdout)
            .map_err(|e| Error::LintRunner(format!("failed to parse linter JSON output: {e}")))?;

        debug!(files = results.len(), "parsed linter output");
        Ok(report_from_results(results, &self.working_dir))
    }
}

// ---------------------------------------------------------------------------
// ESLint JSON formatter output
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResult {
    file_path: String,
    messages: Vec<Message>,
    error_count: u32,
    warning_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    rule_id: Option<String>,
    severity: u8,
    message: String,
    line: Option<u32>,
    end_line: Option<u32>,
}

fn report_from_results(results: Vec<FileResult>, working_dir: &Path) -> LintReport {
    let mut annotations = Vec::new();
    let mut error_count = 0;
    let mut warning_count = 0;

    for file in results {
        error_count += file.error_count;
        warning_count += file.warning_count;
        let path = relativize(&file.file_path, working_dir);
        for message in file.messages {
            annotations.push(annotation_from_message(&path, message));
        }
    }

    let conclusion = if error_count > 0 {
        Conclusion::Failure
    } else {
        Conclusion::Success
    };

    LintReport {
        conclusion,
        output: CheckOutput {
            title: format!("{error_count} error(s), {warning_count} warning(s)"),
            summary: format!("ESLint found {error_count} error(s) and {warning_count} warning(s)"),
            annotations,
        },
    }
}

fn annotation_from_message(path: &str, message: Message) -> Annotation {
    let level = match message.severity {
        2 => AnnotationLevel::Failure,
        1 => AnnotationLevel::Warning,
        _ => AnnotationLevel::Notice,
    };
    // Parse errors come without a line; annotation lines are 1-based.
    let start_line = message.line.unwrap_or(1).max(1);
    let end_line = message.end_line.unwrap_or(start_line).max(start_line);
    let text = match message.rule_id {
        Some(rule) => format!("{} ({rule})", message.message),
        None => message.message,
    };
    Annotation {
        path: path.to_string(),
        start_line,
        end_line,
        annotation_level: level,
        message: text,
    }
}

/// Annotation paths must be relative to the repository root; ESLint reports
/// absolute paths.
fn relativize(file_path: &str, working_dir: &Path) -> String {
    let path = Path::new(file_path);
    path.strip_prefix(working_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(severity: u8, line: u32, text: &str, rule: Option<&str>) -> Message {
        Message {
            rule_id: rule.map(String::from),
            severity,
            message: text.to_string(),
            line: Some(line),
            end_line: None,
        }
    }

    #[test]
    fn test_build_command_appends_format_and_files() {
        let runner = EslintRunner::new(
            "npx".to_string(),
            vec!["eslint".to_string()],
            PathBuf::from("."),
            None,
        );
        let (command, args) = runner.build_command(&["a.ts".to_string(), "b.ts".to_string()]);
        assert_eq!(command, "npx");
        assert_eq!(args, vec!["eslint", "--format", "json", "a.ts", "b.ts"]);
    }

    #[test]
    fn test_parse_formatter_output() {
        let json = r#"[
            {
                "filePath": "/repo/src/index.ts",
                "messages": [
                    {
                        "ruleId": "no-unused-vars",
                        "severity": 2,
                        "message": "'x' is assigned a value but never used.",
                        "line": 3,
                        "column": 7,
                        "endLine": 3,
                        "endColumn": 8
                    }
                ],
                "errorCount": 1,
                "warningCount": 0,
                "fixableErrorCount": 0,
                "fixableWarningCount": 0
            }
        ]"#;
        let results: Vec<FileResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results[0].error_count, 1);
        assert_eq!(results[0].messages[0].rule_id.as_deref(), Some("no-unused-vars"));
    }

    #[test]
    fn test_report_maps_severities() {
        let results = vec![FileResult {
            file_path: "/repo/src/a.ts".to_string(),
            messages: vec![
                message(2, 3, "boom", Some("no-undef")),
                message(1, 8, "meh", Some("eqeqeq")),
            ],
            error_count: 1,
            warning_count: 1,
        }];
        let report = report_from_results(results, Path::new("/repo"));
        assert_eq!(report.conclusion, Conclusion::Failure);
        let annotations = &report.output.annotations;
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].path, "src/a.ts");
        assert_eq!(annotations[0].annotation_level, AnnotationLevel::Failure);
        assert_eq!(annotations[0].message, "boom (no-undef)");
        assert_eq!(annotations[1].annotation_level, AnnotationLevel::Warning);
        assert_eq!(report.output.title, "1 error(s), 1 warning(s)");
    }

    #[test]
    fn test_warnings_only_is_success() {
        let results = vec![FileResult {
            file_path: "/repo/src/a.ts".to_string(),
            messages: vec![message(1, 1, "meh", None)],
            error_count: 0,
            warning_count: 1,
        }];
        let report = report_from_results(results, Path::new("/repo"));
        assert_eq!(report.conclusion, Conclusion::Success);
        assert_eq!(report.output.annotations[0].message, "meh");
    }

    #[test]
    fn test_clean_run_has_no_annotations() {
        let results = vec![FileResult {
            file_path: "/repo/src/a.ts".to_string(),
            messages: vec![],
            error_count: 0,
            warning_count: 0,
        }];
        let report = report_from_results(results, Path::new("/repo"));
        assert_eq!(report.conclusion, Conclusion::Success);
        assert!(report.output.annotations.is_empty());
    }

    #[test]
    fn test_message_without_line_anchors_to_first_line() {
        let results = vec![FileResult {
            file_path: "/repo/src/a.ts".to_string(),
            messages: vec![Message {
                rule_id: None,
                severity: 2,
                message: "Parsing error: unexpected token".to_string(),
                line: None,
                end_line: None,
            }],
            error_count: 1,
            warning_count: 0,
        }];
        let report = report_from_results(results, Path::new("/repo"));
        assert_eq!(report.output.annotations[0].start_line, 1);
        assert_eq!(report.output.annotations[0].end_line, 1);
    }

    #[test]
    fn test_relativize_foreign_path_kept() {
        assert_eq!(relativize("/other/a.ts", Path::new("/repo")), "/other/a.ts");
    }
}
