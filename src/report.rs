use serde::{Deserialize, Serialize};

/// Terminal conclusion of a check run, in GitHub's wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Notice,
    Warning,
    Failure,
}

/// One inline diagnostic attached to a file/line range of the head commit.
///
/// `path` is relative to the repository root with `/` separators;
/// `start_line`/`end_line` are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub annotation_level: AnnotationLevel,
    pub message: String,
}

/// The output payload of a check run: a title, a summary, and the
/// annotations shown inline on the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

/// What the lint runner hands back: an overall conclusion plus the
/// check-run output to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub conclusion: Conclusion,
    pub output: CheckOutput,
}
