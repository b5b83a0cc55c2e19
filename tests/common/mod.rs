#![allow(dead_code)]

use prlint::config::{Config, DEFAULT_EXTENSIONS, PullRequestContext};

/// Sensible default `Config` for tests. Callers can override fields via
/// struct update syntax.
pub fn default_test_config() -> Config {
    Config {
        token: "t0ken".to_string(),
        pull_request: PullRequestContext {
            owner: "octocat".to_string(),
            repo: "hello-world".to_string(),
            number: 17,
        },
        check_name: None,
        extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        lint_command: "eslint".to_string(),
        lint_args: vec![],
        timeout_seconds: None,
    }
}
