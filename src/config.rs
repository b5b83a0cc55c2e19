use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

/// Name used when creating a fresh check run.
pub const DEFAULT_CHECK_NAME: &str = "ESLint check";

/// Extensions considered lintable when the config file does not override them.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx"];

const DEFAULT_CONFIG_PATH: &str = "prlint.toml";
const TOKEN_ENV: &str = "GITHUB_TOKEN";
const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Identity of the pull request under lint. Read once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestContext {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub check_name: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub lint_command: Option<String>,
    pub lint_args: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub token: String,
    pub pull_request: PullRequestContext,
    /// Preferred check-run name: when set, an in-progress check run with this
    /// exact name on the head commit is reused instead of creating a new one.
    pub check_name: Option<String>,
    pub extensions: Vec<String>,
    pub lint_command: String,
    pub lint_args: Vec<String>,
    pub timeout_seconds: Option<u64>,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => {
                let config_path = Path::new(path);
                if !config_path.exists() {
                    return Err(Error::ConfigNotFound(config_path.to_path_buf()));
                }
                let content = std::fs::read_to_string(config_path)?;
                parse_config(&content)?
            }
            None => {
                let config_path = Path::new(DEFAULT_CONFIG_PATH);
                if config_path.exists() {
                    let content = std::fs::read_to_string(config_path)?;
                    parse_config(&content)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let token = resolve_token(cli.token.as_deref(), std::env::var(TOKEN_ENV).ok())?;
        let repo_slug = cli
            .repo
            .clone()
            .or_else(|| std::env::var(REPOSITORY_ENV).ok())
            .ok_or_else(|| {
                Error::ConfigValidation(format!(
                    "repository not set: pass --repo or set ${REPOSITORY_ENV}"
                ))
            })?;
        let (owner, repo) = parse_repo_slug(&repo_slug)?;
        let number = cli
            .pr
            .ok_or_else(|| Error::ConfigValidation("pull request number not set: pass --pr".into()))?;

        Ok(merge(
            file_config,
            cli,
            token,
            PullRequestContext {
                owner,
                repo,
                number,
            },
        ))
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref extensions) = config.extensions {
        if extensions.is_empty() {
            return Err(Error::ConfigValidation(
                "extensions must not be empty".to_string(),
            ));
        }
        for ext in extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(Error::ConfigValidation(format!(
                    "invalid extension {ext:?} (expected e.g. \".ts\")"
                )));
            }
        }
    }
    if let Some(ref command) = config.lint_command
        && command.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "lint_command must not be empty".to_string(),
        ));
    }
    if let Some(timeout) = config.timeout_seconds
        && timeout == 0
    {
        return Err(Error::ConfigValidation(
            "timeout_seconds must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn resolve_token(flag: Option<&str>, env: Option<String>) -> Result<String> {
    flag.map(str::to_string).or(env).ok_or_else(|| {
        Error::ConfigValidation(format!(
            "repository token not set: pass --token or set ${TOKEN_ENV}"
        ))
    })
}

fn parse_repo_slug(slug: &str) -> Result<(String, String)> {
    match slug.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::ConfigValidation(format!(
            "invalid repository {slug:?} (expected owner/name)"
        ))),
    }
}

pub fn merge(file: ConfigFile, cli: &Cli, token: String, pull_request: PullRequestContext) -> Config {
    Config {
        token,
        pull_request,
        check_name: cli.check_name.clone().or(file.check_name),
        extensions: file
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
        lint_command: cli
            .lint_command
            .clone()
            .or(file.lint_command)
            .unwrap_or_else(|| "eslint".to_string()),
        lint_args: file.lint_args.unwrap_or_default(),
        timeout_seconds: cli.timeout_seconds.or(file.timeout_seconds),
    }
}
