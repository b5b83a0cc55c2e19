use clap::Parser;

/// prlint — lint the files changed in a pull request and report a check run
#[derive(Parser, Debug, Clone)]
#[command(name = "prlint", version, about)]
pub struct Cli {
    /// Pull request number to lint
    #[arg(long)]
    pub pr: Option<u64>,

    /// Repository in owner/name form (default: $GITHUB_REPOSITORY)
    #[arg(long)]
    pub repo: Option<String>,

    /// Repository access token (default: $GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Reuse an in-progress check run with this exact name instead of creating one
    #[arg(long)]
    pub check_name: Option<String>,

    /// Lint command to invoke over the changed files (default: eslint)
    #[arg(long)]
    pub lint_command: Option<String>,

    /// Lint command timeout in seconds
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Path to config file (default: prlint.toml if present)
    #[arg(long)]
    pub config: Option<String>,
}
