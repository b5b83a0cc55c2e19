pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod lint;
pub mod orchestrator;
pub mod process;
pub mod report;
