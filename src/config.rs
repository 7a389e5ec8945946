//! Command-line and environment configuration.

use clap::Parser;
use std::path::PathBuf;

/// School administration sidecar. Speaks JSON lines on stdin/stdout.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "schoold")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Workspace directory to open at start-up
    #[arg(long, env = "SCHOOLD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter, either a bare level (`debug`) or a full directive
    #[arg(long, env = "SCHOOLD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "SCHOOLD_LOG_JSON")]
    pub log_json: bool,
}
