// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Example:
//   link-auditor --username octo
//   link-auditor -u octo -r docs --output cli
//   link-auditor -u octo --filename audit.md --max-retries 5
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - ValueEnum: an enum clap can parse from a string ("cli" / "file")
// - Option<T>: flags the user may leave out
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::{
    AuditConfig, RetryPolicy, DEFAULT_ARCHIVE_DIR, DEFAULT_COOLDOWN,
    DEFAULT_LINK_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT,
};
use crate::github::DEFAULT_API_URL;

// Where the report goes
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// Print to the terminal
    Cli,
    /// Write to --filename in the current directory
    File,
}

#[derive(Parser, Debug)]
#[command(
    name = "link-auditor",
    version,
    about = "Audit the markdown links of a GitHub account's repositories",
    long_about = "link-auditor downloads every public repository of a GitHub account, \
                  checks every link in its markdown files, and reports the broken ones."
)]
pub struct Cli {
    /// GitHub account name (nothing happens without it)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Audit only this repository of the account
    #[arg(short, long)]
    pub repository: Option<String>,

    /// Output target: cli or file
    #[arg(short, long, value_enum, default_value_t = OutputTarget::File)]
    pub output: OutputTarget,

    /// Report file name (a .md name gets markdown-escaped link text)
    #[arg(short, long, default_value = "REPORT.md")]
    pub filename: PathBuf,

    /// Write the report as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// Directory for downloaded archives (default: ./.archives)
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Seconds to wait after an HTTP 429 before retrying
    #[arg(long, default_value_t = DEFAULT_COOLDOWN.as_secs())]
    pub cooldown_secs: u64,

    /// Give up on a rate-limited link after this many retries (default: never)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Links of one file checked at the same time
    #[arg(long, default_value_t = DEFAULT_LINK_CONCURRENCY)]
    pub link_concurrency: usize,

    /// Timeout for a single link check, in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

impl Cli {
    /// Builds the run configuration, resolving relative paths against `cwd`
    pub fn audit_config(&self, cwd: &Path) -> AuditConfig {
        let archive_root = self
            .archive_dir
            .clone()
            .map(|dir| cwd.join(dir))
            .unwrap_or_else(|| cwd.join(DEFAULT_ARCHIVE_DIR));

        AuditConfig {
            retry: RetryPolicy {
                cooldown: Duration::from_secs(self.cooldown_secs),
                max_retries: self.max_retries,
            },
            request_timeout: Duration::from_secs(self.timeout_secs),
            link_concurrency: self.link_concurrency.max(1),
            ..AuditConfig::new(archive_root)
        }
    }

    /// Path of the report file
    pub fn report_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.filename)
    }
}
