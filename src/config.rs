// src/config.rs
// =============================================================================
// Runtime configuration for an audit run.
//
// Everything the workers need to know (where archives go, how to behave when a
// host rate-limits us, how long to wait for a link) lives in one AuditConfig
// value. main.rs builds it from the CLI flags and hands it to the
// FleetCoordinator, which shares it with every RepositoryProcessor.
//
// Rust concepts:
// - Default trait: Sensible defaults in one place
// - Option<u32>: "no limit" is None, not a magic number
// - Duration: Type-safe time spans
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

/// Name of the directory (under the working directory) that holds archives.
pub const DEFAULT_ARCHIVE_DIR: &str = ".archives";

/// Cool-down after an HTTP 429 before the same request is sent again.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Per-request timeout for link checks.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How many links of a single file are checked at once.
pub const DEFAULT_LINK_CONCURRENCY: usize = 4;

// What to do when a server answers 429 Too Many Requests
//
// The default waits DEFAULT_COOLDOWN and tries again forever. Setting
// max_retries turns that into a bounded policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How long to sleep before retrying a rate-limited request
    pub cooldown: Duration,
    /// None = retry until the server stops answering 429
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    /// Returns true if another attempt is allowed after `retries_so_far` retries
    pub fn allows_retry(&self, retries_so_far: u32) -> bool {
        match self.max_retries {
            Some(max) => retries_so_far < max,
            None => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            cooldown: DEFAULT_COOLDOWN,
            max_retries: None,
        }
    }
}

// The configuration value threaded through the coordinator and processors
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Root directory for downloaded archives, partitioned by repository name
    pub archive_root: PathBuf,
    /// Rate-limit handling for link checks
    pub retry: RetryPolicy,
    /// Timeout for a single link check
    pub request_timeout: Duration,
    /// Links checked concurrently inside one markdown file
    pub link_concurrency: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl AuditConfig {
    /// Creates a config with defaults and the given archive root
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        AuditConfig {
            archive_root: archive_root.into(),
            ..AuditConfig::default()
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            archive_root: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            link_concurrency: DEFAULT_LINK_CONCURRENCY,
            user_agent: default_user_agent(),
        }
    }
}

/// `<crate>/<version>`, GitHub refuses requests without a User-Agent
pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
