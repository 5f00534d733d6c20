// src/audit/processor.rs
// =============================================================================
// This module audits one repository from start to finish.
//
// Phases:
//   Fetching   -> download the snapshot archive
//   (barrier)  -> wait until every repository finished downloading
//   Extracting -> read markdown files out of the archive one at a time
//   Validating -> classify and check every link of the file just read,
//                 then go back for the next file; delete the archive at the end
//   Done       -> summary state set, or broken links listed per file
//   Failed     -> download or archive error; nothing else runs
//
// Only failing links are kept. A file whose links are all fine leaves no
// trace in the report, and neither does a file without links.
//
// Rust concepts:
// - Arc: share one config and one HTTP client between all workers
// - futures::stream::buffered: check several links at once, results in order
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::barrier::Arrival;
use crate::archive::{self, MarkdownFile};
use crate::checker::{find_links, Classifier, FileContext, LinkValidator, ResolvedLink};
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::github::{download_archive, RepositoryRef};

/// Summary when a repository has no markdown files at all
pub const NO_MARKDOWN_LINKS: &str = "No markdown links were found.";
/// Summary when every link in every markdown file is fine
pub const NO_BROKEN_LINKS: &str = "No inactive/broken links were found.";

// Where a repository is in its pipeline (used for logging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Extracting,
    Validating,
    Done,
    Failed,
}

// The repository-level summary shown instead of per-file details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RepositoryState {
    /// Fatal error; the repository was not audited
    Failed(String),
    /// Informational summary (nothing to report)
    Info(String),
}

// Failing links of one markdown file, in source order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub links: Vec<ResolvedLink>,
}

// Everything we learned about one repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub repository: RepositoryRef,
    pub files: Vec<FileReport>,
    pub all_links_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RepositoryState>,
    /// Markdown entries that could not be read
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub file_errors: Vec<String>,
}

impl RepositoryReport {
    pub fn new(repository: RepositoryRef) -> Self {
        RepositoryReport {
            repository,
            files: Vec::new(),
            all_links_ok: true,
            state: None,
            file_errors: Vec::new(),
        }
    }

    /// A repository that could not be audited at all
    pub fn failed(repository: RepositoryRef, message: impl Into<String>) -> Self {
        let mut report = RepositoryReport::new(repository);
        report.fail(message);
        report
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.files.clear();
        self.file_errors.clear();
        self.state = Some(RepositoryState::Failed(message.into()));
    }

    /// True if anything in this report needs attention
    pub fn has_failures(&self) -> bool {
        matches!(self.state, Some(RepositoryState::Failed(_)))
            || !self.all_links_ok
            || !self.file_errors.is_empty()
    }

    /// Number of failing links across all files
    pub fn failing_link_count(&self) -> usize {
        self.files.iter().map(|f| f.links.len()).sum()
    }
}

// Runs the whole pipeline for one repository
pub struct RepositoryProcessor {
    config: Arc<AuditConfig>,
    download_client: Client,
    classifier: Classifier,
    validator: LinkValidator,
}

impl RepositoryProcessor {
    pub fn new(config: Arc<AuditConfig>, classifier: Classifier) -> reqwest::Result<Self> {
        // No overall timeout: archives can be large, only connecting is bounded
        let download_client = Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let validator = LinkValidator::new(&config)?;

        Ok(RepositoryProcessor {
            config,
            download_client,
            classifier,
            validator,
        })
    }

    // Directory holding this repository's archive (one per repository name)
    fn archive_dir(&self, repo: &RepositoryRef) -> PathBuf {
        self.config.archive_root.join(&repo.name)
    }

    /// Audits one repository. `arrival` is this worker's download-phase ticket.
    pub async fn process(&self, repo: &RepositoryRef, arrival: Arrival) -> RepositoryReport {
        let mut report = RepositoryReport::new(repo.clone());
        let dir = self.archive_dir(repo);

        debug!("{}: {:?}", repo.name, Phase::Fetching);
        let fetched = download_archive(
            &self.download_client,
            &repo.archive_url,
            &dir,
            &repo.archive_file_name(),
        )
        .await;

        let archive_path = match fetched {
            Ok(path) => {
                arrival.arrive_and_wait().await;
                path
            }
            Err(e) => {
                arrival.arrive();
                archive::cleanup(&dir).await;
                return self.finish_failed(report, e);
            }
        };

        // Each file is checked as soon as it comes out of the archive
        debug!("{}: {:?}", repo.name, Phase::Extracting);
        let web_root = repo.web_root();
        let mut markdown = archive::stream_markdown(archive_path);
        let mut markdown_files = 0;

        while let Some(entry) = markdown.next().await {
            match entry {
                Ok(file) => {
                    markdown_files += 1;
                    debug!("{}: {:?} {}", repo.name, Phase::Validating, file.path);
                    if let Some(file_report) = self.check_file(&file, &web_root).await {
                        report.all_links_ok = false;
                        report.files.push(file_report);
                    }
                }
                Err(e) => report.file_errors.push(e.to_string()),
            }
        }

        let opened = markdown.finish().await;
        archive::cleanup(&dir).await;
        if let Err(e) = opened {
            return self.finish_failed(report, e);
        }

        if markdown_files == 0 && report.file_errors.is_empty() {
            report.state = Some(RepositoryState::Info(NO_MARKDOWN_LINKS.to_string()));
        } else if report.all_links_ok && report.file_errors.is_empty() {
            report.state = Some(RepositoryState::Info(NO_BROKEN_LINKS.to_string()));
        }

        debug!("{}: {:?}", repo.name, Phase::Done);
        info!(
            "{}: {} markdown file(s), {} failing link(s)",
            repo.name,
            markdown_files,
            report.failing_link_count()
        );
        report
    }

    fn finish_failed(&self, mut report: RepositoryReport, error: AuditError) -> RepositoryReport {
        debug!("{}: {:?} ({})", report.repository.name, Phase::Failed, error);
        report.fail(error.to_string());
        report
    }

    /// Classifies and validates every link of one file.
    ///
    /// Returns None when the file has no failing links.
    pub async fn check_file(&self, file: &MarkdownFile, web_root: &str) -> Option<FileReport> {
        let links = find_links(&file.content);
        if links.is_empty() {
            return None;
        }

        let checks = links.into_iter().map(|raw| {
            let classifier = self.classifier.clone();
            let validator = self.validator.clone();
            let web_root = web_root.to_string();
            let file_path = file.path.clone();
            async move {
                let ctx = FileContext {
                    web_root: &web_root,
                    file_path: &file_path,
                };
                let mut link = classifier.classify(raw, ctx).await;
                link.outcome = Some(validator.validate(&link).await);
                link
            }
        });

        let failing: Vec<ResolvedLink> = stream::iter(checks)
            .buffered(self.config.link_concurrency.max(1))
            .filter(|link| {
                let failed = link.outcome.as_ref().map_or(false, |o| o.is_failure());
                futures::future::ready(failed)
            })
            .collect()
            .await;

        if failing.is_empty() {
            None
        } else {
            Some(FileReport {
                path: file.path.clone(),
                links: failing,
            })
        }
    }
}
