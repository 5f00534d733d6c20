// src/audit/fleet.rs
// =============================================================================
// This module audits many repositories at once.
//
// One tokio task per repository, all started together. They share:
// - one RepositoryProcessor (config + HTTP clients) behind an Arc
// - one PhaseBarrier so that all downloads finish before any link is checked
//
// Results come back in completion order, not in the order of the input list.
//
// Rust concepts:
// - JoinSet: spawn a group of tasks and collect them as they finish
// - catch_unwind: turn a panicking worker into a failed report
// =============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{error, info};
use tokio::task::JoinSet;

use super::barrier::PhaseBarrier;
use super::processor::{RepositoryProcessor, RepositoryReport};
use crate::checker::Classifier;
use crate::config::AuditConfig;
use crate::github::RepositoryRef;

pub struct FleetCoordinator {
    processor: Arc<RepositoryProcessor>,
}

impl FleetCoordinator {
    pub fn new(config: Arc<AuditConfig>, classifier: Classifier) -> reqwest::Result<Self> {
        Ok(FleetCoordinator::with_processor(RepositoryProcessor::new(
            config, classifier,
        )?))
    }

    pub fn with_processor(processor: RepositoryProcessor) -> Self {
        FleetCoordinator {
            processor: Arc::new(processor),
        }
    }

    /// Audits every repository concurrently and returns all reports
    pub async fn run(&self, repos: Vec<RepositoryRef>) -> Vec<RepositoryReport> {
        self.run_with(repos, |_| {}).await
    }

    /// Like `run`, calling `on_report` for each report as soon as it completes
    pub async fn run_with<F>(&self, repos: Vec<RepositoryRef>, mut on_report: F) -> Vec<RepositoryReport>
    where
        F: FnMut(&RepositoryReport),
    {
        let barrier = PhaseBarrier::new(repos.len());
        let mut tasks = JoinSet::new();
        let total = repos.len();

        for (index, repo) in repos.into_iter().enumerate() {
            info!("{}: {}", index, repo.html_url);
            let processor = Arc::clone(&self.processor);
            let arrival = barrier.arrival();

            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(processor.process(&repo, arrival))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(report) => report,
                    Err(_) => {
                        error!("{}: worker panicked", repo.name);
                        RepositoryReport::failed(repo, "Audit aborted unexpectedly")
                    }
                }
            });
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(report) => {
                    on_report(&report);
                    reports.push(report);
                }
                Err(e) => error!("repository worker failed: {}", e),
            }
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RepositoryState;
    use crate::checker::StaticResolver;
    use crate::test_support::zip_bytes;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn coordinator(root: &std::path::Path) -> FleetCoordinator {
        let mut config = AuditConfig::new(root);
        config.retry.cooldown = Duration::from_millis(5);
        FleetCoordinator::new(
            Arc::new(config),
            Classifier::new(Arc::new(StaticResolver::default())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fleet_collects_every_report() {
        let server = MockServer::start_async().await;

        // "healthy" downloads fine; "gone" fails its download
        let readme = format!("[ok]({})", server.url("/ok"));
        let archive = zip_bytes(&[("healthy-main/README.md", readme.as_str())]);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/octo/healthy/archive/refs/heads/main.zip");
                then.status(200)
                    .body(archive)
                    .delay(Duration::from_millis(100));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/octo/gone/archive/refs/heads/main.zip");
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ok");
                then.status(200);
            })
            .await;

        let repos = vec![
            RepositoryRef::new("healthy", server.url("/octo/healthy"), "main"),
            RepositoryRef::new("gone", server.url("/octo/gone"), "main"),
        ];

        let root = tempfile::tempdir().unwrap();
        let mut seen = Vec::new();
        let reports = tokio::time::timeout(
            Duration::from_secs(10),
            coordinator(root.path()).run_with(repos, |r| seen.push(r.repository.name.clone())),
        )
        .await
        .expect("a failed download must not block its siblings");

        assert_eq!(reports.len(), 2);
        assert_eq!(seen.len(), 2);

        let healthy = reports.iter().find(|r| r.repository.name == "healthy").unwrap();
        assert!(healthy.all_links_ok);
        assert!(!healthy.has_failures());

        let gone = reports.iter().find(|r| r.repository.name == "gone").unwrap();
        assert!(matches!(gone.state, Some(RepositoryState::Failed(_))));
        assert!(gone.files.is_empty());
    }

    #[tokio::test]
    async fn test_downloads_finish_before_validation() {
        let server = MockServer::start_async().await;

        let readme = format!("[probe]({})", server.url("/probe"));
        let fast_archive = zip_bytes(&[("fast-main/README.md", readme.as_str())]);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/octo/fast/archive/refs/heads/main.zip");
                then.status(200).body(fast_archive);
            })
            .await;
        let slow = server
            .mock_async(|when, then| {
                when.method(GET).path("/octo/slow/archive/refs/heads/main.zip");
                then.status(200)
                    .body(zip_bytes(&[("slow-main/notes.txt", "")]))
                    .delay(Duration::from_millis(300));
            })
            .await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET).path("/probe");
                then.status(200);
            })
            .await;

        let repos = vec![
            RepositoryRef::new("fast", server.url("/octo/fast"), "main"),
            RepositoryRef::new("slow", server.url("/octo/slow"), "main"),
        ];
        let root = tempfile::tempdir().unwrap();
        let fleet = coordinator(root.path());
        let run = fleet.run(repos);
        tokio::pin!(run);

        // While the slow archive is still downloading, the fast repository
        // must not have started checking links
        tokio::select! {
            _ = &mut run => panic!("fleet finished before the slow download"),
            _ = tokio::time::sleep(Duration::from_millis(150)) => {}
        }
        assert_eq!(probe.hits_async().await, 0);

        let reports = run.await;
        assert_eq!(reports.len(), 2);
        assert_eq!(slow.hits_async().await, 1);
        assert_eq!(probe.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_empty_fleet() {
        let root = tempfile::tempdir().unwrap();
        assert!(coordinator(root.path()).run(Vec::new()).await.is_empty());
    }
}
