// src/github/repos.rs
// =============================================================================
// This module lists the repositories of a GitHub account.
//
// Two modes:
// - account only:   GET /users/<account>/repos, skipping forks, disabled,
//                   archived and empty repositories
// - account + name: GET /repos/<account>/<name>, a single repository
//
// Every repository becomes a RepositoryRef, which also knows where its
// snapshot archive lives and how relative links inside it resolve.
//
// Rust concepts:
// - serde Deserialize: Turn GitHub's JSON into Rust structs
// - #[serde(default)]: Missing JSON fields get a default value
// - Iterator filter/map: Select and convert in one pass
// =============================================================================

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Default base URL of the GitHub REST API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

// The part of GitHub's repository JSON we care about
#[derive(Debug, Clone, Deserialize)]
struct GithubRepository {
    name: String,
    html_url: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    size: u64,
}

impl GithubRepository {
    // Only active, non-forked, non-empty repositories are worth auditing
    fn is_auditable(&self) -> bool {
        !self.fork && !self.disabled && !self.archived && self.size > 0
    }

    fn into_ref(self) -> RepositoryRef {
        let branch = self.default_branch.unwrap_or_else(|| "main".to_string());
        RepositoryRef::new(self.name, self.html_url, branch)
    }
}

// Identity of a repository to audit
//
// Immutable once created; the coordinator owns it and each processor
// borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    pub html_url: String,
    pub default_branch: String,
    /// <html_url>/archive/refs/heads/<default_branch>.zip
    pub archive_url: String,
}

impl RepositoryRef {
    pub fn new(
        name: impl Into<String>,
        html_url: impl Into<String>,
        default_branch: impl Into<String>,
    ) -> Self {
        let html_url = html_url.into().trim_end_matches('/').to_string();
        let default_branch = default_branch.into();
        let archive_url = format!("{}/archive/refs/heads/{}.zip", html_url, default_branch);

        RepositoryRef {
            name: name.into(),
            html_url,
            default_branch,
            archive_url,
        }
    }

    /// Root that repository paths are resolved against:
    /// <html_url>/blob/<default_branch>
    pub fn web_root(&self) -> String {
        format!("{}/blob/{}", self.html_url, self.default_branch)
    }

    /// File name the archive is stored under
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.name)
    }
}

// Lists repositories for an account, or the single named repository
//
// Parameters:
//   client: reqwest HTTP client (must send a User-Agent for GitHub)
//   api_url: API base, e.g. "https://api.github.com"
//   account: GitHub user name
//   name: optional repository name
//
// A named repository that does not answer 200 yields an empty list.
pub async fn list_repositories(
    client: &Client,
    api_url: &str,
    account: &str,
    name: Option<&str>,
) -> Result<Vec<RepositoryRef>> {
    let api_url = api_url.trim_end_matches('/');

    match name {
        None => {
            let url = format!("{}/users/{}/repos", api_url, account);
            let repos: Vec<GithubRepository> = client
                .get(&url)
                .query(&[("type", "owner"), ("per_page", "100"), ("type", "public")])
                .send()
                .await
                .with_context(|| format!("Couldn't list repositories of {}", account))?
                .error_for_status()
                .with_context(|| format!("Couldn't list repositories of {}", account))?
                .json()
                .await
                .with_context(|| format!("Unexpected repository list for {}", account))?;

            Ok(repos
                .into_iter()
                .filter(GithubRepository::is_auditable)
                .map(GithubRepository::into_ref)
                .collect())
        }
        Some(name) => {
            let url = format!("{}/repos/{}/{}", api_url, account, name);
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("Couldn't fetch repository {}/{}", account, name))?;

            if response.status() != StatusCode::OK {
                return Ok(Vec::new());
            }

            let repo: GithubRepository = response
                .json()
                .await
                .with_context(|| format!("Unexpected repository data for {}/{}", account, name))?;
            Ok(vec![repo.into_ref()])
        }
    }
}
