// src/github/mod.rs
// =============================================================================
// This module handles everything we get from GitHub.
//
// Currently implements:
// - Listing the repositories of an account (or one named repository)
// - Downloading a repository snapshot as a zip archive
//
// Archive URLs follow GitHub's convention:
//   <html_url>/archive/refs/heads/<default_branch>.zip
// =============================================================================

mod fetch;
mod repos;

pub use fetch::download_archive;
pub use repos::{list_repositories, RepositoryRef, DEFAULT_API_URL};
