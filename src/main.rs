// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. List the account's repositories through the GitHub API
// 3. Audit them all concurrently (download, extract, check links)
// 4. Write the report to the console or to a file
// 5. Exit with proper code (0 = success, 1 = broken links, 2 = error)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - Box<dyn Write>: one variable that can hold either stdout or a file
// =============================================================================

// Module declarations - tells Rust about our other source files
mod archive;       // src/archive/ - markdown extraction from zip archives
mod audit;         // src/audit/ - per-repository pipeline and the fleet
mod checker;       // src/checker/ - link parsing, classification, validation
mod cli;           // src/cli.rs - command-line parsing
mod config;        // src/config.rs - run configuration
mod error;         // src/error.rs - typed pipeline errors
mod github;        // src/github/ - GitHub API and archive downloads
mod report;        // src/report.rs - report rendering

#[cfg(test)]
mod test_support;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser; // Parser trait enables the parse() method
use log::{info, warn};

use audit::{FleetCoordinator, RepositoryReport, RepositoryState};
use checker::Classifier;
use cli::{Cli, OutputTarget};
use report::Layout;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level, e.g. RUST_LOG=debug
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns:
//   Ok(0) = no broken links (or nothing to do)
//   Ok(1) = broken links or failed repositories found
//   Err = unexpected error
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // Without an account there is nothing to audit
    let Some(account) = cli.username.as_deref() else {
        return Ok(0);
    };

    let cwd = std::env::current_dir().context("Couldn't determine the working directory")?;
    let config = cli.audit_config(&cwd);

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()?;
    let repos =
        github::list_repositories(&client, &cli.api_url, account, cli.repository.as_deref())
            .await?;

    let (mut sink, layout) = open_sink(&cli, &cwd)?;

    let reports = if repos.is_empty() {
        Vec::new()
    } else {
        eprintln!("Auditing {} repositories of {}...", repos.len(), account);
        let fleet = FleetCoordinator::new(Arc::new(config), Classifier::with_dns())?;
        fleet.run_with(repos, log_report).await
    };

    report::write_reports(&mut sink, &reports, layout, cli.json)?;

    if cli.output == OutputTarget::File {
        eprintln!("Report written to {}", cli.report_path(&cwd).display());
    }

    if reports.iter().any(RepositoryReport::has_failures) {
        Ok(1) // Exit code 1 = broken links found
    } else {
        Ok(0) // Exit code 0 = all good
    }
}

// Picks where the report goes and how literal links are written
fn open_sink(cli: &Cli, cwd: &std::path::Path) -> Result<(Box<dyn Write>, Layout)> {
    match cli.output {
        OutputTarget::Cli => Ok((Box::new(io::stdout().lock()), Layout::Plain)),
        OutputTarget::File => {
            let path = cli.report_path(cwd);
            let file = File::create(&path)
                .with_context(|| format!("Couldn't create report file {}", path.display()))?;
            Ok((Box::new(BufWriter::new(file)), Layout::for_file(&path)))
        }
    }
}

// Progress line for each finished repository
fn log_report(report: &RepositoryReport) {
    let name = &report.repository.name;
    if let Some(RepositoryState::Failed(message)) = &report.state {
        warn!("{}: {}", name, message);
    } else if report.has_failures() {
        warn!(
            "{}: {} failing link(s), {} unreadable file(s)",
            name,
            report.failing_link_count(),
            report.file_errors.len()
        );
    } else {
        info!("{}: done", name);
    }
}
