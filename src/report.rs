// src/report.rs
// =============================================================================
// This module turns repository reports into text.
//
// Layout per repository:
//
//   ## [name](https://github.com/octo/name)
//    - [INF] No inactive/broken links were found.     <- when a state is set
//
//   * https://github.com/octo/name/blob/main/docs/guide.md
//
//   | URL | State |
//   | --- | --- |
//   | [old](http://dead.example/x) | [ERR] http://dead.example/x response: 404 |
//
// Healthy files produce no rows at all: silence means success.
//
// Two layouts differ only in how the literal link is written. In a .md
// report it is escaped (\[old](...)) so it shows as text instead of
// becoming a clickable link; on the console it is left as-is.
// =============================================================================

use std::io::{self, Write};
use std::path::Path;

use crate::audit::{RepositoryReport, RepositoryState};
use crate::checker::ResolvedLink;

// How literal links are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Markdown file: link text escaped
    Markdown,
    /// Console or any other file: link text raw
    Plain,
}

impl Layout {
    /// Markdown for "*.md" file names (any case), Plain otherwise
    pub fn for_file(path: &Path) -> Layout {
        let is_md = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("md"));
        if is_md {
            Layout::Markdown
        } else {
            Layout::Plain
        }
    }

    fn link_text(self, link: &ResolvedLink) -> String {
        match self {
            Layout::Markdown => format!("\\{}", link.raw.text),
            Layout::Plain => link.raw.text.clone(),
        }
    }
}

/// Writes the reports as JSON or as text, whichever was asked for
pub fn write_reports<W: Write>(
    out: &mut W,
    reports: &[RepositoryReport],
    layout: Layout,
    json: bool,
) -> io::Result<()> {
    if json {
        render_json(out, reports)
    } else {
        render(out, reports, layout)
    }
}

/// Writes every report, in the order given
pub fn render<W: Write>(out: &mut W, reports: &[RepositoryReport], layout: Layout) -> io::Result<()> {
    if reports.is_empty() {
        writeln!(out, "[INF] No repositories were found")?;
        return Ok(());
    }

    for report in reports {
        render_repository(out, report, layout)?;
    }
    writeln!(out)?;
    out.flush()
}

/// Writes the reports as pretty-printed JSON
pub fn render_json<W: Write>(out: &mut W, reports: &[RepositoryReport]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, reports)?;
    writeln!(out)?;
    out.flush()
}

fn render_repository<W: Write>(
    out: &mut W,
    report: &RepositoryReport,
    layout: Layout,
) -> io::Result<()> {
    let repo = &report.repository;
    write!(out, "\n## [{}]({})", repo.name, repo.html_url)?;

    match &report.state {
        Some(RepositoryState::Failed(message)) => {
            // A failed repository has nothing else worth showing
            write!(out, " - [ERR] {}", message)?;
            return Ok(());
        }
        Some(RepositoryState::Info(message)) => write!(out, " - [INF] {}", message)?,
        None => {}
    }

    for error in &report.file_errors {
        write!(out, "\n - [ERR] {}", error)?;
    }

    let web_root = repo.web_root();
    for file in &report.files {
        write!(out, "\n* {}/{}\n\n| URL | State |\n| --- | --- |\n", web_root, file.path)?;
        for link in &file.links {
            let state = link
                .outcome
                .as_ref()
                .map_or_else(|| "[ERR] not checked".to_string(), |o| format!("[ERR] {}", o.detail));
            writeln!(out, "| {} | {} |", layout.link_text(link), state)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{FileReport, NO_BROKEN_LINKS};
    use crate::checker::{LinkKind, LinkTarget, RawLink, ValidationOutcome};
    use crate::github::RepositoryRef;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("docs", "https://github.com/octo/docs", "main")
    }

    fn broken_report() -> RepositoryReport {
        let url = "http://dead.example/x";
        let mut report = RepositoryReport::new(repo());
        report.all_links_ok = false;
        report.files.push(FileReport {
            path: "guide/README.md".to_string(),
            links: vec![ResolvedLink {
                raw: RawLink {
                    text: format!("[old]({})", url),
                    label: "old".to_string(),
                    target: url.to_string(),
                },
                kind: LinkKind::AbsoluteUrl,
                target: LinkTarget::Url(url.to_string()),
                file: "guide/README.md".to_string(),
                outcome: Some(ValidationOutcome::broken(url, 404)),
            }],
        });
        report
    }

    fn rendered(reports: &[RepositoryReport], layout: Layout) -> String {
        let mut out = Vec::new();
        render(&mut out, reports, layout).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_layout_for_file() {
        assert_eq!(Layout::for_file(Path::new("REPORT.md")), Layout::Markdown);
        assert_eq!(Layout::for_file(Path::new("out/Report.MD")), Layout::Markdown);
        assert_eq!(Layout::for_file(Path::new("report.txt")), Layout::Plain);
        assert_eq!(Layout::for_file(Path::new("report")), Layout::Plain);
    }

    #[test]
    fn test_broken_links_table() {
        let text = rendered(&[broken_report()], Layout::Plain);
        assert!(text.contains("## [docs](https://github.com/octo/docs)"));
        assert!(text.contains("* https://github.com/octo/docs/blob/main/guide/README.md"));
        assert!(text.contains("| URL | State |"));
        assert!(text.contains(
            "| [old](http://dead.example/x) | [ERR] http://dead.example/x response: 404 |"
        ));
    }

    #[test]
    fn test_markdown_layout_escapes_link_text() {
        let text = rendered(&[broken_report()], Layout::Markdown);
        assert!(text.contains("| \\[old](http://dead.example/x) |"));

        // Everything else is identical
        let plain = rendered(&[broken_report()], Layout::Plain);
        assert_eq!(text.replace("\\[", "["), plain);
    }

    #[test]
    fn test_failed_repository_shows_only_error() {
        let report = RepositoryReport::failed(repo(), "Couldn't download x: HTTP 404");
        let text = rendered(&[report], Layout::Plain);
        assert!(text.contains("## [docs](https://github.com/octo/docs) - [ERR] Couldn't download x: HTTP 404"));
        assert!(!text.contains("| URL | State |"));
    }

    #[test]
    fn test_healthy_repository_has_no_rows() {
        let mut report = RepositoryReport::new(repo());
        report.state = Some(RepositoryState::Info(NO_BROKEN_LINKS.to_string()));
        let text = rendered(&[report], Layout::Plain);
        assert!(text.contains("- [INF] No inactive/broken links were found."));
        assert!(!text.contains('|'));
    }

    #[test]
    fn test_file_errors_are_listed() {
        let mut report = RepositoryReport::new(repo());
        report.file_errors.push("Couldn't load docs/a.md: bad entry".to_string());
        let text = rendered(&[report], Layout::Plain);
        assert!(text.contains(" - [ERR] Couldn't load docs/a.md: bad entry"));
    }

    #[test]
    fn test_no_repositories() {
        assert_eq!(rendered(&[], Layout::Plain), "[INF] No repositories were found\n");
    }

    #[test]
    fn test_no_repositories_as_json_is_empty_array() {
        let mut out = Vec::new();
        write_reports(&mut out, &[], Layout::Markdown, true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[]\n");

        let mut out = Vec::new();
        write_reports(&mut out, &[], Layout::Markdown, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[INF] No repositories were found\n");
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        render_json(&mut out, &[broken_report()]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["repository"]["name"], "docs");
        assert_eq!(value[0]["all_links_ok"], false);
        assert_eq!(value[0]["files"][0]["links"][0]["outcome"]["status"], "broken");
        assert_eq!(value[0]["files"][0]["links"][0]["outcome"]["http_status"], 404);
    }
}
