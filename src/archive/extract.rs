// src/archive/extract.rs
// =============================================================================
// This module pulls markdown files out of a repository snapshot archive.
//
// GitHub wraps every snapshot in one folder named <repo>-<branch>/, so the
// entry "docs-main/guide/setup.md" is the repository file "guide/setup.md".
//
// Failure modes:
// - archive can't be opened       -> AuditError::Archive (whole repo fails)
// - one markdown entry unreadable -> AuditError::FileRead handed over in place
//                                    of that file, others continue
// - non-markdown entries          -> skipped silently
//
// The zip reader is synchronous. It runs on tokio's blocking pool and hands
// files to the async side through a channel as soon as each one is read.
// =============================================================================

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zip::ZipArchive;

use crate::error::AuditError;

// One markdown file from the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownFile {
    /// Path relative to the repository root, e.g. "docs/guide.md"
    pub path: String,
    pub content: String,
}

/// One markdown file, or the reason it could not be read
pub type MarkdownEntry = Result<MarkdownFile, AuditError>;

/// Strips the synthetic top-level folder from an archive entry name.
pub fn repository_path(entry_name: &str) -> &str {
    entry_name
        .split_once('/')
        .map_or(entry_name, |(_, rest)| rest)
}

fn is_markdown(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(OsStr::to_str)
        .map_or(false, |ext| ext.eq_ignore_ascii_case("md"))
}

/// Reads the markdown entries of a zip archive one by one (blocking).
///
/// `on_entry` sees every markdown file or per-file error in archive order and
/// returns false to stop early. Only an archive that can't be opened is an Err.
pub fn read_markdown_files<F>(archive_path: &Path, mut on_entry: F) -> Result<(), AuditError>
where
    F: FnMut(MarkdownEntry) -> bool,
{
    let archive_error = |source: zip::result::ZipError| AuditError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(|e| archive_error(e.into()))?;
    let mut archive = ZipArchive::new(file).map_err(archive_error)?;

    let mut seen = 0;
    for index in 0..archive.len() {
        // Look at the header first, without decompressing anything
        let (path, is_dir) = match archive.by_index_raw(index) {
            Ok(entry) => (repository_path(entry.name()).to_string(), entry.is_dir()),
            Err(e) => {
                let error = AuditError::FileRead {
                    path: format!("entry #{}", index),
                    reason: e.to_string(),
                };
                if !on_entry(Err(error)) {
                    break;
                }
                continue;
            }
        };

        if is_dir || path.is_empty() || !is_markdown(&path) {
            continue;
        }

        seen += 1;
        let entry = match read_entry(&mut archive, index) {
            Ok(content) => Ok(MarkdownFile { path, content }),
            Err(reason) => Err(AuditError::FileRead { path, reason }),
        };
        if !on_entry(entry) {
            break;
        }
    }

    debug!("{}: {} markdown entries", archive_path.display(), seen);
    Ok(())
}

// Markdown is text, but a stray invalid byte shouldn't lose the whole file
fn read_entry(archive: &mut ZipArchive<File>, index: usize) -> Result<String, String> {
    let mut entry = archive.by_index(index).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).map_err(|e| e.to_string())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Markdown files handed over from the blocking zip reader as they are read.
///
/// The reader runs one file ahead of the consumer, so each file is checked
/// while the archive is still open and the next one is being decompressed.
pub struct MarkdownStream {
    entries: mpsc::Receiver<MarkdownEntry>,
    reader: JoinHandle<Result<(), AuditError>>,
    archive_path: PathBuf,
}

impl MarkdownStream {
    /// Next markdown file or per-file error; None once the archive is done
    pub async fn next(&mut self) -> Option<MarkdownEntry> {
        self.entries.recv().await
    }

    /// Stops reading and reports whether the archive itself could be opened
    pub async fn finish(self) -> Result<(), AuditError> {
        let MarkdownStream {
            entries,
            reader,
            archive_path,
        } = self;
        // A closed channel makes the reader stop at its next entry
        drop(entries);

        match reader.await {
            Ok(result) => result,
            Err(join_error) => Err(AuditError::Archive {
                path: archive_path,
                source: std::io::Error::new(std::io::ErrorKind::Other, join_error.to_string())
                    .into(),
            }),
        }
    }
}

/// Starts reading `archive_path` on the blocking pool.
pub fn stream_markdown(archive_path: PathBuf) -> MarkdownStream {
    let (tx, entries) = mpsc::channel(1);
    let path = archive_path.clone();
    let reader = tokio::task::spawn_blocking(move || {
        read_markdown_files(&path, |entry| tx.blocking_send(entry).is_ok())
    });

    MarkdownStream {
        entries,
        reader,
        archive_path,
    }
}

/// Removes a repository's archive directory. Failures are only logged.
pub async fn cleanup(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Couldn't clean up {}: {}", dir.display(), e);
        }
    }
}
