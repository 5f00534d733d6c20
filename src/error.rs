// src/error.rs
// =============================================================================
// Errors of the audit pipeline.
//
// Only three things can go wrong in a way that ends up as text in a report:
// - the archive could not be downloaded (fatal for that repository)
// - the archive could not be opened (fatal for that repository)
// - one markdown entry could not be read (recorded, siblings continue)
//
// Link-level problems (network failures, 404s, rate limiting) are not errors
// here: they are data, stored in a ValidationOutcome.
//
// Rust concepts:
// - thiserror: derive Display and Error for an enum
// - #[source]: keeps the underlying cause for error chains
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Request failed, status was not success, or the file could not be written
    #[error("Couldn't download {url}: {reason}")]
    Download { url: String, reason: String },

    /// The archive is missing, corrupt, or not a zip
    #[error("Couldn't open archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// One archive entry could not be read
    #[error("Couldn't load {path}: {reason}")]
    FileRead { path: String, reason: String },
}

impl AuditError {
    pub fn download(url: &str, reason: impl ToString) -> Self {
        AuditError::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_message() {
        let err = AuditError::download("https://github.com/a/b/archive.zip", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "Couldn't download https://github.com/a/b/archive.zip: HTTP 404"
        );
    }

    #[test]
    fn test_file_read_message() {
        let err = AuditError::FileRead {
            path: "docs/a.md".to_string(),
            reason: "invalid deflate stream".to_string(),
        };
        assert_eq!(err.to_string(), "Couldn't load docs/a.md: invalid deflate stream");
    }
}
