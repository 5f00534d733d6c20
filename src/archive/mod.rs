// src/archive/mod.rs
// =============================================================================
// This module reads repository snapshot archives.
//
// The archive is downloaded by github::download_archive; this module opens
// it, streams the markdown files inside, and removes the download afterwards.
// =============================================================================

mod extract;

pub use extract::{cleanup, stream_markdown, MarkdownFile};
