// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - markdown: Finds [label](target) links and classifies/resolves them
// - http: Makes HTTP requests to check if resolved links are alive
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

mod http;
mod markdown;

// Re-export public items from submodules
// This lets users write `checker::LinkValidator` instead of
// `checker::http::LinkValidator`
pub use http::LinkValidator;
pub use markdown::{find_links, Classifier, FileContext, ResolvedLink};

#[cfg(test)]
pub use http::{LinkStatus, ValidationOutcome};
#[cfg(test)]
pub use markdown::{LinkKind, LinkTarget, RawLink, StaticResolver};
