// src/checker/markdown.rs
// =============================================================================
// This module finds links in markdown text and decides what each one points to.
//
// Two steps:
// 1. find_links: match the markdown link grammar [label](target)
// 2. Classifier::classify: run the target through an ordered list of rules
//    and turn it into something we can check
//
// The rules, first match wins:
//   AbsoluteUrl  - http(s)://host/... is used as-is
//   Email        - mailto:... is never checked over the network
//   BareDomain   - example.com/page (no scheme) becomes http://example.com/page
//                  when the host resolves in DNS and the target is not a .md file
//   RelativePath - anything else is a path inside the repository
//
// Rust concepts:
// - Enums with methods: each rule is a variant that knows how to apply itself
// - Trait objects: DNS lookup sits behind HostResolver so tests can fake it
// - OnceLock: compile the regex once, reuse it for every file
// =============================================================================

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::http::ValidationOutcome;

// A link exactly as it appears in the markdown source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    /// The whole match, e.g. "[site](https://example.com)"
    pub text: String,
    /// Text between the square brackets (may be empty)
    pub label: String,
    /// Text between the parentheses, trimmed
    pub target: String,
}

// Which rule claimed a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    AbsoluteUrl,
    Email,
    BareDomain,
    RelativePath,
}

// What the validator should check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    /// A fully qualified URL
    Url(String),
    /// Not a URL at all (email addresses)
    NotUrl,
}

// A classified link, plus its validation outcome once it has been checked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub raw: RawLink,
    pub kind: LinkKind,
    pub target: LinkTarget,
    /// Path of the markdown file the link came from, relative to the repo root
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ValidationOutcome>,
}

// Where a link was found, needed to resolve relative paths
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    /// <repository HTML URL>/blob/<default branch>
    pub web_root: &'a str,
    /// e.g. "docs/guide.md"
    pub file_path: &'a str,
}

/// Answers "does this host name exist?" for the bare-domain rule.
///
/// A failed lookup is simply `false`, never an error.
pub trait HostResolver: Send + Sync {
    fn resolves<'a>(&'a self, host: &'a str) -> BoxFuture<'a, bool>;
}

/// Real DNS lookups through tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl HostResolver for DnsResolver {
    fn resolves<'a>(&'a self, host: &'a str) -> BoxFuture<'a, bool> {
        async move {
            // lookup_host needs a port; any port works for a name lookup
            match tokio::net::lookup_host((host, 80)).await {
                Ok(mut addrs) => addrs.next().is_some(),
                Err(_) => false,
            }
        }
        .boxed()
    }
}

/// A fixed set of host names that "resolve".
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    hosts: HashSet<String>,
}

impl StaticResolver {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticResolver {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }
}

impl HostResolver for StaticResolver {
    fn resolves<'a>(&'a self, host: &'a str) -> BoxFuture<'a, bool> {
        let known = self.hosts.contains(host);
        async move { known }.boxed()
    }
}

// The markdown link grammar: [label](target)
// Nested brackets inside the label are not supported.
fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The pattern is a constant, so a failure here is a programmer error
    PATTERN.get_or_init(|| {
        Regex::new(r"\[(?P<label>[^\[\]]*)\]\((?P<target>[^)\n]*)\)")
            .expect("markdown link pattern is a valid regex")
    })
}

/// Finds every `[label](target)` in the text, in source order.
pub fn find_links(markdown: &str) -> Vec<RawLink> {
    link_pattern()
        .captures_iter(markdown)
        .map(|caps| RawLink {
            text: caps[0].to_string(),
            label: caps["label"].to_string(),
            target: caps["target"].trim().to_string(),
        })
        .collect()
}

/// Lower-cased text after the last '.', ignoring any #fragment or ?query.
///
/// "docs/Page.MD" -> "md", "example.com/page" -> "com/page"
pub fn file_extension(target: &str) -> String {
    let path = target.split(['#', '?']).next().unwrap_or_default();
    path.rsplit('.').next().unwrap_or_default().to_lowercase()
}

/// Directory part of a repository-relative path, with a trailing slash.
///
/// "a/b.md" -> "a/", "README.md" -> ""
pub fn directory_of(file_path: &str) -> &str {
    match file_path.rfind('/') {
        Some(idx) => &file_path[..=idx],
        None => "",
    }
}

impl LinkKind {
    /// Rules in the order they are tried.
    pub const ORDER: [LinkKind; 4] = [
        LinkKind::AbsoluteUrl,
        LinkKind::Email,
        LinkKind::BareDomain,
        LinkKind::RelativePath,
    ];

    /// Applies this single rule. None means "not mine, try the next rule".
    pub async fn resolve(
        self,
        target: &str,
        ctx: FileContext<'_>,
        resolver: &dyn HostResolver,
    ) -> Option<LinkTarget> {
        match self {
            LinkKind::AbsoluteUrl => {
                is_absolute_url(target).then(|| LinkTarget::Url(target.to_string()))
            }
            LinkKind::Email => target.starts_with("mailto:").then_some(LinkTarget::NotUrl),
            LinkKind::BareDomain => {
                if target.contains(':') {
                    return None;
                }
                let host = target.split('/').next().unwrap_or_default();
                if host.is_empty() || file_extension(target) == "md" {
                    return None;
                }
                if resolver.resolves(host).await {
                    Some(LinkTarget::Url(format!("http://{}", target)))
                } else {
                    None
                }
            }
            LinkKind::RelativePath => Some(LinkTarget::Url(resolve_repository_path(target, ctx))),
        }
    }
}

// http:// or https:// followed by a parseable URL with a host
fn is_absolute_url(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return false;
    }
    match Url::parse(target) {
        Ok(url) => url.host_str().map_or(false, |host| !host.is_empty()),
        Err(_) => false,
    }
}

// "/docs/x.md" is relative to the web root, "x.md" to the file's directory
fn resolve_repository_path(target: &str, ctx: FileContext<'_>) -> String {
    if target.starts_with('/') {
        format!("{}{}", ctx.web_root, target)
    } else {
        format!("{}/{}{}", ctx.web_root, directory_of(ctx.file_path), target)
    }
}

/// Runs raw links through the ordered rules.
#[derive(Clone)]
pub struct Classifier {
    resolver: Arc<dyn HostResolver>,
}

impl Classifier {
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Classifier { resolver }
    }

    /// Classifier backed by real DNS
    pub fn with_dns() -> Self {
        Classifier::new(Arc::new(DnsResolver))
    }

    pub async fn classify(&self, raw: RawLink, ctx: FileContext<'_>) -> ResolvedLink {
        for kind in LinkKind::ORDER {
            if let Some(target) = kind.resolve(&raw.target, ctx, self.resolver.as_ref()).await {
                return ResolvedLink {
                    raw,
                    kind,
                    target,
                    file: ctx.file_path.to_string(),
                    outcome: None,
                };
            }
        }
        // RelativePath always matches, this is only reached if ORDER changes
        let target = LinkTarget::Url(resolve_repository_path(&raw.target, ctx));
        ResolvedLink {
            raw,
            kind: LinkKind::RelativePath,
            target,
            file: ctx.file_path.to_string(),
            outcome: None,
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a BoxFuture in HostResolver?
//    - Trait objects (dyn HostResolver) can't have plain async fns
//    - Returning a boxed future keeps the trait object-safe
//    - .boxed() comes from futures::FutureExt
//
// 2. What does bool::then do?
//    - cond.then(|| value) gives Some(value) if cond is true, else None
//    - then_some(value) is the same but takes the value directly
//
// 3. Why &'static Regex from a function?
//    - OnceLock builds the regex on first use and keeps it forever
//    - Every later call gets the same compiled pattern
// -----------------------------------------------------------------------------
