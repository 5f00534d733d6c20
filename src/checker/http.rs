// src/checker/http.rs
// =============================================================================
// This module checks if a resolved link is alive by making HTTP requests.
//
// Key functionality:
// - Makes an HTTP GET request per link
// - Maps the result: transport failure -> error, status >= 400 -> broken,
//   anything else -> ok
// - 429 Too Many Requests is never "broken": we wait out the cool-down and
//   send the same request again, as often as the RetryPolicy allows
// - Email links are never sent over the network
//
// Rust concepts:
// - async/await: For concurrent network I/O
// - loop + continue: retrying without recursion
// - Enums: To represent different link states
// =============================================================================

use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::markdown::{LinkTarget, ResolvedLink};
use crate::config::{AuditConfig, RetryPolicy};

// Represents the status of a link after checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Link answered with a status below 400
    Ok,
    /// Link answered with 400 or above
    Broken,
    /// Link was not checked (email addresses)
    Skipped,
    /// Request could not be completed
    Error,
}

// The result of checking one link
//
// status = Ok implies http_status < 400,
// status = Broken implies http_status >= 400
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: LinkStatus,
    /// Human-readable message shown in reports
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl ValidationOutcome {
    pub fn ok(url: &str, code: u16) -> Self {
        ValidationOutcome {
            status: LinkStatus::Ok,
            detail: format!("{} response: {}", url, code),
            http_status: Some(code),
        }
    }

    pub fn broken(url: &str, code: u16) -> Self {
        ValidationOutcome {
            status: LinkStatus::Broken,
            detail: format!("{} response: {}", url, code),
            http_status: Some(code),
        }
    }

    pub fn skipped(target: &str) -> Self {
        ValidationOutcome {
            status: LinkStatus::Skipped,
            detail: format!("{} is not URL", target),
            http_status: None,
        }
    }

    pub fn error(detail: impl Into<String>, http_status: Option<u16>) -> Self {
        ValidationOutcome {
            status: LinkStatus::Error,
            detail: detail.into(),
            http_status,
        }
    }

    /// Broken and error outcomes are failures; ok and skipped are not
    pub fn is_failure(&self) -> bool {
        matches!(self.status, LinkStatus::Broken | LinkStatus::Error)
    }
}

// Checks links, sharing one HTTP client (and its connection pool)
#[derive(Debug, Clone)]
pub struct LinkValidator {
    client: Client,
    retry: RetryPolicy,
}

impl LinkValidator {
    pub fn new(config: &AuditConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5)) // Follow up to 5 redirects
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(LinkValidator {
            client,
            retry: config.retry,
        })
    }

    /// Checks a classified link. Emails are answered without any request.
    pub async fn validate(&self, link: &ResolvedLink) -> ValidationOutcome {
        match &link.target {
            LinkTarget::NotUrl => ValidationOutcome::skipped(&link.raw.target),
            LinkTarget::Url(url) => self.check_url(url).await,
        }
    }

    /// GETs the URL, waiting out 429 responses according to the retry policy
    pub async fn check_url(&self, url: &str) -> ValidationOutcome {
        let mut retries: u32 = 0;

        loop {
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => return categorize_error(e),
            };

            let status = response.status();
            // We only need the status line, let the body go
            drop(response);

            if status != StatusCode::TOO_MANY_REQUESTS {
                debug!("{} -> {}", url, status.as_u16());
                return analyze_status(url, status);
            }

            if !self.retry.allows_retry(retries) {
                return ValidationOutcome::error(
                    format!("{} still rate limited after {} retries", url, retries),
                    Some(status.as_u16()),
                );
            }

            retries += 1;
            warn!(
                "{} is rate limited, retrying in {} (retry {})",
                url,
                format_cooldown(self.retry.cooldown),
                retries
            );
            tokio::time::sleep(self.retry.cooldown).await;
        }
    }
}

// Status codes below 400 are fine (redirects were already followed)
fn analyze_status(url: &str, status: StatusCode) -> ValidationOutcome {
    if status.as_u16() >= 400 {
        ValidationOutcome::broken(url, status.as_u16())
    } else {
        ValidationOutcome::ok(url, status.as_u16())
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(error: reqwest::Error) -> ValidationOutcome {
    let error_string = error.to_string();

    let reason = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if error_string.contains("dns") {
            "could not resolve hostname".to_string()
        } else {
            format!("connection failed: {}", error_string)
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    };

    ValidationOutcome::error(format!("Couldn't reach URL: {}", reason), None)
}

fn format_cooldown(cooldown: Duration) -> String {
    if cooldown.as_secs() > 0 {
        format!("{}s", cooldown.as_secs())
    } else {
        format!("{}ms", cooldown.as_millis())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a loop instead of calling check_url again?
//    - A recursive async fn needs boxing and grows with every retry
//    - A loop keeps one stack frame no matter how long we are rate limited
//
// 2. Why drop(response)?
//    - We only look at the status code
//    - Dropping early releases the connection back to the pool
//
// 3. What is Option<u32> for max_retries?
//    - None = no limit, Some(n) = give up after n retries
//    - See RetryPolicy::allows_retry in config.rs
// -----------------------------------------------------------------------------
