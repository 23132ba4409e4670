// Remote activity: the GitLab user events feed.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use thiserror::Error;

use backfill_common::types::RemoteEvent;

pub mod client;

pub use client::GitlabClient;

/// Events requested per page.
pub const PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid GitLab API URL: {0}")]
    InvalidUrl(String),

    #[error("GitLab token is not a valid header value")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("GitLab rejected the token (HTTP {status}); check GITLAB_PAT")]
    Unauthorized { status: u16 },

    #[error("GitLab returned HTTP {status} for events page {page}: {body}")]
    Status { page: u32, status: u16, body: String },

    #[error("request for events page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed events page {page}: {reason}")]
    MalformedResponse { page: u32, reason: String },
}

impl FetchError {
    /// Worth retrying: server-side failures, rate limiting, and transport errors.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Source of remote activity events, oldest first.
///
/// Production uses `GitlabClient`; tests inject a fixed list.
pub trait ActivitySource: Send + Sync {
    /// Every event of the feed, optionally bounded to those after `after`.
    fn fetch_events(
        &self,
        after: Option<NaiveDate>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteEvent>, FetchError>> + Send + '_>>;
}
