// GitLab events client.
//
// Pages through `GET {api}/users/{id}/events?page=N&per_page=100&sort=asc`
// one request at a time, starting at page 1, and stops at the first empty page.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use backfill_common::types::RemoteEvent;

use super::{ActivitySource, FetchError, PER_PAGE};
use crate::config::GitlabConfig;

const USER_AGENT: &str = concat!("backfill/", env!("CARGO_PKG_VERSION"));
const TOKEN_HEADER: &str = "private-token";
/// Longest error body echoed back in `FetchError::Status`.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct GitlabClient {
    http: Client,
    events_url: Url,
    max_retries: u32,
    retry_backoff: Duration,
}

impl GitlabClient {
    pub fn new(config: &GitlabConfig) -> Result<Self, FetchError> {
        let events_url = events_url(&config.api_url, &config.user_id)?;

        let mut token = HeaderValue::from_str(config.token.trim()).map_err(|err| {
            debug!("invalid token header value: {err}");
            FetchError::InvalidToken
        })?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(TOKEN_HEADER), token);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            events_url,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        })
    }

    /// URL of one events page.
    pub fn page_url(&self, page: u32, after: Option<NaiveDate>) -> Url {
        let mut url = self.events_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("sort", "asc");
            if let Some(after) = after {
                query.append_pair("after", &after.format("%Y-%m-%d").to_string());
            }
        }
        url
    }

    /// All events, paging until the first empty page.
    pub async fn fetch_all(&self, after: Option<NaiveDate>) -> Result<Vec<RemoteEvent>, FetchError> {
        let mut events = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_page(page, after).await?;
            if batch.is_empty() {
                break;
            }
            info!("> Fetched page {page}");
            events.extend(batch);
            page += 1;
        }
        debug!(pages = page - 1, events = events.len(), "events feed exhausted");
        Ok(events)
    }

    /// One page, retrying transient failures with exponential backoff.
    pub async fn fetch_page(
        &self,
        page: u32,
        after: Option<NaiveDate>,
    ) -> Result<Vec<RemoteEvent>, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_page_once(page, after).await {
                Ok(events) => return Ok(events),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(page, attempt, ?delay, "GitLab request failed, retrying: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_page_once(
        &self,
        page: u32,
        after: Option<NaiveDate>,
    ) -> Result<Vec<RemoteEvent>, FetchError> {
        let url = self.page_url(page, after);
        debug!(%url, "requesting events page");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| FetchError::Transport { page, source })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized { status: status.as_u16() });
        }
        if !status.is_success() {
            return Err(FetchError::Status { page, status: status.as_u16(), body: truncate(body) });
        }

        parse_events_page(page, &body)
    }
}

impl ActivitySource for GitlabClient {
    fn fetch_events(
        &self,
        after: Option<NaiveDate>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteEvent>, FetchError>> + Send + '_>> {
        Box::pin(self.fetch_all(after))
    }
}

/// `{api_url}/users/{user_id}/events`, keeping any path prefix of `api_url`.
fn events_url(api_url: &str, user_id: &str) -> Result<Url, FetchError> {
    let mut url =
        Url::parse(api_url.trim()).map_err(|e| FetchError::InvalidUrl(format!("{api_url}: {e}")))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(format!("{api_url}: cannot be a base URL")))?
        .pop_if_empty()
        .push("users")
        .push(user_id.trim())
        .push("events");
    Ok(url)
}

/// Decode one page body: a JSON array of events, nothing else.
pub fn parse_events_page(page: u32, body: &str) -> Result<Vec<RemoteEvent>, FetchError> {
    let malformed = |reason: String| FetchError::MalformedResponse { page, reason };

    let value: Value =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(malformed(format!("expected a JSON array, got {}", json_kind(&other))))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<RemoteEvent>(item)
                .map_err(|e| malformed(format!("event #{index}: {e}")))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}
