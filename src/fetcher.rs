//! Single-request HTTP fetching with outcome classification.
//!
//! Every request made by the crawler goes through [`Fetch::fetch`]. Failures
//! never escape as errors: they come back as [`FetchOutcome`] values so the
//! caller can log them and carry on with sibling requests.

use std::time::Duration;

use reqwest::header::{REFERER, USER_AGENT};

use crate::config::SiteConfig;
use crate::error::Result;
use crate::types::QuestionId;

/// Fixed header set sent with every request for one question
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHeaders {
    /// `user-agent` header value
    pub user_agent: String,
    /// `referer` header value
    pub referer: String,
}

impl RequestHeaders {
    /// Headers for requests made on behalf of `id`
    pub fn for_question(site: &SiteConfig, id: &QuestionId) -> Self {
        Self {
            user_agent: site.user_agent.clone(),
            referer: site.referer(id),
        }
    }
}

/// Classified result of one GET request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response; the full body
    Success(Vec<u8>),
    /// Non-2xx response status
    HttpError(u16),
    /// The request never produced a response (DNS, connect, timeout, body read)
    TransportError(String),
}

impl FetchOutcome {
    /// Whether the request succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Body on success, a human-readable failure description otherwise
    pub fn into_body(self) -> std::result::Result<Vec<u8>, String> {
        match self {
            FetchOutcome::Success(body) => Ok(body),
            FetchOutcome::HttpError(status) => Err(format!("HTTP status {}", status)),
            FetchOutcome::TransportError(cause) => Err(cause),
        }
    }
}

/// Abstraction over HTTP GET, enabling testability.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Perform one GET of `url` with `headers` and the given query parameters
    async fn fetch(
        &self,
        url: &str,
        headers: &RequestHeaders,
        query: &[(String, String)],
    ) -> FetchOutcome;
}

/// Production [`Fetch`] backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher; `timeout` bounds each whole request when set
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &RequestHeaders,
        query: &[(String, String)],
    ) -> FetchOutcome {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, headers.user_agent.as_str())
            .header(REFERER, headers.referer.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::TransportError(describe_transport_error(url, &e)),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "non-success response");
            return FetchOutcome::HttpError(status.as_u16());
        }

        match response.bytes().await {
            Ok(body) => FetchOutcome::Success(body.to_vec()),
            Err(e) => FetchOutcome::TransportError(format!(
                "failed to read response body from '{}': {}",
                url, e
            )),
        }
    }
}

fn describe_transport_error(url: &str, e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout fetching '{}'", url)
    } else if e.is_connect() {
        format!("connection failed for '{}': {}", url, e)
    } else {
        format!("failed to fetch '{}': {}", url, e)
    }
}
