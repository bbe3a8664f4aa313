//! Paginated answer collection.
//!
//! Collection happens in three explicit steps:
//! 1. [`plan_windows`] partitions `[0, target)` into `(offset, limit)` windows
//! 2. [`window_jobs`] turns each window into a self-contained request description
//! 3. [`run_window_jobs`] submits the jobs to a bounded pool and waits for all
//!    of them, yielding one result per job in submission order
//!
//! A failed window is recorded and dropped from the aggregate; it never stops
//! its siblings. The caller gets whatever was actually obtained.

use futures::stream::{self, StreamExt};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetcher::{Fetch, RequestHeaders};
use crate::types::{Answer, AnswerLimit, PageWindow};

/// Request settings shared by every window of one question
#[derive(Clone, Debug)]
pub struct AnswersRequest {
    /// Answers endpoint URL
    pub url: String,
    /// Value of the `include` query parameter
    pub include: String,
    /// Fixed headers for the question
    pub headers: RequestHeaders,
}

/// One window, ready to submit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowJob {
    /// The slice this job fetches
    pub window: PageWindow,
    /// Complete query string for the request
    pub query: Vec<(String, String)>,
}

/// A window whose answers could not be obtained
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowFailure {
    /// The window that failed
    pub window: PageWindow,
    /// HTTP status, transport cause, or decode error
    pub reason: String,
}

/// Aggregated result of collecting a question's answers
#[derive(Clone, Debug, Default)]
pub struct AnswerCollection {
    /// Number of answers that were targeted
    pub target: usize,
    /// Answers obtained, ordered by window submission
    pub answers: Vec<Answer>,
    /// Windows that failed
    pub failed: Vec<WindowFailure>,
}

impl AnswerCollection {
    /// Targeted answers that were not obtained
    pub fn deficit(&self) -> usize {
        self.target.saturating_sub(self.answers.len())
    }
}

#[derive(Deserialize)]
struct AnswersPage {
    data: Vec<Answer>,
}

/// Partition the answers to fetch into windows of at most `page_size`.
///
/// The target is `total_available` capped by `limit`. Every window but the
/// last has exactly `page_size` answers; the last is shortened so that it
/// ends on the target.
pub fn plan_windows(
    total_available: usize,
    limit: AnswerLimit,
    page_size: usize,
) -> Result<Vec<PageWindow>> {
    if page_size == 0 {
        return Err(Error::config("page_size", "page_size must be at least 1"));
    }

    let target = limit.target(total_available);
    let mut windows = Vec::new();
    let mut offset = 0;
    loop {
        if offset == target {
            break;
        }
        if offset > target {
            tracing::error!(offset, target, "pagination walked past target");
            return Err(Error::PaginationOverrun { offset, target });
        }
        let window = PageWindow::new(offset, page_size.min(target - offset));
        offset = window.end();
        windows.push(window);
    }
    Ok(windows)
}

/// Describe the request for each window
pub fn window_jobs(include: &str, windows: &[PageWindow]) -> Vec<WindowJob> {
    windows
        .iter()
        .map(|window| WindowJob {
            window: *window,
            query: vec![
                ("include".to_string(), include.to_string()),
                ("platform".to_string(), "desktop".to_string()),
                ("sort_by".to_string(), "default".to_string()),
                ("limit".to_string(), window.limit.to_string()),
                ("offset".to_string(), window.offset.to_string()),
            ],
        })
        .collect()
}

async fn fetch_window(
    fetcher: &dyn Fetch,
    request: &AnswersRequest,
    job: &WindowJob,
) -> std::result::Result<Vec<Answer>, String> {
    tracing::debug!(window = %job.window, "fetching answers");
    let body = fetcher
        .fetch(&request.url, &request.headers, &job.query)
        .await
        .into_body()?;
    let page: AnswersPage = serde_json::from_slice(&body)
        .map_err(|e| format!("undecodable answers page: {}", e))?;
    Ok(page.data)
}

/// Run `jobs` with at most `workers` requests in flight.
///
/// Waits for every job. Results come back in the order the jobs were given,
/// whatever order the requests complete in.
pub async fn run_window_jobs(
    fetcher: &dyn Fetch,
    request: &AnswersRequest,
    jobs: Vec<WindowJob>,
    workers: usize,
) -> Vec<(PageWindow, std::result::Result<Vec<Answer>, String>)> {
    stream::iter(jobs)
        .map(|job| async move {
            let result = fetch_window(fetcher, request, &job).await;
            (job.window, result)
        })
        .buffered(workers.max(1))
        .collect()
        .await
}

/// Collect every targeted answer for one question.
///
/// Only a planning failure is an error. Failed windows are logged, listed in
/// [`AnswerCollection::failed`] and excluded from the answers.
pub async fn collect_answers(
    fetcher: &dyn Fetch,
    request: &AnswersRequest,
    total_available: usize,
    limit: AnswerLimit,
    page_size: usize,
    workers: usize,
) -> Result<AnswerCollection> {
    let windows = plan_windows(total_available, limit, page_size)?;
    let jobs = window_jobs(&request.include, &windows);
    tracing::info!(
        total_available,
        target = limit.target(total_available),
        windows = jobs.len(),
        "collecting answers"
    );

    let mut collection = AnswerCollection {
        target: limit.target(total_available),
        ..Default::default()
    };

    for (window, result) in run_window_jobs(fetcher, request, jobs, workers).await {
        match result {
            Ok(answers) => {
                tracing::debug!(window = %window, received = answers.len(), "window collected");
                collection.answers.extend(answers);
            }
            Err(reason) => {
                tracing::warn!(window = %window, error = %reason, "window failed");
                collection.failed.push(WindowFailure { window, reason });
            }
        }
    }

    if collection.deficit() > 0 {
        tracing::warn!(
            obtained = collection.answers.len(),
            target = collection.target,
            failed_windows = collection.failed.len(),
            "answer collection incomplete"
        );
    }

    Ok(collection)
}
