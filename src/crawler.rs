//! Top-level crawler: runs each configured question in turn.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{Fetch, HttpFetcher};
use crate::include::load_include;
use crate::question::{QuestionReport, QuestionTask};
use crate::types::{Event, QuestionId};

/// A question that was aborted, with the reason
#[derive(Debug)]
pub struct QuestionFailure {
    /// Question ID
    pub id: QuestionId,
    /// What stopped it
    pub error: Error,
}

/// Outcome of a whole crawl
#[derive(Debug, Default)]
pub struct CrawlSummary {
    /// Questions that ran to completion, in processing order
    pub completed: Vec<QuestionReport>,
    /// Questions aborted by a fatal condition, in processing order
    pub failed: Vec<QuestionFailure>,
}

impl CrawlSummary {
    /// True when no question was aborted
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Totals across completed questions
    pub fn totals(&self) -> CrawlTotals {
        self.completed
            .iter()
            .fold(CrawlTotals::default(), |mut totals, report| {
                totals.questions += 1;
                totals.answers += report.obtained;
                totals.missing_answers += report.target.saturating_sub(report.obtained);
                totals.images_downloaded += report.images.downloaded;
                totals.images_failed += report.images.failed;
                totals
            })
    }
}

/// Aggregate counters for a crawl
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CrawlTotals {
    /// Completed questions
    pub questions: usize,
    /// Answers stored
    pub answers: usize,
    /// Answers targeted but not obtained
    pub missing_answers: usize,
    /// Images written during this run
    pub images_downloaded: usize,
    /// Images that failed
    pub images_failed: usize,
}

/// Main crawler instance (cloneable, all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Crawler {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Transport used for every request
    fetcher: Arc<dyn Fetch>,
    /// `include` query value, loaded once
    include: Arc<str>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl Crawler {
    /// Create a crawler backed by the HTTP client.
    ///
    /// Validates the configuration and reads the field selection file, so
    /// configuration problems surface before any question is touched.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let include = load_include(&config.download.include_file)?;
        let fetcher = HttpFetcher::new(config.site.request_timeout)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), include))
    }

    /// Create a crawler with a custom transport and field selection
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetch>, include: impl Into<String>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);
        Self {
            config: Arc::new(config),
            fetcher,
            include: Arc::from(include.into()),
            event_tx,
        }
    }

    /// Subscribe to crawl events
    ///
    /// Each subscriber receives every event sent after it subscribed. A
    /// subscriber that falls more than 1000 events behind gets
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Run one question through its whole lifecycle
    pub async fn crawl_question(&self, id: &QuestionId) -> Result<QuestionReport> {
        QuestionTask::new(
            id.clone(),
            &self.config,
            self.fetcher.as_ref(),
            &self.include,
            &self.event_tx,
        )
        .run()
        .await
    }

    /// Crawl the configured question list
    pub async fn run(&self) -> CrawlSummary {
        let ids = self.config.question_ids.clone();
        self.crawl(&ids).await
    }

    /// Crawl `ids` one after another.
    ///
    /// A question that fails is logged and recorded; the remaining questions
    /// still run.
    pub async fn crawl(&self, ids: &[QuestionId]) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        tracing::info!(questions = ids.len(), "starting crawl");

        for id in ids {
            match self.crawl_question(id).await {
                Ok(report) => summary.completed.push(report),
                Err(error) => {
                    tracing::error!(question_id = %id, code = error.error_code(), error = %error, "question aborted");
                    self.event_tx
                        .send(Event::QuestionFailed {
                            id: id.clone(),
                            code: error.error_code().to_string(),
                            error: error.to_string(),
                        })
                        .ok();
                    summary.failed.push(QuestionFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }

        let totals = summary.totals();
        tracing::info!(
            completed = totals.questions,
            failed = summary.failed.len(),
            answers = totals.answers,
            missing_answers = totals.missing_answers,
            images_downloaded = totals.images_downloaded,
            images_failed = totals.images_failed,
            "crawl finished"
        );
        summary
    }
}
