//! # answer-dl
//!
//! Targeted crawler for a Q&A site: for each question id it stores the
//! question page, every answer (up to a configurable ceiling) as a JSON array,
//! and the full-size images embedded in those answers.
//!
//! ## Design Philosophy
//!
//! - **Resumable** - every stage skips work whose output file already exists
//! - **Bounded** - pagination and image downloads use a fixed number of
//!   concurrent requests
//! - **Partial over nothing** - a failed page window or image is logged and
//!   skipped; only conditions that make a question meaningless abort it
//! - **Event-driven** - consumers can subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use answer_dl::{Config, Crawler, QuestionId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         question_ids: vec![QuestionId::new("123456789")],
//!         ..Default::default()
//!     };
//!
//!     let crawler = Crawler::new(config)?;
//!
//!     let mut events = crawler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = crawler.run().await;
//!     println!("{} questions done", summary.completed.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Top-level crawl loop
pub mod crawler;
/// Error types
pub mod error;
/// HTTP transport
pub mod fetcher;
/// Image reference extraction
pub mod images;
/// Answers API field selection
pub mod include;
/// Tracing subscriber setup
pub mod logging;
/// Answer pagination
pub mod pagination;
/// Per-question lifecycle
pub mod question;
/// File writes and downloads
pub mod sink;
/// Core types
pub mod types;

pub use config::{Config, DownloadConfig, SiteConfig};
pub use crawler::{CrawlSummary, CrawlTotals, Crawler, QuestionFailure};
pub use error::{Error, Result};
pub use fetcher::{Fetch, FetchOutcome, HttpFetcher, RequestHeaders};
pub use logging::init_logging;
pub use question::{QuestionReport, QuestionState};
pub use types::{Answer, AnswerLimit, Event, PageWindow, QuestionId};
