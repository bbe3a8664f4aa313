//! Per-question lifecycle: page snapshot, metadata, answers, images.
//!
//! A question moves through [`QuestionState`] strictly in order. Each stage
//! whose output file already exists is treated as done (unless overwrite is
//! on), which makes a re-run of the same id resumable and, once everything is
//! on disk, free of network traffic.
//!
//! On-disk layout under the data directory:
//!
//! ```text
//! <id>/
//!     <id>.html
//!     <id>.json
//!     images/
//!         <answer id>/
//!             <image file name>
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{Fetch, RequestHeaders};
use crate::images::{ImageRef, image_refs};
use crate::pagination::{AnswersRequest, collect_answers};
use crate::sink::{SaveOutcome, save, should_skip, write_file};
use crate::types::{Answer, AnswerLimit, Event, QuestionId};

#[allow(clippy::expect_used)]
static ANSWER_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+itemprop="answerCount"\s+content="(\d+)""#)
        .expect("answer count pattern is valid")
});

#[allow(clippy::expect_used)]
static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title>").expect("title pattern is valid")
});

/// Lifecycle stage reached by a question
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    /// Nothing done yet
    Created,
    /// Page snapshot is on disk
    HtmlFetched,
    /// Answer count (and possibly title) known
    MetadataExtracted,
    /// Answer collection is on disk
    AnswersCollected,
    /// Image pass finished
    ImagesCollected,
}

/// Paths of everything stored for one question
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionLayout {
    /// Question directory
    pub dir: PathBuf,
    /// Raw page snapshot
    pub snapshot: PathBuf,
    /// Serialized answer collection
    pub answers: PathBuf,
    /// Root of the per-answer image directories
    pub images: PathBuf,
}

impl QuestionLayout {
    /// Layout for `id` under `data_dir`
    pub fn new(data_dir: &Path, id: &QuestionId) -> Self {
        let dir = data_dir.join(id.as_str());
        Self {
            snapshot: dir.join(format!("{}.html", id)),
            answers: dir.join(format!("{}.json", id)),
            images: dir.join("images"),
            dir,
        }
    }

    /// Image directory of one answer
    pub fn answer_images(&self, answer_id: &str) -> PathBuf {
        self.images.join(answer_id)
    }
}

/// Question metadata extracted from its page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    /// Question ID
    pub id: QuestionId,
    /// Page title without the site suffix
    pub title: Option<String>,
    /// Answers the page reports
    pub answer_count: usize,
    /// Configured ceiling
    pub limit: AnswerLimit,
}

impl Question {
    /// Answers that will be requested
    pub fn target(&self) -> usize {
        self.limit.target(self.answer_count)
    }
}

/// Counters from the image pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImageStats {
    /// Answers that contained at least one image
    pub answers_with_images: usize,
    /// Images fetched and written
    pub downloaded: usize,
    /// Images already on disk
    pub skipped: usize,
    /// Images that could not be fetched or written
    pub failed: usize,
}

/// What happened to one question
#[derive(Clone, Debug, Serialize)]
pub struct QuestionReport {
    /// Question ID
    pub id: QuestionId,
    /// Title, if found
    pub title: Option<String>,
    /// Answers the page reports
    pub answer_count: usize,
    /// Answers targeted
    pub target: usize,
    /// Answers in the stored collection
    pub obtained: usize,
    /// Windows that failed during this run
    pub failed_windows: usize,
    /// Whether the answers were re-read from disk instead of fetched
    pub answers_from_disk: bool,
    /// Image pass counters
    pub images: ImageStats,
    /// Last stage reached
    pub state: QuestionState,
}

/// Number of answers the page reports, if present
pub fn extract_answer_count(html: &str) -> Option<usize> {
    ANSWER_COUNT
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Page title with `suffix` removed, if present and non-empty
pub fn extract_title(html: &str, suffix: &str) -> Option<String> {
    let raw = TITLE.captures(html)?.get(1)?.as_str().trim();
    let title = raw.strip_suffix(suffix.trim()).unwrap_or(raw).trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Runs the lifecycle of a single question
pub struct QuestionTask<'a> {
    id: QuestionId,
    config: &'a Config,
    fetcher: &'a dyn Fetch,
    include: &'a str,
    event_tx: &'a broadcast::Sender<Event>,
    layout: QuestionLayout,
    headers: RequestHeaders,
    state: QuestionState,
}

impl<'a> QuestionTask<'a> {
    /// Prepare a task; nothing is touched until [`QuestionTask::run`]
    pub fn new(
        id: QuestionId,
        config: &'a Config,
        fetcher: &'a dyn Fetch,
        include: &'a str,
        event_tx: &'a broadcast::Sender<Event>,
    ) -> Self {
        Self {
            layout: QuestionLayout::new(&config.download.data_dir, &id),
            headers: RequestHeaders::for_question(&config.site, &id),
            id,
            config,
            fetcher,
            include,
            event_tx,
            state: QuestionState::Created,
        }
    }

    /// Current stage
    pub fn state(&self) -> QuestionState {
        self.state
    }

    /// Storage layout of this question
    pub fn layout(&self) -> &QuestionLayout {
        &self.layout
    }

    /// Drive the question through every stage.
    ///
    /// Fatal conditions (no snapshot, no answer count, pagination overrun,
    /// unreadable stored answers, failed writes of the snapshot or the answer
    /// file) abort this question only.
    pub async fn run(mut self) -> Result<QuestionReport> {
        tracing::info!(question_id = %self.id, "crawling question");
        self.event_tx
            .send(Event::QuestionStarted {
                id: self.id.clone(),
            })
            .ok();

        let html = self.ensure_snapshot().await?;
        let question = self.read_metadata(&html)?;
        let (answers, failed_windows, from_disk) = self.ensure_answers(&question).await?;

        let images = if self.config.download.download_images {
            self.collect_images(&answers).await
        } else {
            tracing::info!(question_id = %self.id, "image collection disabled");
            ImageStats::default()
        };
        self.state = QuestionState::ImagesCollected;

        tracing::info!(
            question_id = %self.id,
            obtained = answers.len(),
            target = question.target(),
            images_downloaded = images.downloaded,
            "question complete"
        );
        self.event_tx
            .send(Event::QuestionComplete {
                id: self.id.clone(),
            })
            .ok();

        Ok(QuestionReport {
            id: self.id,
            title: question.title.clone(),
            answer_count: question.answer_count,
            target: question.target(),
            obtained: answers.len(),
            failed_windows,
            answers_from_disk: from_disk,
            images,
            state: self.state,
        })
    }

    /// Fetch the question page unless a snapshot already exists; return its text
    async fn ensure_snapshot(&mut self) -> Result<String> {
        let path = &self.layout.snapshot;
        if should_skip(path, self.config.download.overwrite).await {
            tracing::info!(question_id = %self.id, path = %path.display(), "snapshot exists, skipping page fetch");
            self.event_tx
                .send(Event::SnapshotSkipped {
                    id: self.id.clone(),
                    path: path.clone(),
                })
                .ok();
        } else {
            tracing::info!(question_id = %self.id, "fetching question page");
            let url = self.config.site.question_url(&self.id);
            let body = self
                .fetcher
                .fetch(&url, &self.headers, &[])
                .await
                .into_body()
                .map_err(|reason| Error::SnapshotUnavailable {
                    question_id: self.id.to_string(),
                    reason,
                })?;
            write_file(path, &body).await?;
            tracing::info!(question_id = %self.id, bytes = body.len(), "snapshot saved");
            self.event_tx
                .send(Event::SnapshotSaved {
                    id: self.id.clone(),
                    path: path.clone(),
                })
                .ok();
        }

        let bytes = tokio::fs::read(path).await?;
        self.state = QuestionState::HtmlFetched;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_metadata(&mut self, html: &str) -> Result<Question> {
        let Some(answer_count) = extract_answer_count(html) else {
            tracing::error!(question_id = %self.id, path = %self.layout.snapshot.display(), "answer count not found in snapshot");
            return Err(Error::MissingAnswerCount {
                question_id: self.id.to_string(),
                path: self.layout.snapshot.clone(),
            });
        };

        let title = extract_title(html, &self.config.site.title_suffix);
        match &title {
            Some(title) => tracing::debug!(question_id = %self.id, title = %title, answer_count, "metadata extracted"),
            None => tracing::warn!(question_id = %self.id, "question title not found in snapshot"),
        }

        self.event_tx
            .send(Event::MetadataExtracted {
                id: self.id.clone(),
                answer_count,
                title: title.clone(),
            })
            .ok();
        self.state = QuestionState::MetadataExtracted;

        Ok(Question {
            id: self.id.clone(),
            title,
            answer_count,
            limit: self.config.download.answer_limit,
        })
    }

    /// Collect answers, or re-read them when the collection is already stored.
    ///
    /// Returns the answers, the number of failed windows, and whether they
    /// came from disk.
    async fn ensure_answers(&mut self, question: &Question) -> Result<(Vec<Answer>, usize, bool)> {
        let path = self.layout.answers.clone();

        if should_skip(&path, self.config.download.overwrite).await {
            tracing::info!(question_id = %self.id, path = %path.display(), "answer collection exists, skipping");
            let answers = load_answers(&path).await?;
            self.answers_collected(answers.len(), question.target(), true);
            return Ok((answers, 0, true));
        }

        let request = AnswersRequest {
            url: self.config.site.answers_url(&self.id),
            include: self.include.to_string(),
            headers: self.headers.clone(),
        };
        let collection = collect_answers(
            self.fetcher,
            &request,
            question.answer_count,
            question.limit,
            self.config.download.page_size,
            self.config.download.max_workers,
        )
        .await?;

        for failure in &collection.failed {
            self.event_tx
                .send(Event::WindowFailed {
                    id: self.id.clone(),
                    window: failure.window,
                    error: failure.reason.clone(),
                })
                .ok();
        }

        write_file(&path, &serde_json::to_vec(&collection.answers)?).await?;
        self.answers_collected(collection.answers.len(), collection.target, false);
        Ok((collection.answers, collection.failed.len(), false))
    }

    fn answers_collected(&mut self, obtained: usize, target: usize, from_disk: bool) {
        tracing::info!(question_id = %self.id, obtained, target, from_disk, "answers collected");
        self.event_tx
            .send(Event::AnswersCollected {
                id: self.id.clone(),
                obtained,
                target,
                from_disk,
            })
            .ok();
        self.state = QuestionState::AnswersCollected;
    }

    /// Download the images of every answer, one answer at a time
    async fn collect_images(&self, answers: &[Answer]) -> ImageStats {
        let mut stats = ImageStats::default();
        tracing::info!(question_id = %self.id, answers = answers.len(), "collecting images");

        for (index, answer) in answers.iter().enumerate() {
            let refs = image_refs(answer);
            let Some(answer_id) = refs.first().map(|image| image.answer_id.clone()) else {
                tracing::debug!(question_id = %self.id, index, answer_id = ?answer.id(), "no images in answer");
                continue;
            };
            stats.answers_with_images += 1;

            let attempted = self.download_answer_images(&answer_id, refs, &mut stats).await;
            if attempted && !self.config.download.answer_pause.is_zero() {
                tokio::time::sleep(self.config.download.answer_pause).await;
            }
        }

        tracing::info!(
            question_id = %self.id,
            answers_with_images = stats.answers_with_images,
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            failed = stats.failed,
            "image collection finished"
        );
        stats
    }

    /// Fan out one answer's downloads; returns whether any request was made
    async fn download_answer_images(
        &self,
        answer_id: &str,
        refs: Vec<ImageRef>,
        stats: &mut ImageStats,
    ) -> bool {
        let dir = self.layout.answer_images(answer_id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::error!(answer_id = %answer_id, dir = %dir.display(), error = %e, "cannot create image directory");
            for image in refs {
                self.event_tx
                    .send(Event::ImageFailed {
                        answer_id: image.answer_id,
                        url: image.url,
                        error: e.to_string(),
                    })
                    .ok();
                stats.failed += 1;
            }
            return false;
        }

        tracing::info!(answer_id = %answer_id, images = refs.len(), "downloading answer images");
        let overwrite = self.config.download.overwrite;
        let dir = &dir;
        let results: Vec<(ImageRef, PathBuf, SaveOutcome)> = stream::iter(refs)
            .map(|image| async move {
                let path = dir.join(&image.file_name);
                let outcome = save(self.fetcher, &image.url, &path, &self.headers, overwrite).await;
                (image, path, outcome)
            })
            .buffered(self.config.download.max_workers.max(1))
            .collect()
            .await;

        let mut attempted = false;
        for (image, path, outcome) in results {
            let event = match outcome {
                SaveOutcome::Downloaded { .. } => {
                    attempted = true;
                    stats.downloaded += 1;
                    Event::ImageSaved {
                        answer_id: image.answer_id,
                        url: image.url,
                        path,
                    }
                }
                SaveOutcome::Skipped => {
                    stats.skipped += 1;
                    Event::ImageSkipped {
                        answer_id: image.answer_id,
                        path,
                    }
                }
                SaveOutcome::Failed(error) => {
                    attempted = true;
                    stats.failed += 1;
                    Event::ImageFailed {
                        answer_id: image.answer_id,
                        url: image.url,
                        error,
                    }
                }
            };
            self.event_tx.send(event).ok();
        }
        tracing::info!(answer_id = %answer_id, "answer images done");
        attempted
    }
}

async fn load_answers(path: &Path) -> Result<Vec<Answer>> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::CorruptAnswers {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
