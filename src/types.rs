//! Core types for answer-dl

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Identifier of a question on the remote site
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    /// Create a new QuestionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for QuestionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ceiling on the number of answers collected for one question
///
/// Serialized as a signed integer: any negative value (conventionally `-1`)
/// means no ceiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum AnswerLimit {
    /// Collect every answer the question has
    #[default]
    Unbounded,
    /// Collect at most this many answers
    AtMost(usize),
}

impl AnswerLimit {
    /// Number of answers to fetch given how many the question has
    pub fn target(self, total_available: usize) -> usize {
        match self {
            AnswerLimit::Unbounded => total_available,
            AnswerLimit::AtMost(ceiling) => ceiling.min(total_available),
        }
    }
}

impl From<i64> for AnswerLimit {
    fn from(value: i64) -> Self {
        if value < 0 {
            AnswerLimit::Unbounded
        } else {
            AnswerLimit::AtMost(value as usize)
        }
    }
}

impl From<AnswerLimit> for i64 {
    fn from(limit: AnswerLimit) -> Self {
        match limit {
            AnswerLimit::Unbounded => -1,
            AnswerLimit::AtMost(n) => n as i64,
        }
    }
}

impl std::str::FromStr for AnswerLimit {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AnswerLimit::from(s.trim().parse::<i64>()?))
    }
}

impl std::fmt::Display for AnswerLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerLimit::Unbounded => f.write_str("unbounded"),
            AnswerLimit::AtMost(n) => write!(f, "{}", n),
        }
    }
}

/// One answer record as returned by the answers API
///
/// The record is kept verbatim so it can be persisted unchanged. Only the
/// `id` and `content` fields are interpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answer(pub Map<String, Value>);

impl Answer {
    /// Source-assigned identifier, rendered as a string whether the API sent
    /// a number or a string
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// HTML content of the answer
    pub fn content(&self) -> Option<&str> {
        self.0.get("content").and_then(Value::as_str)
    }
}

/// A contiguous `(offset, limit)` slice of a question's answers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    /// Index of the first answer in the window
    pub offset: usize,
    /// Number of answers requested
    pub limit: usize,
}

impl PageWindow {
    /// Create a window
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Exclusive end of the window
    pub fn end(&self) -> usize {
        self.offset + self.limit
    }
}

impl std::fmt::Display for PageWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 1-based, inclusive: "answers 21-40"
        write!(f, "answers {}-{}", self.offset + 1, self.end())
    }
}

/// Event emitted while crawling
///
/// Events mirror what is written to the log; subscribers use them to observe
/// progress without parsing log lines.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Processing of a question started
    QuestionStarted {
        /// Question ID
        id: QuestionId,
    },

    /// Page snapshot written to disk
    SnapshotSaved {
        /// Question ID
        id: QuestionId,
        /// Snapshot path
        path: PathBuf,
    },

    /// Page snapshot already present, fetch skipped
    SnapshotSkipped {
        /// Question ID
        id: QuestionId,
        /// Snapshot path
        path: PathBuf,
    },

    /// Answer count and title read from the snapshot
    MetadataExtracted {
        /// Question ID
        id: QuestionId,
        /// Total answers reported by the page
        answer_count: usize,
        /// Question title, if found
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// One answers window could not be fetched
    WindowFailed {
        /// Question ID
        id: QuestionId,
        /// The window that failed
        window: PageWindow,
        /// Error message
        error: String,
    },

    /// Answer collection finished (fetched or loaded from disk)
    AnswersCollected {
        /// Question ID
        id: QuestionId,
        /// Answers actually obtained
        obtained: usize,
        /// Answers targeted
        target: usize,
        /// Whether the collection was re-read from an existing file
        from_disk: bool,
    },

    /// Image downloaded
    ImageSaved {
        /// Owning answer ID
        answer_id: String,
        /// Source URL
        url: String,
        /// Destination path
        path: PathBuf,
    },

    /// Image already on disk, download skipped
    ImageSkipped {
        /// Owning answer ID
        answer_id: String,
        /// Destination path
        path: PathBuf,
    },

    /// Image download failed
    ImageFailed {
        /// Owning answer ID
        answer_id: String,
        /// Source URL
        url: String,
        /// Error message
        error: String,
    },

    /// Question fully processed
    QuestionComplete {
        /// Question ID
        id: QuestionId,
    },

    /// Question aborted by a fatal condition
    QuestionFailed {
        /// Question ID
        id: QuestionId,
        /// Machine-readable error code
        code: String,
        /// Error message
        error: String,
    },
}
