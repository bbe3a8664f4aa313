//! Error types for answer-dl
//!
//! Only conditions that make further progress on a question meaningless are
//! represented here. Per-window and per-image failures are not errors: they are
//! reported as outcome values ([`crate::fetcher::FetchOutcome`],
//! [`crate::sink::SaveOutcome`]) so the pipeline can keep going.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for answer-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for answer-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "page_size")
        key: Option<String>,
    },

    /// The question page could not be fetched, so no metadata is available
    #[error("question {question_id}: page snapshot unavailable: {reason}")]
    SnapshotUnavailable {
        /// The question whose page could not be fetched
        question_id: String,
        /// Why the fetch failed (HTTP status or transport cause)
        reason: String,
    },

    /// The page snapshot carries no answer count
    #[error("question {question_id}: answer count not found in {path}")]
    MissingAnswerCount {
        /// The question being processed
        question_id: String,
        /// The snapshot that was searched
        path: PathBuf,
    },

    /// Window planning walked past the target; indicates a bookkeeping bug
    #[error("pagination overrun: offset {offset} exceeds target {target}")]
    PaginationOverrun {
        /// Offset reached by the planner
        offset: usize,
        /// Number of answers that should have been covered exactly
        target: usize,
    },

    /// A persisted answer collection could not be read back
    #[error("corrupt answer collection at {path}: {reason}")]
    CorruptAnswers {
        /// The answer file
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error raised while building the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("invalid config file: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, used in events and reports
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::SnapshotUnavailable { .. } => "snapshot_unavailable",
            Error::MissingAnswerCount { .. } => "missing_answer_count",
            Error::PaginationOverrun { .. } => "pagination_overrun",
            Error::CorruptAnswers { .. } => "corrupt_answers",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ConfigFile(_) => "config_file_error",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_shorthand_records_key() {
        let err = Error::config("page_size", "must be at least 1");
        match &err {
            Error::Config { message, key } => {
                assert_eq!(message, "must be at least 1");
                assert_eq!(key.as_deref(), Some("page_size"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
        assert_eq!(err.to_string(), "configuration error: must be at least 1");
        assert_eq!(err.error_code(), "config_error");
    }

    #[test]
    fn fatal_question_errors_name_the_question() {
        let err = Error::MissingAnswerCount {
            question_id: "123456789".into(),
            path: PathBuf::from("data/123456789/123456789.html"),
        };
        let msg = err.to_string();
        assert!(msg.contains("123456789"));
        assert!(msg.contains("answer count"));
        assert_eq!(err.error_code(), "missing_answer_count");
    }

    #[test]
    fn overrun_reports_offset_and_target() {
        let err = Error::PaginationOverrun {
            offset: 60,
            target: 45,
        };
        assert_eq!(
            err.to_string(),
            "pagination overrun: offset 60 exceeds target 45"
        );
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.error_code(), "io_error");
    }
}
