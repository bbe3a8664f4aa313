//! Configuration types for answer-dl

use crate::error::{Error, Result};
use crate::types::{AnswerLimit, QuestionId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default desktop browser user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.55 Safari/537.36";

/// Remote site settings (endpoints, headers, page conventions)
///
/// Used as a nested sub-config within [`Config`] under the `[site]` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root without trailing slash (default: "https://www.zhihu.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Answers API path; `{id}` is replaced by the question id
    /// (default: "/api/v4/questions/{id}/answers")
    #[serde(default = "default_answers_path")]
    pub answers_path: String,

    /// User agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Suffix the site appends to page titles, stripped during extraction
    /// (default: " - 知乎")
    #[serde(default = "default_title_suffix")]
    pub title_suffix: String,

    /// Per-request timeout in seconds (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            answers_path: default_answers_path(),
            user_agent: default_user_agent(),
            title_suffix: default_title_suffix(),
            request_timeout: None,
        }
    }
}

impl SiteConfig {
    fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// URL of the question page
    pub fn question_url(&self, id: &QuestionId) -> String {
        format!("{}/question/{}", self.root(), id)
    }

    /// URL of the paginated answers endpoint
    pub fn answers_url(&self, id: &QuestionId) -> String {
        let path = self.answers_path.replace("{id}", id.as_str());
        if path.starts_with('/') {
            format!("{}{}", self.root(), path)
        } else {
            format!("{}/{}", self.root(), path)
        }
    }

    /// Referer sent with every request made on behalf of a question
    pub fn referer(&self, id: &QuestionId) -> String {
        self.question_url(id)
    }
}

/// Crawl behavior configuration (output layout, pagination, concurrency)
///
/// Groups settings related to how answers and images are fetched and stored.
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base directory for per-question output (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Replace files that already exist instead of skipping them (default: false)
    #[serde(default)]
    pub overwrite: bool,

    /// Maximum number of answers to collect per question (default: -1, unbounded)
    #[serde(default)]
    pub answer_limit: AnswerLimit,

    /// Answers requested per API call (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Concurrent requests per fan-out point (default: 4)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Pause after each answer whose images were downloaded (default: 500 ms)
    #[serde(
        default = "default_answer_pause",
        rename = "answer_pause_ms",
        with = "duration_millis_serde"
    )]
    pub answer_pause: Duration,

    /// Download images referenced by answers (default: true)
    #[serde(default = "default_true")]
    pub download_images: bool,

    /// Field selection file for the answers API (default: "./include.txt")
    #[serde(default = "default_include_file")]
    pub include_file: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            overwrite: false,
            answer_limit: AnswerLimit::default(),
            page_size: default_page_size(),
            max_workers: default_max_workers(),
            answer_pause: default_answer_pause(),
            download_images: true,
            include_file: default_include_file(),
        }
    }
}

/// Main configuration for the crawler
///
/// Crawl behavior lives in [`DownloadConfig`] and is flattened, so the TOML
/// file keeps those keys at the top level. Site settings live under `[site]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Questions to crawl, in order
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,

    /// Crawl behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Remote site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// Append-mode log file (default: "logger.log")
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            question_ids: Vec::new(),
            download: DownloadConfig::default(),
            site: SiteConfig::default(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                "config",
                format!("cannot read config file {}: {}", path.display(), e),
            )
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.page_size == 0 {
            return Err(Error::config("page_size", "page_size must be at least 1"));
        }
        if self.download.max_workers == 0 {
            return Err(Error::config(
                "max_workers",
                "max_workers must be at least 1",
            ));
        }
        if !self.site.answers_path.contains("{id}") {
            return Err(Error::config(
                "site.answers_path",
                "answers_path must contain the {id} placeholder",
            ));
        }
        if url::Url::parse(&self.site.base_url).is_err() {
            return Err(Error::config(
                "site.base_url",
                format!("invalid base URL: {}", self.site.base_url),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://www.zhihu.com".to_string()
}

fn default_answers_path() -> String {
    "/api/v4/questions/{id}/answers".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_title_suffix() -> String {
    " - 知乎".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_page_size() -> usize {
    20
}

fn default_max_workers() -> usize {
    4
}

fn default_answer_pause() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

fn default_include_file() -> PathBuf {
    PathBuf::from("./include.txt")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logger.log")
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper (seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
