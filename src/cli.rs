//! Command-line arguments and their merge into [`Config`].

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;

use answer_dl::{AnswerLimit, Config, QuestionId};

#[derive(Parser, Debug)]
#[command(name = "answer-dl")]
#[command(about = "Download the answers and answer images of Q&A site questions")]
#[command(version)]
pub struct Cli {
    /// Question IDs to crawl (replaces `question_ids` from the config file)
    #[arg(value_name = "QUESTION_ID")]
    pub question_ids: Vec<String>,

    /// TOML configuration file
    #[arg(short, long, env = "ANSWER_DL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base directory for per-question output
    #[arg(long, env = "ANSWER_DL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Maximum answers per question (-1 = all)
    #[arg(short, long, allow_negative_numbers = true)]
    pub limit: Option<AnswerLimit>,

    /// Replace files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Answers requested per API call
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Concurrent requests per fan-out point
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Field selection file for the answers API
    #[arg(long)]
    pub include: Option<PathBuf>,

    /// Append-mode log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Skip image downloads
    #[arg(long)]
    pub no_images: bool,
}

impl Cli {
    /// Load the config file (if any), apply flags on top, and validate
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => Config::default(),
        };
        self.apply(&mut config);

        if config.question_ids.is_empty() {
            bail!("no question ids given; pass them as arguments or set question_ids in the config file");
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if !self.question_ids.is_empty() {
            config.question_ids = self.question_ids.iter().map(QuestionId::new).collect();
        }
        if let Some(dir) = &self.data_dir {
            config.download.data_dir = dir.clone();
        }
        if let Some(limit) = self.limit {
            config.download.answer_limit = limit;
        }
        if self.overwrite {
            config.download.overwrite = true;
        }
        if let Some(size) = self.page_size {
            config.download.page_size = size;
        }
        if let Some(workers) = self.workers {
            config.download.max_workers = workers;
        }
        if let Some(include) = &self.include {
            config.download.include_file = include.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
        if self.no_images {
            config.download.download_images = false;
        }
    }
}
