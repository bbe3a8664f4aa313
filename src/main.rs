//! answer-dl - download the answers and answer images of Q&A site questions.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use answer_dl::{Crawler, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();
    let config = cli.resolve_config()?;

    let _guard = init_logging(&config.log_file)?;
    tracing::info!(
        started_at = %chrono::Utc::now().to_rfc3339(),
        version = env!("CARGO_PKG_VERSION"),
        questions = config.question_ids.len(),
        data_dir = %config.download.data_dir.display(),
        "answer-dl starting"
    );

    let crawler = Crawler::new(config)?;
    let summary = crawler.run().await;

    for failure in &summary.failed {
        eprintln!("question {} failed: {}", failure.id, failure.error);
    }
    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
