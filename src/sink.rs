//! File sink: whole-file writes and the fetch-then-save download step.

use std::path::{Path, PathBuf};

use crate::fetcher::{Fetch, RequestHeaders};

/// Result of a single [`save`] call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// File fetched and written
    Downloaded {
        /// Bytes written
        bytes: usize,
    },
    /// File already existed and overwrite is off; nothing was fetched
    Skipped,
    /// Fetch or write failed; the target file is absent
    Failed(String),
}

/// Whether `path` already holds a file the caller should keep
pub async fn should_skip(path: &Path, overwrite: bool) -> bool {
    !overwrite && tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Write `contents` to `path`, creating parent directories.
///
/// Bytes go to a sibling `.part` file that is renamed over `path` once fully
/// written, so readers see either the old file, no file, or the complete new one.
pub async fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(path);
    tokio::fs::write(&partial, contents).await?;
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        tokio::fs::remove_file(&partial).await.ok();
        return Err(e);
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Download `url` into `path`.
///
/// Skips without touching the network when `path` exists and `overwrite` is
/// off. Failures are logged and returned, never propagated.
pub async fn save(
    fetcher: &dyn Fetch,
    url: &str,
    path: &Path,
    headers: &RequestHeaders,
    overwrite: bool,
) -> SaveOutcome {
    if should_skip(path, overwrite).await {
        tracing::info!(path = %path.display(), "file already exists, skipping");
        return SaveOutcome::Skipped;
    }

    let body = match fetcher.fetch(url, headers, &[]).await.into_body() {
        Ok(body) => body,
        Err(reason) => {
            tracing::error!(url = %url, error = %reason, "download failed");
            return SaveOutcome::Failed(reason);
        }
    };

    match write_file(path, &body).await {
        Ok(()) => {
            tracing::debug!(url = %url, path = %path.display(), bytes = body.len(), "download complete");
            SaveOutcome::Downloaded { bytes: body.len() }
        }
        Err(e) => {
            let reason = format!("failed to write {}: {}", path.display(), e);
            tracing::error!(url = %url, error = %reason, "download failed");
            SaveOutcome::Failed(reason)
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Fetcher returning a canned outcome and counting calls
    struct CannedFetcher {
        outcome: FetchOutcome,
        calls: AtomicUsize,
    }

    impl CannedFetcher {
        fn new(outcome: FetchOutcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Fetch for CannedFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _headers: &RequestHeaders,
            _query: &[(String, String)],
        ) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn headers() -> RequestHeaders {
        RequestHeaders {
            user_agent: "ua".into(),
            referer: "ref".into(),
        }
    }

    #[tokio::test]
    async fn write_file_creates_parents_and_leaves_no_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.bin");
        write_file(&path, b"payload").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert!(!dir.path().join("a/b/c.bin.part").exists());
    }

    #[tokio::test]
    async fn write_file_truncates_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "a much longer original body").unwrap();
        write_file(&path, b"short").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn save_downloads_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("img/abc123.jpg");
        let fetcher = CannedFetcher::new(FetchOutcome::Success(vec![1, 2, 3]));

        let outcome = save(&fetcher, "https://pic/abc123.jpg", &path, &headers(), false).await;
        assert_eq!(outcome, SaveOutcome::Downloaded { bytes: 3 });
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn existing_file_is_skipped_without_network() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc123.jpg");
        std::fs::write(&path, "old").unwrap();
        let fetcher = CannedFetcher::new(FetchOutcome::Success(b"new".to_vec()));

        let outcome = save(&fetcher, "https://pic/abc123.jpg", &path, &headers(), false).await;
        assert_eq!(outcome, SaveOutcome::Skipped);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[tokio::test]
    async fn overwrite_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc123.jpg");
        std::fs::write(&path, "old").unwrap();
        let fetcher = CannedFetcher::new(FetchOutcome::Success(b"new".to_vec()));

        let outcome = save(&fetcher, "https://pic/abc123.jpg", &path, &headers(), true).await;
        assert_eq!(outcome, SaveOutcome::Downloaded { bytes: 3 });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[tokio::test]
    async fn fetch_failure_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.jpg");
        let fetcher = CannedFetcher::new(FetchOutcome::HttpError(404));

        let outcome = save(&fetcher, "https://pic/missing.jpg", &path, &headers(), false).await;
        assert_eq!(outcome, SaveOutcome::Failed("HTTP status 404".into()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn write_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        // A regular file where a parent directory is needed
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("child.jpg");
        let fetcher = CannedFetcher::new(FetchOutcome::Success(b"x".to_vec()));

        let outcome = save(&fetcher, "https://pic/child.jpg", &path, &headers(), false).await;
        assert!(matches!(outcome, SaveOutcome::Failed(_)));
    }
}
