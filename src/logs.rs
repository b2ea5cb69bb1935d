//! Log retrieval.
//!
//! Serves the registry's own log file back through the API, either as a full
//! download or as the last N lines. The file is written by the tracing
//! subscriber configured at startup; if file logging is disabled or the file
//! does not exist yet, recent-line queries return an empty list while the
//! download endpoint reports an error.

use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::core::error::{DiscoveryError, DiscoveryResult};

/// Accessor for the configured log file
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the whole log file for download
    pub async fn read_all(&self) -> DiscoveryResult<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) => {
                warn!(path = %self.path.display(), "Log file not readable: {}", e);
                Err(DiscoveryError::Io {
                    message: format!("Log file not found: {}", self.path.display()),
                })
            }
        }
    }

    /// Get the last `lines` log lines; an absent file yields an empty list
    pub async fn recent(&self, lines: usize) -> Vec<String> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), "Log file not readable: {}", e);
                return Vec::new();
            }
        };

        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);

        debug!(lines = all.len() - start, path = %self.path.display(), "Retrieved recent log lines");
        all[start..].iter().map(|line| line.to_string()).collect()
    }

    /// Timestamped filename for downloads
    pub fn download_filename(&self) -> String {
        format!(
            "service-discovery-logs_{}.log",
            Utc::now().format("%Y%m%d_%H%M%S")
        )
    }

    /// Log file size in bytes, `None` when the file does not exist
    pub async fn size(&self) -> Option<u64> {
        tokio::fs::metadata(&self.path)
            .await
            .ok()
            .map(|meta| meta.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_recent_returns_last_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 1..=10 {
            writeln!(file, "line {}", i).unwrap();
        }

        let store = LogStore::new(file.path());
        let recent = store.recent(3).await;
        assert_eq!(recent, vec!["line 8", "line 9", "line 10"]);
    }

    #[tokio::test]
    async fn test_recent_more_lines_than_file_has() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "only line").unwrap();

        let store = LogStore::new(file.path());
        assert_eq!(store.recent(100).await, vec!["only line"]);
    }

    #[tokio::test]
    async fn test_missing_file_tolerated_for_recent() {
        let store = LogStore::new("/nonexistent/service-discovery.log");
        assert!(store.recent(10).await.is_empty());
        assert!(store.size().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_errors_for_download() {
        let store = LogStore::new("/nonexistent/service-discovery.log");
        assert!(store.read_all().await.is_err());
    }

    #[test]
    fn test_download_filename_shape() {
        let store = LogStore::new("logs/service-discovery.log");
        let name = store.download_filename();
        assert!(name.starts_with("service-discovery-logs_"));
        assert!(name.ends_with(".log"));
    }
}
