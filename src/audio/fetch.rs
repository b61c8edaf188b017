use std::path::{Path, PathBuf};

use log::debug;

use crate::audio::MediaFetcher;
use crate::error::LoadError;

/// Fetches track bytes from a local music directory
pub struct DirFetcher {
    base: PathBuf,
}

impl DirFetcher {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// List the audio files directly under the base directory, sorted by
    /// filename. This is what populates the playlist at startup.
    pub fn list(&self) -> Result<Vec<String>, std::io::Error> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.base)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_audio_file(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait::async_trait]
impl MediaFetcher for DirFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.base.join(locator);
        debug!("fetching {}", path.display());
        tokio::fs::read(&path).await.map_err(|e| LoadError::Fetch {
            locator: locator.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Fetches track bytes over HTTP from a base URL, mirroring a playlist
/// served by a static file server
pub struct HttpFetcher {
    base: String,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        let url = format!("{}/{}", self.base, locator);
        debug!("fetching {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::Fetch {
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;
        let bytes = response.bytes().await.map_err(|e| LoadError::Fetch {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

fn is_audio_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    matches!(
        ext.as_str(),
        "flac" | "wav" | "wave" | "m4a" | "mp3" | "ogg" | "oga"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dir_fetcher_reads_bytes() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("song.wav"), b"dummy audio data").unwrap();

        let fetcher = DirFetcher::new(temp_dir.path());
        let bytes = fetcher.fetch("song.wav").await.unwrap();
        assert_eq!(bytes, b"dummy audio data");
    }

    #[tokio::test]
    async fn test_dir_fetcher_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = DirFetcher::new(temp_dir.path());

        let result = fetcher.fetch("missing.flac").await;
        match result {
            Err(LoadError::Fetch { locator, .. }) => assert_eq!(locator, "missing.flac"),
            other => panic!("expected fetch error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_dir_fetcher_list_sorted_audio_only() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.mp3"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("a.flac"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(temp_dir.path().join("sub.ogg")).unwrap();

        let fetcher = DirFetcher::new(temp_dir.path());
        let names = fetcher.list().unwrap();
        assert_eq!(names, vec!["a.flac".to_string(), "b.mp3".to_string()]);
    }

    #[test]
    fn test_http_fetcher_trims_trailing_slash() {
        let fetcher = HttpFetcher::new("http://localhost:8080/");
        assert_eq!(fetcher.base, "http://localhost:8080");
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("song.FLAC")));
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(!is_audio_file(Path::new("song.txt")));
        assert!(!is_audio_file(Path::new("song")));
    }
}
