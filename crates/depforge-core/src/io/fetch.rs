//! Source archive fetching with streaming SHA256 verification.
//!
//! A fetch is gated on its destination directory: when it exists the
//! archive is assumed to be unpacked already and nothing is downloaded.
//! Extraction happens in a sibling staging directory that is renamed into
//! place only once every entry is written, so an interrupted fetch never
//! leaves a destination that looks complete.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::io::extract::{ExtractError, extract_zip};
use crate::reporter::{NullReporter, Reporter};

/// Fetch failures. None are retried.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the download or extracting it failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The download does not match the pinned SHA-256.
    #[error("Hash mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        /// URL that was downloaded.
        url: String,
        /// Pinned hash.
        expected: String,
        /// Hash of what arrived.
        actual: String,
    },

    /// The archive could not be extracted.
    #[error("Archive error: {0}")]
    Archive(String),
}

impl From<ExtractError> for FetchError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Io(e) => Self::Io(e),
            ExtractError::Archive(msg) => Self::Archive(msg),
        }
    }
}

/// Result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; nothing was downloaded.
    AlreadyPresent,
    /// The archive was downloaded and extracted.
    Fetched {
        /// SHA256 of the downloaded archive (lowercase hex).
        sha256: String,
        /// Number of files extracted.
        files: usize,
    },
}

/// Request to download a zip archive and extract it into a directory.
pub struct FetchRequest<'a> {
    /// HTTP client to download with.
    pub client: &'a Client,
    /// Archive URL.
    pub url: &'a str,
    /// Directory the archive is extracted into. Its existence skips the fetch.
    pub dest_dir: &'a Path,
    /// Pinned SHA-256 in hex, any case.
    pub expected_sha256: Option<&'a str>,
    /// Where the downloaded archive is kept.
    pub cache_dir: PathBuf,
    /// Progress sink.
    pub reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for FetchRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("url", &self.url)
            .field("dest_dir", &self.dest_dir)
            .field("expected_sha256", &self.expected_sha256)
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> FetchRequest<'a> {
    /// Fetch `url` into `dest_dir` without hash verification, caching under
    /// the default cache directory.
    pub fn new(client: &'a Client, url: &'a str, dest_dir: &'a Path) -> Self {
        Self {
            client,
            url,
            dest_dir,
            expected_sha256: None,
            cache_dir: crate::cache_path(),
            reporter: &NullReporter,
        }
    }

    /// Require the archive to hash to `sha256`.
    pub fn with_sha256(mut self, sha256: &'a str) -> Self {
        self.expected_sha256 = Some(sha256);
        self
    }

    /// Keep downloads in `cache_dir`.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Send progress to `reporter`.
    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Download, verify and extract unless the destination already exists.
    ///
    /// # Errors
    ///
    /// [`FetchError::Http`] for transport or status failures,
    /// [`FetchError::HashMismatch`] when verification fails, and
    /// [`FetchError::Io`] or [`FetchError::Archive`] when extraction fails.
    /// The destination is never left partially populated.
    pub async fn execute(self) -> Result<FetchOutcome, FetchError> {
        if self.dest_dir.exists() {
            debug!(dest = %self.dest_dir.display(), "source already present");
            self.reporter
                .skipped("fetch", &format!("{} already present", self.dest_dir.display()));
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let file_name = match crate::filename_from_url(self.url) {
            "" => "download.zip",
            name => name,
        };
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let archive = self.cache_dir.join(file_name);

        self.reporter.step("fetch", self.url);
        let sha256 = download_and_verify(self.client, self.url, &archive, self.expected_sha256).await?;

        let dest_dir = self.dest_dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || extract_into_place(&archive, &dest_dir))
            .await
            .map_err(|e| FetchError::Io(std::io::Error::other(e)))??;

        info!(url = self.url, dest = %self.dest_dir.display(), files, "fetched source");
        self.reporter
            .done("fetch", &format!("{files} files -> {}", self.dest_dir.display()));
        Ok(FetchOutcome::Fetched { sha256, files })
    }
}

/// Stream `url` into `dest`, hashing as it goes.
///
/// When `expected` is given the lowercase/uppercase form does not matter. On
/// mismatch `dest` is removed.
///
/// # Errors
///
/// [`FetchError::Http`], [`FetchError::Io`] or [`FetchError::HashMismatch`].
pub async fn download_and_verify(
    client: &Client,
    url: &str,
    dest: &Path,
    expected: Option<&str>,
) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    drop(file);
    let actual = hex::encode(hasher.finalize());
    debug!(url, bytes = downloaded, sha256 = %actual, "download complete");

    if let Some(expected) = expected {
        if !actual.eq_ignore_ascii_case(expected) {
            tokio::fs::remove_file(dest).await.ok();
            return Err(FetchError::HashMismatch {
                url: url.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    Ok(actual)
}

/// Extract into a staging sibling of `dest_dir`, then rename it into place.
fn extract_into_place(archive: &Path, dest_dir: &Path) -> Result<usize, FetchError> {
    let parent = dest_dir.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".depforge-extract-")
        .tempdir_in(parent)?;

    let files = extract_zip(archive, staging.path())?;
    std::fs::rename(staging.path(), dest_dir)?;
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::extract::tests::zip_bytes;
    use sha2::{Digest, Sha256};

    fn sha_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    #[tokio::test]
    async fn test_fetch_extracts_and_verifies() {
        let body = zip_bytes(&[("mimalloc-3.1.5/include/mimalloc.h", b"// header")]);
        let expected = sha_hex(&body).to_uppercase();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v3.1.5.zip")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("source");
        let url = format!("{}/v3.1.5.zip", server.url());
        let client = Client::new();

        let outcome = FetchRequest::new(&client, &url, &dest)
            .with_sha256(&expected)
            .with_cache_dir(dir.path().join("cache"))
            .execute()
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(matches!(outcome, FetchOutcome::Fetched { files: 1, .. }));
        assert!(dest.join("mimalloc-3.1.5/include/mimalloc.h").exists());
        assert!(dir.path().join("cache/v3.1.5.zip").exists());
    }

    #[tokio::test]
    async fn test_fetch_skips_existing_destination() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/src.zip")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("source");
        std::fs::create_dir_all(&dest).unwrap();
        let url = format!("{}/src.zip", server.url());
        let client = Client::new();

        let outcome = FetchRequest::new(&client, &url, &dest)
            .with_cache_dir(dir.path().join("cache"))
            .execute()
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_hash_mismatch_leaves_nothing_behind() {
        let body = zip_bytes(&[("a.txt", b"a")]);
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data.zip")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("data");
        let url = format!("{}/data.zip", server.url());
        let client = Client::new();
        let wrong = "0".repeat(64);

        let err = FetchRequest::new(&client, &url, &dest)
            .with_sha256(&wrong)
            .with_cache_dir(dir.path().join("cache"))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HashMismatch { ref expected, .. } if *expected == wrong));
        assert!(!dest.exists());
        assert!(!dir.path().join("cache/data.zip").exists());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.zip")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing");
        let url = format!("{}/missing.zip", server.url());
        let client = Client::new();
        let err = FetchRequest::new(&client, &url, &dest)
            .with_cache_dir(dir.path().join("cache"))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
        assert!(!dest.exists());
    }
}
