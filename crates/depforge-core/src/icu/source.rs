//! Fetches the ICU sources and prebuilt data into a module directory.

use std::path::{Path, PathBuf};

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use depforge_schema::Endianness;

use super::{
    ICU_DATA_BIG_SHA256, ICU_DATA_BIG_URL, ICU_DATA_LITTLE_SHA256, ICU_DATA_LITTLE_URL,
    ICU_SOURCE_SHA256, ICU_SOURCE_URL,
};
use crate::io::fetch::{FetchError, FetchRequest};
use crate::pipeline::data_file_name;
use crate::reporter::{NullReporter, Reporter};

/// Staging failures.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Downloading or extracting an archive failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Copying the data file or headers failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The data archive was extracted but the `.dat` file is missing.
    #[error("Data archive did not contain {0}")]
    MissingDataFile(PathBuf),
}

/// Paths produced by a successful [`IcuSource::stage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSource {
    /// `source/icu`, the extracted source tree.
    pub source_dir: PathBuf,
    /// The `.dat` file inside the extracted data archive.
    pub data_file: PathBuf,
    /// `include`, holding the public `unicode/` headers.
    pub include_dir: PathBuf,
    /// Headers copied into `include/unicode` by this call.
    pub headers_copied: usize,
}

/// Where and how to stage ICU for one module directory.
pub struct IcuSource<'a> {
    module_dir: PathBuf,
    endianness: Endianness,
    cache_dir: PathBuf,
    reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for IcuSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcuSource")
            .field("module_dir", &self.module_dir)
            .field("endianness", &self.endianness)
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> IcuSource<'a> {
    /// Stage into `module_dir` for the host byte order.
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            endianness: Endianness::host(),
            cache_dir: crate::cache_path(),
            reporter: &NullReporter,
        }
    }

    /// Pick the data archive for `endianness`.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Keep downloaded archives in `cache_dir`.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Send progress to `reporter`.
    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    fn data_archive(&self) -> (&'static str, &'static str) {
        match self.endianness {
            Endianness::Little => (ICU_DATA_LITTLE_URL, ICU_DATA_LITTLE_SHA256),
            Endianness::Big => (ICU_DATA_BIG_URL, ICU_DATA_BIG_SHA256),
        }
    }

    /// Stage sources, data and public headers.
    ///
    /// Downloads are skipped when their destination already exists. The
    /// data file is always recopied into `source/icu/source/data/in`;
    /// headers are only copied when `include/unicode` is absent.
    ///
    /// # Errors
    ///
    /// [`SourceError::Fetch`] when a download fails, [`SourceError::Io`] when
    /// copying fails, [`SourceError::MissingDataFile`] when the data archive
    /// lacks the expected file.
    pub async fn stage(&self, client: &Client) -> Result<StagedSource, SourceError> {
        self.stage_from(client, ICU_SOURCE_URL, Some(ICU_SOURCE_SHA256), self.data_archive())
            .await
    }

    async fn stage_from(
        &self,
        client: &Client,
        source_url: &str,
        source_sha: Option<&str>,
        (data_url, data_sha): (&str, &str),
    ) -> Result<StagedSource, SourceError> {
        self.reporter.section("icu-source");
        let source_dir = self.module_dir.join("source");
        let mut fetch = FetchRequest::new(client, source_url, &source_dir)
            .with_cache_dir(&self.cache_dir)
            .with_reporter(self.reporter);
        if let Some(sha) = source_sha {
            fetch = fetch.with_sha256(sha);
        }
        fetch.execute().await?;

        let data_dir = self.module_dir.join("data").join(self.endianness.as_str());
        FetchRequest::new(client, data_url, &data_dir)
            .with_sha256(data_sha)
            .with_cache_dir(&self.cache_dir)
            .with_reporter(self.reporter)
            .execute()
            .await?;

        let module_dir = self.module_dir.clone();
        let endianness = self.endianness;
        let staged = tokio::task::spawn_blocking(move || install_data_and_headers(&module_dir, endianness))
            .await
            .map_err(|e| SourceError::Io(std::io::Error::other(e)))??;

        info!(
            module = %self.module_dir.display(),
            endianness = self.endianness.as_str(),
            headers = staged.headers_copied,
            "ICU sources staged"
        );
        self.reporter.done("icu-source", &staged.source_dir.display().to_string());
        Ok(staged)
    }
}

fn install_data_and_headers(module_dir: &Path, endianness: Endianness) -> Result<StagedSource, SourceError> {
    let name = data_file_name(endianness);
    let fetched = module_dir.join("data").join(endianness.as_str()).join(&name);
    if !fetched.is_file() {
        return Err(SourceError::MissingDataFile(fetched));
    }

    let icu_source = module_dir.join("source").join("icu").join("source");
    let data_in = icu_source.join("data").join("in");
    std::fs::create_dir_all(&data_in)?;
    let data_file = data_in.join(&name);
    std::fs::copy(&fetched, &data_file)?;
    debug!(from = %fetched.display(), to = %data_file.display(), "copied data file");

    let include_dir = module_dir.join("include").join("unicode");
    let headers_copied = if include_dir.exists() {
        0
    } else {
        copy_headers(&icu_source.join("common").join("unicode"), &include_dir)?
    };

    Ok(StagedSource {
        source_dir: module_dir.join("source"),
        data_file,
        include_dir,
        headers_copied,
    })
}

/// Copy every top-level `*.h` from `from` into a freshly created `to`.
fn copy_headers(from: &Path, to: &Path) -> Result<usize, SourceError> {
    std::fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in WalkDir::new(from).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| SourceError::Io(std::io::Error::other(e)))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "h") {
            std::fs::copy(path, to.join(entry.file_name()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
