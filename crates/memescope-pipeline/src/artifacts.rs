//! Flat-file artifact storage shared by the stages.
//!
//! Layout:
//!
//! ```text
//! {data_dir}/raw/multi_source.json
//! {data_dir}/processed/memes.json
//! {data_dir}/processed/insights.json
//! {reports_dir}/report_YYYYMMDD.md
//! ```
//!
//! Every write goes to a sibling temp file that is then renamed over the
//! target, so a reader never observes a half-written artifact.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PipelineError;

const RAW_FILE: &str = "multi_source.json";
const MEMES_FILE: &str = "memes.json";
const INSIGHTS_FILE: &str = "insights.json";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    data_dir: PathBuf,
    reports_dir: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }

    #[must_use]
    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join("raw").join(RAW_FILE)
    }

    #[must_use]
    pub fn memes_path(&self) -> PathBuf {
        self.data_dir.join("processed").join(MEMES_FILE)
    }

    #[must_use]
    pub fn insights_path(&self) -> PathBuf {
        self.data_dir.join("processed").join(INSIGHTS_FILE)
    }

    /// Report file for the given calendar day.
    #[must_use]
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.reports_dir
            .join(format!("report_{}.md", date.format("%Y%m%d")))
    }

    /// Creates the raw, processed and reports directories.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] naming the directory that could not be
    /// created.
    pub async fn ensure_dirs(&self) -> Result<(), PipelineError> {
        for dir in [
            self.data_dir.join("raw"),
            self.data_dir.join("processed"),
            self.reports_dir.clone(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| PipelineError::Io { path: dir, source })?;
        }
        Ok(())
    }

    /// Pretty-prints `value` as UTF-8 JSON and writes it atomically.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Encode`] if serialization fails, [`PipelineError::Io`]
    /// if the file cannot be written or renamed.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), PipelineError> {
        let body = serde_json::to_vec_pretty(value).map_err(|source| PipelineError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &body).await
    }

    /// Writes `text` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be written or renamed.
    pub async fn write_text(&self, path: &Path, text: &str) -> Result<(), PipelineError> {
        write_atomic(path, text.as_bytes()).await
    }

    /// Reads a JSON artifact. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] for read failures other than not-found,
    /// [`PipelineError::Decode`] if the content does not deserialize.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<T>, PipelineError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PipelineError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PipelineError::Decode {
                path: path.to_path_buf(),
                source,
            })
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let mut tmp_name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|source| PipelineError::Io {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}
