use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::models::job::{JobResult, OutputArtifact};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host of `url` without a leading `www.`, or `local` when there is none.
pub fn output_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").unwrap_or(&host).to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

pub fn output_filename(url: &str, job_id: Uuid) -> String {
    format!("{}-{}.json", output_domain(url), job_id)
}

/// Writes finished jobs as `{domain}-{job_id}.json` into a flat directory.
#[derive(Debug, Clone)]
pub struct ResultPersister {
    dir: PathBuf,
    app_url: String,
}

impl ResultPersister {
    pub fn new(dir: PathBuf, app_url: impl Into<String>) -> Self {
        Self {
            dir,
            app_url: app_url.into(),
        }
    }

    /// Ensure the output directory exists and is a directory.
    pub fn prepare(&self) -> Result<(), PersistError> {
        if self.dir.exists() {
            let meta = fs::metadata(&self.dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
            if !meta.is_dir() {
                return Err(PersistError::OutputDir("path is not a directory".into()));
            }
        } else {
            fs::create_dir_all(&self.dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        }
        Ok(())
    }

    pub fn artifact(&self, job_id: Uuid, url: &str, started_at: DateTime<Utc>) -> OutputArtifact {
        let filename = output_filename(url, job_id);
        OutputArtifact {
            path: self.dir.join(&filename),
            domain: output_domain(url),
            filename,
            started_at,
            job_id,
        }
    }

    pub fn result_url(&self, artifact: &OutputArtifact) -> String {
        format!("{}/download/{}", self.app_url, artifact.filename)
    }

    /// Atomically write `result` to its artifact path. Existing files are
    /// replaced.
    pub fn write(&self, result: &JobResult) -> Result<PathBuf, PersistError> {
        self.prepare()?;

        let target = &result.artifact.path;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(serde_json::to_string_pretty(result)?.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;

        tracing::info!(path = %target.display(), "persisted job result");
        Ok(target.clone())
    }

    /// Result persisted for `job_id`, located by its `-{job_id}.json` suffix.
    pub fn load(&self, job_id: Uuid) -> Option<JobResult> {
        let suffix = format!("-{job_id}.json");
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(dir = %self.dir.display(), error = %err, "output directory unreadable");
                return None;
            }
        };

        let path = entries.filter_map(Result::ok).map(|entry| entry.path()).find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&suffix))
        })?;

        match read_result(&path) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable job artifact");
                None
            }
        }
    }

    /// Path of a previously written artifact, if `filename` names one.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let plain = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && filename != "."
            && filename != "..";
        if !plain {
            return None;
        }
        let path = self.dir.join(filename);
        path.is_file().then_some(path)
    }
}

fn read_result(path: &Path) -> Result<JobResult, PersistError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
