//! Interaction audit log
//!
//! Every answered question is appended to a JSON array on disk. The file is
//! rewritten in full on each append; the retrainer reads it back to learn
//! which years users care about.

use crate::error::AgentError;
use crate::models::InteractionRecord;
use crate::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// File-backed, append-only interaction log.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in append order. A missing file is an empty log; an
    /// unparsable one is `LogCorruption`.
    pub async fn read_all(&self) -> Result<Vec<InteractionRecord>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            AgentError::LogCorruption(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Like `read_all`, but a corrupt log reads as empty.
    pub async fn read_or_empty(&self) -> Result<Vec<InteractionRecord>> {
        match self.read_all().await {
            Err(AgentError::LogCorruption(reason)) => {
                warn!(%reason, "Interaction log is corrupt, treating it as empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Append one record and rewrite the whole log.
    pub async fn append(&self, record: InteractionRecord) -> Result<()> {
        let mut records = self.read_or_empty().await?;
        records.push(record);

        let body = serde_json::to_vec_pretty(&records)?;
        write_replacing(&self.path, &body).await?;

        debug!(
            path = %self.path.display(),
            records = records.len(),
            "Interaction appended"
        );

        Ok(())
    }

    /// Byte size of the log file, `None` when it does not exist.
    pub async fn size(&self) -> Result<Option<u64>> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Replace `path` with `body` via a sibling temp file and a rename.
pub(crate) async fn write_replacing(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, body).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
