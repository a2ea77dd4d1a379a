//! Filesystem report sink.
//!
//! Exactly one JSON record per job, addressed by job id. Writes go to
//! a temp file in the destination directory followed by an atomic
//! rename, so readers see either no file or a complete, valid record.

use crate::domain::error::{EvalError, Result};
use crate::domain::report::{EvalRecord, JobId};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct FsReportSink {
    dir: PathBuf,
}

impl FsReportSink {
    /// Create a sink rooted at `dir`, creating the directory if
    /// needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| EvalError::Persistence(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// Path of the record for a job.
    pub fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    /// Persist the record for a job. Called exactly once per job.
    pub fn write(&self, job_id: &JobId, record: &EvalRecord) -> Result<()> {
        let content = serde_json::to_string_pretty(record)?;
        let final_path = self.path_for(job_id);
        let tmp_path = self.dir.join(format!(".{job_id}.json.tmp"));

        let mut tmp = std::fs::File::create(&tmp_path)
            .map_err(|e| EvalError::Persistence(format!("create {}: {e}", tmp_path.display())))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.sync_all())
            .map_err(|e| EvalError::Persistence(format!("write {}: {e}", tmp_path.display())))?;
        drop(tmp);

        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| EvalError::Persistence(format!("rename to {}: {e}", final_path.display())))?;

        info!(job_id = %job_id, path = %final_path.display(), "report persisted");
        Ok(())
    }

    /// Read a previously persisted record back.
    pub fn read(&self, job_id: &JobId) -> Result<EvalRecord> {
        let path = self.path_for(job_id);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| EvalError::Persistence(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| EvalError::Persistence(format!("parse {}: {e}", path.display())))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
