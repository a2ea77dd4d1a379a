//! Ephemeral, job-exclusive working tree.
//!
//! One [`WorkingTree`] is created per evaluation job and removed on
//! every exit path. The root may be redirected once during source
//! resolution (archives that unpack into a nested directory); after
//! resolution it is treated as immutable.

use crate::domain::error::{EvalError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ephemeral directory holding the acquired package source.
pub struct WorkingTree {
    dir: Option<tempfile::TempDir>,
    root: PathBuf,
}

impl WorkingTree {
    /// Create a fresh working tree under the system temp directory.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("mcp-eval-")
            .tempdir()
            .map_err(|e| EvalError::Acquisition(format!("cannot create working dir: {e}")))?;
        let root = dir.path().to_path_buf();
        debug!(root = %root.display(), "created working tree");
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    /// Current source root. Starts at the temp directory itself and
    /// may be redirected once by the resolver.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Base temp directory (unaffected by redirection).
    pub fn base(&self) -> &Path {
        self.dir
            .as_ref()
            .map(|d| d.path())
            .unwrap_or_else(|| self.root.as_path())
    }

    /// Redirect the root to a subdirectory of the base, e.g. the
    /// single directory a wheel or sdist unpacked into.
    pub fn redirect(&mut self, new_root: PathBuf) -> Result<()> {
        if !new_root.starts_with(self.base()) {
            return Err(EvalError::Acquisition(format!(
                "redirect target {} escapes working tree",
                new_root.display()
            )));
        }
        if !new_root.is_dir() {
            return Err(EvalError::Acquisition(format!(
                "redirect target {} is not a directory",
                new_root.display()
            )));
        }
        debug!(root = %new_root.display(), "redirected working tree root");
        self.root = new_root;
        Ok(())
    }

    /// Sorted relative paths of every entry under the root, plus a
    /// SHA-256 digest of the listing. Audit/debug diagnostic only;
    /// never used for scoring.
    pub fn file_listing(&self) -> Result<(Vec<String>, String)> {
        let mut paths = Vec::new();
        collect_paths(&self.root, &self.root, &mut paths)?;
        paths.sort();

        let mut hasher = Sha256::new();
        for p in &paths {
            hasher.update(p.as_bytes());
            hasher.update(b"\0");
        }
        Ok((paths, hex::encode(hasher.finalize())))
    }

    /// Remove the tree. Best-effort: failures are logged and
    /// swallowed, never surfaced to the caller.
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), error = %e, "working tree cleanup failed");
            } else {
                debug!(path = %path.display(), "removed working tree");
            }
        }
    }
}

impl Drop for WorkingTree {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn collect_paths(base: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        out.push(rel);
        if path.is_dir() && !path.is_symlink() {
            collect_paths(base, &path, out)?;
        }
    }
    Ok(())
}
