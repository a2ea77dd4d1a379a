//! Source acquisition: classify a package identifier and materialize
//! its source tree into the working directory.

use crate::config::EvalConfig;
use crate::domain::error::{EvalError, Result};
use crate::exec::{argv, run_command, CommandOutput};
use crate::workdir::WorkingTree;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Supported package origin kinds, in classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Existing directory on local disk.
    LocalDir,
    /// Clonable git repository URL.
    GitRepo,
    /// Python distribution: version pin, wheel or sdist archive.
    PyDist,
    /// npm registry package (fallback).
    NpmPackage,
}

impl PackageKind {
    /// Classify an identifier; first match wins.
    ///
    /// Identifiers matching none of the four patterns fail with a
    /// classification error rather than silently falling through to
    /// the npm path.
    pub fn classify(identifier: &str) -> Result<PackageKind> {
        let id = identifier.trim();

        if Path::new(id).is_dir() {
            return Ok(PackageKind::LocalDir);
        }

        let is_url = id.starts_with("git+") || id.starts_with("https://") || id.starts_with("http://");
        if is_url && id.ends_with(".git") {
            return Ok(PackageKind::GitRepo);
        }

        if id.contains("==") || id.ends_with(".whl") || id.ends_with(".tar.gz") {
            return Ok(PackageKind::PyDist);
        }

        // A URL without a .git suffix matches nothing we can fetch,
        // and whitespace is never valid in an npm name.
        if is_url || id.contains(char::is_whitespace) || id.is_empty() {
            return Err(EvalError::Classification(id.to_string()));
        }

        Ok(PackageKind::NpmPackage)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::LocalDir => "local_dir",
            PackageKind::GitRepo => "git_repo",
            PackageKind::PyDist => "py_dist",
            PackageKind::NpmPackage => "npm_package",
        }
    }
}

/// Outcome of source materialization.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    /// Classified origin kind.
    pub kind: PackageKind,

    /// Number of entries in the resolved tree.
    pub files: usize,

    /// Digest of the audit file listing.
    pub listing_digest: String,
}

/// Materializes package source into a [`WorkingTree`].
pub struct SourceResolver<'a> {
    config: &'a EvalConfig,
}

impl<'a> SourceResolver<'a> {
    pub fn new(config: &'a EvalConfig) -> Self {
        Self { config }
    }

    /// Acquire the package source and place it under the tree root.
    ///
    /// Returns the classified kind (the launcher needs it for default
    /// command derivation). On return the tree root points at the
    /// package source and is immutable for the rest of the job.
    pub async fn materialize(
        &self,
        identifier: &str,
        tree: &mut WorkingTree,
    ) -> Result<ResolvedSource> {
        let id = identifier.trim();
        let kind = PackageKind::classify(id)?;
        info!(package = %id, kind = kind.as_str(), "resolving package source");

        match kind {
            PackageKind::LocalDir => self.copy_local(id, tree)?,
            PackageKind::GitRepo => self.clone_git(id, tree).await?,
            PackageKind::PyDist => self.fetch_pydist(id, tree).await?,
            PackageKind::NpmPackage => self.fetch_npm(id, tree).await?,
        }

        // Audit listing of the resolved tree. Diagnostic only.
        let (paths, digest) = tree.file_listing()?;
        info!(
            files = paths.len(),
            listing_digest = %digest,
            root = %tree.root().display(),
            "package source resolved"
        );
        for p in &paths {
            debug!(entry = %p, "resolved tree entry");
        }

        Ok(ResolvedSource {
            kind,
            files: paths.len(),
            listing_digest: digest,
        })
    }

    fn copy_local(&self, id: &str, tree: &mut WorkingTree) -> Result<()> {
        let src = PathBuf::from(id);
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string());
        let dst = tree.base().join(&name);
        copy_tree(&src, &dst)
            .map_err(|e| EvalError::Acquisition(format!("copy of {id} failed: {e}")))?;
        tree.redirect(dst)
    }

    async fn clone_git(&self, id: &str, tree: &mut WorkingTree) -> Result<()> {
        let url = id.strip_prefix("git+").unwrap_or(id);
        let dest = tree.base().to_string_lossy().into_owned();
        let out = self
            .acquire(&argv(&["git", "clone", url, &dest]), None)
            .await?;
        ensure_success("git clone", &out)
    }

    async fn fetch_pydist(&self, id: &str, tree: &mut WorkingTree) -> Result<()> {
        let base = tree.base().to_path_buf();

        // pip download handles both version pins and archive paths.
        let out = self
            .acquire(
                &argv(&["pip", "download", "--no-deps", "-d", ".", id]),
                Some(&base),
            )
            .await?;
        ensure_success("pip download", &out)?;

        // Snapshot before unpacking; extraction adds entries to the
        // same directory.
        let downloaded: Vec<PathBuf> = std::fs::read_dir(&base)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        for path in downloaded {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if name.ends_with(".whl") {
                let out = self
                    .acquire(
                        &argv(&["python", "-m", "wheel", "unpack", &name]),
                        Some(&base),
                    )
                    .await?;
                ensure_success("wheel unpack", &out)?;
            } else if name.ends_with(".gz") || name.ends_with(".bz2") {
                // -xf autodetects the compression, covering both.
                let out = self
                    .acquire(&argv(&["tar", "-xf", &name]), Some(&base))
                    .await?;
                ensure_success("tar extract", &out)?;
            }
        }

        // The archive unpacks into a nested directory; select it.
        let extracted = std::fs::read_dir(&base)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.is_dir())
            .ok_or_else(|| {
                EvalError::Acquisition(format!("no directory extracted for {id}"))
            })?;
        tree.redirect(extracted)
    }

    async fn fetch_npm(&self, id: &str, tree: &mut WorkingTree) -> Result<()> {
        let base = tree.base().to_path_buf();

        let out = self.acquire(&argv(&["npm", "pack", id]), Some(&base)).await?;
        ensure_success("npm pack", &out)?;

        // npm pack prints the tarball filename; trust the filesystem
        // over stdout in case of banner noise.
        let tgz = std::fs::read_dir(&base)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.extension().is_some_and(|e| e == "tgz"))
            .ok_or_else(|| EvalError::Acquisition(format!("npm pack produced no tarball for {id}")))?;
        let tgz_name = tgz.file_name().unwrap_or_default().to_string_lossy().into_owned();

        let out = self
            .acquire(
                &argv(&["tar", "-xzf", &tgz_name, "--strip-components=1"]),
                Some(&base),
            )
            .await?;
        ensure_success("tar extract", &out)?;

        if self.config.npm_install_deps {
            // Lifecycle scripts are never run: the package is
            // untrusted and postinstall would execute it.
            let out = self
                .acquire(
                    &argv(&["npm", "install", "--omit=dev", "--silent", "--ignore-scripts"]),
                    Some(&base),
                )
                .await?;
            ensure_success("npm install", &out)?;
        }
        Ok(())
    }

    async fn acquire(&self, cmd: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
        run_command(cmd, cwd, Duration::from_secs(self.config.acquire_timeout_secs))
            .await
            .map_err(|e| EvalError::Acquisition(e.to_string()))
    }
}

fn ensure_success(what: &str, out: &CommandOutput) -> Result<()> {
    if out.success {
        Ok(())
    } else {
        Err(EvalError::Acquisition(format!(
            "{what} exited with code {}: {}",
            out.exit_code,
            out.stderr_excerpt()
        )))
    }
}

/// Recursive verbatim copy preserving relative paths.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
