//! Scanner orchestration.
//!
//! A fixed battery of independent analyzers runs against the resolved
//! working tree. Each tool implements the [`Scanner`] capability and
//! is independently skippable; failure of any single tool (spawn
//! error, non-zero exit, missing output file, malformed output,
//! timeout) is absorbed as "no findings from that tool" and never
//! aborts the battery.

pub mod bandit;
pub mod clamav;
pub mod codeql;
pub mod npm_audit;
pub mod patterns;
pub mod safety;
pub mod semgrep;

use crate::domain::finding::Finding;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use bandit::BanditScanner;
pub use clamav::ClamAvScanner;
pub use codeql::CodeqlScanner;
pub use npm_audit::NpmAuditScanner;
pub use patterns::PatternScanner;
pub use safety::SafetyScanner;
pub use semgrep::SemgrepScanner;

/// Result of one scanner invocation.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Normalized findings in the tool's native result order.
    pub findings: Vec<Finding>,

    /// Units counted toward the security penalty.
    pub critical_weight: u32,

    /// Whether the tool ran to a usable result. `false` means the
    /// tool was absorbed as zero findings.
    pub ok: bool,
}

impl ScanOutcome {
    /// Tool failed or produced unusable output; counts nothing.
    pub fn failed() -> Self {
        Self {
            findings: Vec::new(),
            critical_weight: 0,
            ok: false,
        }
    }

    /// Successful outcome where every finding weighs one unit.
    pub fn counted(findings: Vec<Finding>) -> Self {
        let critical_weight = findings.len() as u32;
        Self {
            findings,
            critical_weight,
            ok: true,
        }
    }
}

/// Uniform capability implemented once per external tool.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Stable tool name used in findings and logs.
    fn name(&self) -> &'static str;

    /// Whether this tool is applicable to the tree (manifest present,
    /// matching sources exist, tool installed).
    fn applies(&self, tree: &Path) -> bool {
        let _ = tree;
        true
    }

    /// Run the tool. Must not error: failures are reported through
    /// [`ScanOutcome::failed`].
    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome;
}

/// Aggregated battery result.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Findings in battery invocation order.
    pub findings: Vec<Finding>,

    /// Total critical-weight units across all tools.
    pub critical_weight: u32,

    /// Tools that produced a usable result.
    pub tools_run: usize,

    /// Tools that were attempted but absorbed as zero findings.
    pub tools_failed: usize,
}

/// The fixed battery, in invocation order.
pub fn battery() -> Vec<Box<dyn Scanner>> {
    vec![
        Box::new(SemgrepScanner),
        Box::new(BanditScanner),
        Box::new(NpmAuditScanner),
        Box::new(SafetyScanner),
        Box::new(PatternScanner),
        Box::new(ClamAvScanner),
        Box::new(CodeqlScanner),
    ]
}

/// Run a battery of scanners against the tree.
///
/// Findings are appended in battery order; within a tool, in the
/// tool's native result order. Partial tool availability degrades
/// gracefully: with every tool absent the report is empty and valid.
pub async fn run_battery(
    scanners: &[Box<dyn Scanner>],
    tree: &Path,
    tool_timeout: Duration,
) -> ScanReport {
    let mut report = ScanReport::default();

    for scanner in scanners {
        if !scanner.applies(tree) {
            debug!(tool = scanner.name(), "scanner not applicable, skipping");
            continue;
        }

        let outcome = scanner.run(tree, tool_timeout).await;
        if outcome.ok {
            report.tools_run += 1;
            debug!(
                tool = scanner.name(),
                findings = outcome.findings.len(),
                weight = outcome.critical_weight,
                "scanner completed"
            );
        } else {
            report.tools_failed += 1;
            warn!(tool = scanner.name(), "scanner failed, counting zero findings");
        }
        report.critical_weight += outcome.critical_weight;
        report.findings.extend(outcome.findings);
    }

    info!(
        findings = report.findings.len(),
        critical_weight = report.critical_weight,
        tools_run = report.tools_run,
        tools_failed = report.tools_failed,
        "scanner battery finished"
    );
    report
}

/// Sorted list of regular files under the tree. Deterministic order
/// so repeated scans of an unmodified tree agree.
pub(crate) fn walk_files(tree: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![tree.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_symlink() {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Whether any file with the given extension exists under the tree.
pub(crate) fn has_file_with_extension(tree: &Path, ext: &str) -> bool {
    walk_files(tree)
        .iter()
        .any(|p| p.extension().is_some_and(|e| e == ext))
}

/// Read and parse a JSON file; `None` on absence or malformed content.
pub(crate) fn read_json_file(path: &Path) -> Option<serde_json::Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Whether a tool binary is present on PATH.
pub(crate) fn tool_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(name).is_file())
}
