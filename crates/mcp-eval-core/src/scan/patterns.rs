//! Literal malicious-pattern sweep.
//!
//! Pure-Rust scan of every regular file's text for a small fixed set
//! of dangerous call patterns. The first matching pattern per file
//! counts once and short-circuits the remaining patterns for that
//! file.

use super::{walk_files, ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Dangerous call patterns, matched as literal substrings.
const PATTERNS: [&str; 4] = ["eval(", "exec(", "os.system(", "base64.b64decode"];

pub struct PatternScanner;

#[async_trait]
impl Scanner for PatternScanner {
    fn name(&self) -> &'static str {
        "pattern-sweep"
    }

    async fn run(&self, tree: &Path, _timeout: Duration) -> ScanOutcome {
        ScanOutcome::counted(sweep(tree))
    }
}

/// Sweep the tree in deterministic (sorted) file order.
pub fn sweep(tree: &Path) -> Vec<Finding> {
    let mut findings = Vec::new();

    for path in walk_files(tree) {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);

        for pattern in PATTERNS {
            if text.contains(pattern) {
                let rel = path
                    .strip_prefix(tree)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned();
                findings.push(
                    Finding::new(
                        "pattern-sweep",
                        Severity::Critical,
                        format!("suspicious pattern `{pattern}`"),
                    )
                    .at(rel, None),
                );
                break; // one finding per file
            }
        }
    }
    findings
}
