//! Node dependency-manifest audit (npm audit). Attempted only when a
//! package.json exists at the tree root; counts the two highest
//! severity buckets from the summary.

use super::{ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use crate::exec::{argv, run_command};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct NpmAuditScanner;

#[async_trait]
impl Scanner for NpmAuditScanner {
    fn name(&self) -> &'static str {
        "npm-audit"
    }

    fn applies(&self, tree: &Path) -> bool {
        tree.join("package.json").is_file()
    }

    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome {
        // npm audit exits non-zero when vulnerabilities exist; the
        // JSON on stdout is still the result.
        let out = match run_command(
            &argv(&["npm", "audit", "--production", "--json"]),
            Some(tree),
            timeout,
        )
        .await
        {
            Ok(out) => out,
            Err(_) => return ScanOutcome::failed(),
        };

        let Ok(doc) = serde_json::from_str::<serde_json::Value>(&out.stdout) else {
            return ScanOutcome::failed();
        };

        let (findings, weight) = parse_summary(&doc);
        ScanOutcome {
            findings,
            critical_weight: weight,
            ok: true,
        }
    }
}

/// Each vulnerability in the critical and high buckets counts one
/// unit; one finding per non-empty bucket.
fn parse_summary(doc: &serde_json::Value) -> (Vec<Finding>, u32) {
    let mut findings = Vec::new();
    let mut weight = 0u32;

    for (bucket, severity) in [("critical", Severity::Critical), ("high", Severity::Error)] {
        let count = doc
            .pointer(&format!("/metadata/vulnerabilities/{bucket}"))
            .and_then(|c| c.as_u64())
            .unwrap_or(0);
        if count > 0 {
            weight += count as u32;
            findings.push(Finding::new(
                "npm-audit",
                severity,
                format!("{count} {bucket} vulnerabilities"),
            ));
        }
    }
    (findings, weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_applies_requires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!NpmAuditScanner.applies(dir.path()));
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert!(NpmAuditScanner.applies(dir.path()));
    }

    #[test]
    fn test_parse_summary_counts_critical_and_high() {
        let doc = json!({
            "metadata": {"vulnerabilities": {"critical": 2, "high": 3, "moderate": 10, "low": 4}}
        });
        let (findings, weight) = parse_summary(&doc);
        assert_eq!(weight, 5);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("2 critical"));
        assert!(findings[1].message.contains("3 high"));
    }

    #[test]
    fn test_parse_summary_empty_buckets() {
        let doc = json!({
            "metadata": {"vulnerabilities": {"critical": 0, "high": 0, "moderate": 1}}
        });
        let (findings, weight) = parse_summary(&doc);
        assert_eq!(weight, 0);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_parse_summary_missing_metadata() {
        let (findings, weight) = parse_summary(&json!({}));
        assert_eq!(weight, 0);
        assert!(findings.is_empty());
    }
}
