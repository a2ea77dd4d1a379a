//! Python-specific linter (bandit). Attempted only when the tree
//! contains Python sources; only HIGH-severity issues count.

use super::{has_file_with_extension, read_json_file, ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use crate::exec::run_command;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct BanditScanner;

#[async_trait]
impl Scanner for BanditScanner {
    fn name(&self) -> &'static str {
        "bandit"
    }

    fn applies(&self, tree: &Path) -> bool {
        has_file_with_extension(tree, "py")
    }

    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome {
        let out_file = tree.join("bandit.json");
        let cmd = vec![
            "bandit".to_string(),
            "-r".to_string(),
            tree.to_string_lossy().into_owned(),
            "-f".to_string(),
            "json".to_string(),
            "-o".to_string(),
            out_file.to_string_lossy().into_owned(),
            "-q".to_string(),
        ];

        if run_command(&cmd, None, timeout).await.is_err() {
            return ScanOutcome::failed();
        }
        let Some(doc) = read_json_file(&out_file) else {
            return ScanOutcome::failed();
        };

        ScanOutcome::counted(parse_results(&doc))
    }
}

fn parse_results(doc: &serde_json::Value) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(results) = doc.get("results").and_then(|r| r.as_array()) else {
        return findings;
    };

    for issue in results {
        if issue.get("issue_severity").and_then(|s| s.as_str()) != Some("HIGH") {
            continue;
        }
        let test_name = issue
            .get("test_name")
            .and_then(|t| t.as_str())
            .unwrap_or("unknown-test");
        let filename = issue.get("filename").and_then(|f| f.as_str());
        let line = issue
            .get("line_number")
            .and_then(|l| l.as_u64())
            .map(|l| l as u32);

        let mut finding = Finding::new("bandit", Severity::Error, test_name);
        if let Some(filename) = filename {
            finding = finding.at(filename, line);
        }
        findings.push(finding);
    }
    findings
}
