//! Multi-language static scanner (semgrep). Always attempted.

use super::{read_json_file, ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use crate::exec::run_command;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct SemgrepScanner;

#[async_trait]
impl Scanner for SemgrepScanner {
    fn name(&self) -> &'static str {
        "semgrep"
    }

    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome {
        let out_file = tree.join("semgrep.json");
        let cmd = vec![
            "semgrep".to_string(),
            "scan".to_string(),
            "--config".to_string(),
            "p/ci".to_string(),
            "--json".to_string(),
            "--output".to_string(),
            out_file.to_string_lossy().into_owned(),
            tree.to_string_lossy().into_owned(),
        ];

        if run_command(&cmd, None, timeout).await.is_err() {
            return ScanOutcome::failed();
        }

        // Absence of the output file counts as a tool failure, not a
        // clean scan.
        let Some(doc) = read_json_file(&out_file) else {
            return ScanOutcome::failed();
        };

        ScanOutcome::counted(parse_results(&doc))
    }
}

/// Entries at or above the warning threshold each count one unit.
fn parse_results(doc: &serde_json::Value) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(results) = doc.get("results").and_then(|r| r.as_array()) else {
        return findings;
    };

    for result in results {
        let severity = match result.get("severity").and_then(|s| s.as_str()) {
            Some("ERROR") => Severity::Error,
            Some("WARNING") => Severity::Warning,
            _ => continue,
        };
        let check_id = result
            .get("check_id")
            .and_then(|c| c.as_str())
            .unwrap_or("unknown-rule");
        let path = result.get("path").and_then(|p| p.as_str());
        let line = result
            .pointer("/start/line")
            .and_then(|l| l.as_u64())
            .map(|l| l as u32);

        let mut finding = Finding::new("semgrep", severity, check_id);
        if let Some(path) = path {
            finding = finding.at(path, line);
        }
        findings.push(finding);
    }
    findings
}
