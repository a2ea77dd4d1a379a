//! Python dependency-vulnerability checker (safety). Attempted only
//! when a requirements manifest exists; every reported vulnerability
//! counts one critical-weight unit.

use super::{ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use crate::exec::{argv, run_command};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct SafetyScanner;

#[async_trait]
impl Scanner for SafetyScanner {
    fn name(&self) -> &'static str {
        "safety"
    }

    fn applies(&self, tree: &Path) -> bool {
        tree.join("requirements.txt").is_file()
    }

    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome {
        // safety exits non-zero when vulnerabilities are reported;
        // the JSON on stdout is still the result.
        let out = match run_command(
            &argv(&["safety", "check", "--file=requirements.txt", "--json"]),
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

        ScanOutcome::counted(parse_results(&doc))
    }
}

fn parse_results(doc: &serde_json::Value) -> Vec<Finding> {
    let Some(issues) = doc.as_array() else {
        return Vec::new();
    };

    issues
        .iter()
        .map(|issue| {
            let package = issue
                .get("package_name")
                .and_then(|p| p.as_str())
                .unwrap_or("unknown-package");
            let vuln_id = issue
                .get("vuln_id")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown-vuln");
            Finding::new("safety", Severity::Critical, format!("{package} {vuln_id}"))
        })
        .collect()
}
