//! Taint-tracking static analysis (CodeQL). Attempted only when the
//! tool is present on the host; counts one unit per result row.

use super::{tool_on_path, ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use crate::exec::run_command;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct CodeqlScanner;

#[async_trait]
impl Scanner for CodeqlScanner {
    fn name(&self) -> &'static str {
        "codeql"
    }

    fn applies(&self, _tree: &Path) -> bool {
        tool_on_path("codeql")
    }

    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome {
        let db = tree.join("codeql_db");
        let create = vec![
            "codeql".to_string(),
            "database".to_string(),
            "create".to_string(),
            db.to_string_lossy().into_owned(),
            "--language=python".to_string(),
            format!("--source-root={}", tree.display()),
        ];
        match run_command(&create, None, timeout).await {
            Ok(out) if out.success => {}
            _ => return ScanOutcome::failed(),
        }

        let query = vec![
            "codeql".to_string(),
            "query".to_string(),
            "run".to_string(),
            "python-taint-tracking.ql".to_string(),
            format!("--database={}", db.display()),
            "--format=csv".to_string(),
        ];
        let out = match run_command(&query, None, timeout).await {
            Ok(out) if out.success => out,
            _ => return ScanOutcome::failed(),
        };

        ScanOutcome::counted(parse_csv(&out.stdout))
    }
}

/// One finding per data row; the first line is the CSV header.
fn parse_csv(stdout: &str) -> Vec<Finding> {
    stdout
        .lines()
        .skip(1)
        .filter(|row| !row.trim().is_empty())
        .map(|row| Finding::new("codeql", Severity::Critical, format!("taint flow: {row}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_header() {
        let stdout = "source,sink,path\nrequest.args,os.system,app.py:10\ninput(),eval,run.py:4\n";
        let findings = parse_csv(stdout);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("request.args"));
    }

    #[test]
    fn test_parse_header_only_and_blank_rows() {
        assert!(parse_csv("source,sink,path\n").is_empty());
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("header\n\n\n").is_empty());
    }
}
