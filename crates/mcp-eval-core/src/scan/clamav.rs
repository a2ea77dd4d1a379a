//! Malware signature scan (clamscan). Each infected-file report
//! counts one critical-weight unit.

use super::{ScanOutcome, Scanner};
use crate::domain::finding::{Finding, Severity};
use crate::exec::run_command;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct ClamAvScanner;

#[async_trait]
impl Scanner for ClamAvScanner {
    fn name(&self) -> &'static str {
        "clamav"
    }

    async fn run(&self, tree: &Path, timeout: Duration) -> ScanOutcome {
        let cmd = vec![
            "clamscan".to_string(),
            "-r".to_string(),
            "--infected".to_string(),
            "--no-summary".to_string(),
            tree.to_string_lossy().into_owned(),
        ];

        // clamscan exits 1 when infections are found; only spawn
        // failure or an unexpected exit code is a tool failure.
        let out = match run_command(&cmd, None, timeout).await {
            Ok(out) => out,
            Err(_) => return ScanOutcome::failed(),
        };
        if out.exit_code != 0 && out.exit_code != 1 {
            return ScanOutcome::failed();
        }

        ScanOutcome::counted(parse_stdout(&out.stdout))
    }
}

/// Lines look like `/path/to/file: Signature-Name FOUND`.
fn parse_stdout(stdout: &str) -> Vec<Finding> {
    stdout
        .lines()
        .filter(|line| line.ends_with("FOUND"))
        .map(|line| {
            let file = line.split(':').next().unwrap_or(line).trim();
            Finding::new("clamav", Severity::Critical, "infected file").at(file, None)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_infected_lines() {
        let stdout = "/tmp/pkg/evil.js: Win.Trojan.Agent-123 FOUND\n/tmp/pkg/ok.js: OK\n/tmp/pkg/worse.py: Unix.Malware-9 FOUND\n";
        let findings = parse_stdout(stdout);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].file.as_deref(), Some("/tmp/pkg/evil.js"));
        assert_eq!(findings[1].file.as_deref(), Some("/tmp/pkg/worse.py"));
        assert!(findings.iter().all(|f| f.severity == Severity::Critical));
    }

    #[test]
    fn test_parse_clean_output() {
        assert!(parse_stdout("").is_empty());
        assert!(parse_stdout("/tmp/pkg/a.js: OK\n").is_empty());
    }
}
