//! Normalized finding records produced by scanner tools.

use serde::{Deserialize, Serialize};

/// Severity class of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Normalized finding from one scanner tool.
///
/// Findings are append-only: within a tool they keep the tool's native
/// result order, across tools they keep battery invocation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Tool that produced this finding (e.g. "semgrep", "clamav").
    pub tool: String,

    /// Severity class.
    pub severity: Severity,

    /// Human-readable message.
    pub message: String,

    /// File path relative to the working tree (if applicable).
    pub file: Option<String>,

    /// Line number (if applicable).
    pub line: Option<u32>,
}

impl Finding {
    /// Create a finding with no file location.
    pub fn new(tool: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            severity,
            message: message.into(),
            file: None,
            line: None,
        }
    }

    /// Attach a file location.
    pub fn at(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    /// One-line rendering used for summaries and logs.
    pub fn render(&self) -> String {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                format!("{} {}: {} in {}:{}", self.tool, self.severity.as_str(), self.message, file, line)
            }
            (Some(file), None) => {
                format!("{} {}: {} in {}", self.tool, self.severity.as_str(), self.message, file)
            }
            _ => format!("{} {}: {}", self.tool, self.severity.as_str(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_finding_render_with_location() {
        let finding = Finding::new("bandit", Severity::Error, "use of exec detected")
            .at("pkg/server.py", Some(42));
        let line = finding.render();
        assert!(line.contains("bandit error"));
        assert!(line.contains("pkg/server.py:42"));
    }

    #[test]
    fn test_finding_render_without_location() {
        let finding = Finding::new("npm-audit", Severity::Critical, "3 critical vulnerabilities");
        assert_eq!(
            finding.render(),
            "npm-audit critical: 3 critical vulnerabilities"
        );
    }

    #[test]
    fn test_severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
