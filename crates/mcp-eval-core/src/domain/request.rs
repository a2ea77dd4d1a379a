//! Inbound evaluation request model.

use crate::domain::error::{EvalError, Result};
use serde::{Deserialize, Serialize};

/// A request to evaluate one third-party MCP package.
///
/// The package identifier may name a local directory, a git URL, a
/// Python distribution (`name==version`, wheel, sdist) or an npm
/// package. Everything else is optional; a live launch is only
/// attempted when `port` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    /// Package identifier (local path, git URL, PyPI pin, npm name).
    pub package: String,

    /// Explicit launch command override (first element is executable).
    #[serde(default)]
    pub launch_command: Option<Vec<String>>,

    /// Port the launched server should listen on. Setting this
    /// requests the live runtime test.
    #[serde(default)]
    pub port: Option<u16>,

    /// URL of the package's declared spec document, if any.
    #[serde(default)]
    pub spec_url: Option<String>,

    /// Comma-separated `KEY=VALUE` environment overrides for the
    /// launched process.
    #[serde(default)]
    pub env_overrides: Option<String>,
}

impl EvalRequest {
    /// Create a request holding only a package identifier.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            launch_command: None,
            port: None,
            spec_url: None,
            env_overrides: None,
        }
    }

    /// Validate the request. The identifier must be non-empty after
    /// trimming, and the env override string must parse.
    pub fn validate(&self) -> Result<()> {
        if self.package.trim().is_empty() {
            return Err(EvalError::InvalidRequest(
                "package identifier is empty".to_string(),
            ));
        }
        self.parsed_env()?;
        Ok(())
    }

    /// Trimmed package identifier.
    pub fn package_id(&self) -> &str {
        self.package.trim()
    }

    /// Parse the `KEY=VALUE,KEY=VALUE` override string into pairs.
    ///
    /// Empty segments are skipped; a segment without `=` or with an
    /// empty key is an [`EvalError::InvalidRequest`].
    pub fn parsed_env(&self) -> Result<Vec<(String, String)>> {
        let Some(raw) = &self.env_overrides else {
            return Ok(Vec::new());
        };

        let mut pairs = Vec::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((key, value)) = entry.split_once('=') else {
                return Err(EvalError::InvalidRequest(format!(
                    "env override '{entry}' is not KEY=VALUE"
                )));
            };
            if key.is_empty() {
                return Err(EvalError::InvalidRequest(format!(
                    "env override '{entry}' has an empty key"
                )));
            }
            pairs.push((key.to_string(), value.to_string()));
        }
        Ok(pairs)
    }

    /// Whether the caller requested a live runtime test.
    pub fn wants_live_test(&self) -> bool {
        self.port.is_some()
    }
}
