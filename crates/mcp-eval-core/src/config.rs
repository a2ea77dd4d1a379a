//! Pipeline configuration, loadable from a TOML file.

use crate::domain::error::{EvalError, Result};
use crate::score::ScoreWeights;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_reports_dir() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_port() -> u16 {
    3333
}

fn default_readiness_deadline_secs() -> u64 {
    15
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    300
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

/// Configuration for the evaluation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Directory where per-job report JSON blobs are written.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Port used for live launches when the request names none.
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// Deadline for the launched server to accept TCP connections.
    #[serde(default = "default_readiness_deadline_secs")]
    pub readiness_deadline_secs: u64,

    /// Grace period between SIGTERM and SIGKILL at teardown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Timeout for each source-acquisition command (network I/O).
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Timeout for each external scanner invocation.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Whether to install production dependencies for npm packages
    /// before auditing. Lifecycle scripts are never run.
    #[serde(default = "default_true")]
    pub npm_install_deps: bool,

    /// Scoring policy.
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Anthropic model used by the LLM summarizer.
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            default_port: default_port(),
            readiness_deadline_secs: default_readiness_deadline_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            npm_install_deps: true,
            weights: ScoreWeights::default(),
            anthropic_model: default_anthropic_model(),
        }
    }
}

impl EvalConfig {
    /// Load configuration from a TOML file. Missing keys fall back to
    /// their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| EvalError::InvalidRequest(format!("bad config {}: {e}", path.display())))
    }
}
