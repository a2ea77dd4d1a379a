//! Bounded execution of external commands.
//!
//! Every acquisition step and scanner tool goes through
//! [`run_command`]: argument-vector invocation (no shell), captured
//! output, and a hard timeout so no external call can stall a job
//! indefinitely.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Captured result of an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (-1 if terminated by signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Whether the process exited successfully.
    pub success: bool,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    /// First line of stderr, for compact error messages.
    pub fn stderr_excerpt(&self) -> &str {
        self.stderr.lines().next().unwrap_or("").trim()
    }
}

/// Run a command with captured output and a hard timeout.
///
/// Errors on empty argv, spawn failure, and timeout expiry. A non-zero
/// exit is not an error here; callers decide what it means.
pub async fn run_command(
    argv: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> anyhow::Result<CommandOutput> {
    let start = Instant::now();

    let Some((exe, args)) = argv.split_first() else {
        anyhow::bail!("empty command");
    };

    debug!(command = %argv.join(" "), cwd = ?cwd, "running external command");

    let mut cmd = Command::new(exe);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // A timed-out child must not outlive the job.
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn()?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "command '{}' timed out after {} seconds",
                argv.join(" "),
                timeout.as_secs()
            )
        })??;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Convenience for building an argv from string literals.
pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
