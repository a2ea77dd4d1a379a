//! Sandboxed launch and teardown of the package's server process.
//!
//! The launched executable is untrusted and attacker-controlled: its
//! stdio is suppressed, readiness is verified by polling the target
//! port with a deadline, and teardown is two-phase (SIGTERM, grace
//! period, SIGKILL) on every exit path of the enclosing job.

use crate::config::EvalConfig;
use crate::domain::error::{EvalError, Result};
use crate::resolve::PackageKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Fully derived launch parameters for one server process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Port the server is expected to listen on.
    pub port: u16,

    /// Environment overrides merged over the parent environment
    /// (override wins on key collision).
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Build a launch spec, deriving a default command from the
    /// package kind when the request carries no override.
    pub fn derive(
        kind: PackageKind,
        package_id: &str,
        explicit: Option<Vec<String>>,
        port: u16,
        env: Vec<(String, String)>,
    ) -> Result<Self> {
        let command = match explicit {
            Some(cmd) if !cmd.is_empty() => cmd,
            _ => default_command(kind, package_id, port)?,
        };
        Ok(Self { command, port, env })
    }
}

fn default_command(kind: PackageKind, package_id: &str, port: u16) -> Result<Vec<String>> {
    match kind {
        PackageKind::PyDist => {
            let module = python_module_name(package_id);
            Ok(vec![
                "python".to_string(),
                "-m".to_string(),
                module,
                "--port".to_string(),
                port.to_string(),
            ])
        }
        PackageKind::NpmPackage => Ok(vec![
            "node".to_string(),
            "server.js".to_string(),
            "--port".to_string(),
            port.to_string(),
        ]),
        _ => Err(EvalError::Launch(format!(
            "no launch command given and none can be derived for a {} package",
            kind.as_str()
        ))),
    }
}

/// Module name of a Python distribution: the part before any version
/// pin, with hyphens folded to underscores.
fn python_module_name(package_id: &str) -> String {
    let name = package_id.split("==").next().unwrap_or(package_id);
    // Wheel filenames carry the distribution name before the first '-'.
    let name = if name.ends_with(".whl") || name.ends_with(".tar.gz") {
        name.split('-').next().unwrap_or(name)
    } else {
        name
    };
    name.replace('-', "_")
}

/// Handle to a running server process; owns termination.
pub struct ServerHandle {
    child: Child,
    pid: Option<u32>,
    port: u16,
}

impl ServerHandle {
    /// Spawn the server in the working tree and wait for readiness.
    ///
    /// Readiness is a bounded polling loop: TCP connect attempts
    /// against the target port every 250 ms until the configured
    /// deadline; expiry is a [`EvalError::Launch`].
    pub async fn launch(spec: &LaunchSpec, tree_root: &Path, config: &EvalConfig) -> Result<Self> {
        let Some((exe, args)) = spec.command.split_first() else {
            return Err(EvalError::Launch("empty launch command".to_string()));
        };

        info!(command = %spec.command.join(" "), port = spec.port, "launching server process");

        let child = Command::new(exe)
            .args(args)
            .current_dir(tree_root)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Backstop: if the handle is dropped without shutdown,
            // the child still dies with the job.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EvalError::Launch(format!("failed to spawn '{exe}': {e}")))?;

        let pid = child.id();
        let mut handle = Self {
            child,
            pid,
            port: spec.port,
        };

        let deadline = Duration::from_secs(config.readiness_deadline_secs);
        if let Err(e) = handle.wait_ready(deadline).await {
            // The process never became ready; do not leak it.
            handle.shutdown(Duration::from_secs(config.shutdown_grace_secs)).await;
            return Err(e);
        }

        info!(port = spec.port, pid = ?pid, "server is accepting connections");
        Ok(handle)
    }

    async fn wait_ready(&mut self, deadline: Duration) -> Result<()> {
        let poll = Duration::from_millis(250);
        let start = tokio::time::Instant::now();
        let addr = format!("127.0.0.1:{}", self.port);

        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(EvalError::Launch(format!(
                    "server exited during startup with {status}"
                )));
            }
            if TcpStream::connect(&addr).await.is_ok() {
                return Ok(());
            }
            if start.elapsed() >= deadline {
                return Err(EvalError::Launch(format!(
                    "port {} never became ready within {}s",
                    self.port,
                    deadline.as_secs()
                )));
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Port the server was launched on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Two-phase termination: SIGTERM, grace wait, then SIGKILL.
    ///
    /// Best-effort: failures are logged and swallowed so teardown can
    /// never mask the job's own outcome.
    pub async fn shutdown(&mut self, grace: Duration) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return; // already exited
        }

        if let Some(pid) = self.pid {
            let term = Command::new("kill")
                .args(["-TERM", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if let Err(e) = term {
                warn!(pid, error = %e, "SIGTERM delivery failed");
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(status = %status, "server terminated gracefully");
                return;
            }
            Ok(Err(e)) => warn!(error = %e, "wait after SIGTERM failed"),
            Err(_) => warn!(grace_secs = grace.as_secs(), "server ignored SIGTERM, escalating"),
        }

        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "SIGKILL delivery failed");
            return;
        }
        if let Err(e) = self.child.wait().await {
            warn!(error = %e, "wait after SIGKILL failed");
        } else {
            info!("server force-killed");
        }
    }
}

/// Merge parent environment with request overrides; override wins.
pub fn merged_env(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = std::env::vars().collect();
    for (key, value) in overrides {
        if let Some(slot) = env.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.clone();
        } else {
            env.push((key.clone(), value.clone()));
        }
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_module_name_folds_hyphens() {
        assert_eq!(python_module_name("left-pad==1.3.0"), "left_pad");
        assert_eq!(python_module_name("mcp-server"), "mcp_server");
    }

    #[test]
    fn test_default_command_python() {
        let cmd = default_command(PackageKind::PyDist, "left-pad==1.3.0", 4000).unwrap();
        assert_eq!(cmd[..3], ["python", "-m", "left_pad"].map(String::from));
        assert!(cmd.contains(&"4000".to_string()));
    }

    #[test]
    fn test_default_command_node() {
        let cmd = default_command(PackageKind::NpmPackage, "express", 3333).unwrap();
        assert_eq!(cmd[0], "node");
        assert_eq!(cmd[1], "server.js");
    }

    #[test]
    fn test_default_command_unavailable_for_local() {
        assert!(default_command(PackageKind::LocalDir, "./pkg", 3333).is_err());
    }

    #[test]
    fn test_explicit_command_wins() {
        let spec = LaunchSpec::derive(
            PackageKind::LocalDir,
            "./pkg",
            Some(vec!["./run.sh".to_string()]),
            3333,
            vec![],
        )
        .unwrap();
        assert_eq!(spec.command, vec!["./run.sh".to_string()]);
    }

    #[test]
    fn test_merged_env_override_wins() {
        std::env::set_var("MCP_EVAL_TEST_VAR", "parent");
        let env = merged_env(&[("MCP_EVAL_TEST_VAR".to_string(), "override".to_string())]);
        let value = env
            .iter()
            .find(|(k, _)| k == "MCP_EVAL_TEST_VAR")
            .map(|(_, v)| v.clone());
        assert_eq!(value.as_deref(), Some("override"));
        // No duplicate key after merge.
        assert_eq!(env.iter().filter(|(k, _)| k == "MCP_EVAL_TEST_VAR").count(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_when_process_exits() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec {
            command: vec!["false".to_string()],
            port: 49999,
            env: vec![],
        };
        let mut config = EvalConfig::default();
        config.readiness_deadline_secs = 2;
        config.shutdown_grace_secs = 1;

        let err = ServerHandle::launch(&spec, dir.path(), &config)
            .await
            .map(|_| ())
            .expect_err("false can never become ready");
        assert!(matches!(err, EvalError::Launch(_)));
    }

    #[tokio::test]
    async fn test_shutdown_terminates_running_process() {
        let dir = tempfile::tempdir().unwrap();
        let child = Command::new("sleep")
            .arg("30")
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id();
        let mut handle = ServerHandle {
            child,
            pid,
            port: 0,
        };

        handle.shutdown(Duration::from_secs(2)).await;
        // After shutdown the child must have exited.
        let status = handle.child.try_wait().unwrap();
        assert!(status.is_some(), "process should no longer be running");
    }
}
