//! Linesmith Sandbox - isolated code execution
//!
//! Runs model-written scripts in a throwaway directory with a cleared
//! environment and a wall-clock limit, then collects any PNG files the
//! script left behind as chart artifacts.

pub mod artifacts;
pub mod process;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use artifacts::{Chart, collect_charts};

/// Prepended to Python scripts so charts end up on disk even when the
/// script calls `plt.show()` instead of `plt.savefig()`.
pub const PYTHON_PRELUDE: &str = r#"import matplotlib as _ls_mpl
_ls_mpl.use("Agg")
import matplotlib.pyplot as _ls_plt
_ls_shown = [0]
def _ls_show(*_args, **_kwargs):
    for _num in _ls_plt.get_fignums():
        _ls_plt.figure(_num).savefig("figure-%03d.png" % _ls_shown[0])
        _ls_shown[0] += 1
    _ls_plt.close("all")
_ls_plt.show = _ls_show
"#;

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Directory under which session directories are created
    pub root: PathBuf,
    /// Interpreter executable
    pub interpreter: String,
    /// Arguments placed before the script path
    pub interpreter_args: Vec<String>,
    /// File name the code is written to inside the run directory
    pub script_name: String,
    /// Source prepended to every script
    pub prelude: Option<String>,
    /// Resource limits
    pub limits: ResourceLimits,
    /// Keep run directories after execution (debugging)
    pub keep_runs: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::python()
    }
}

impl SandboxConfig {
    /// Python with a matplotlib prelude
    pub fn python() -> Self {
        Self {
            root: std::env::temp_dir().join("linesmith-sandbox"),
            interpreter: "python3".to_string(),
            interpreter_args: Vec::new(),
            script_name: "main.py".to_string(),
            prelude: Some(PYTHON_PRELUDE.to_string()),
            limits: ResourceLimits::default(),
            keep_runs: false,
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.limits.timeout_secs = secs;
        self
    }
}

/// Resource limits for sandboxed runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Wall-clock limit per execution in seconds
    pub timeout_secs: u64,
    /// Captured stdout/stderr beyond this many bytes is cut off
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_secs: 15 * 60,
            max_output_bytes: 1024 * 1024,
        }
    }
}

/// Error raised by the executed code itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Exception class or error kind, e.g. `ZeroDivisionError`
    pub name: String,
    /// Human readable message
    pub value: String,
    /// Full stderr of the failed run
    pub traceback: String,
}

/// Outcome of one code execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub stdout: String,
    pub stderr: String,
    /// Last line of stdout, if any
    pub text: Option<String>,
    pub error: Option<ExecutionError>,
    pub charts: Vec<Chart>,
    pub duration_ms: u64,
}

impl Execution {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Sandbox errors
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Failed to create sandbox: {0}")]
    Creation(String),
    #[error("Execution failed: {0}")]
    Execution(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A reusable execution session rooted in its own directory
pub struct Sandbox {
    config: SandboxConfig,
    session_dir: PathBuf,
}

impl Sandbox {
    /// Create a new session directory under the configured root
    pub async fn create(config: SandboxConfig) -> Result<Self, SandboxError> {
        let session_dir = config.root.join(format!("session-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&session_dir)
            .await
            .map_err(|e| SandboxError::Creation(format!("{}: {}", session_dir.display(), e)))?;

        info!(session = %session_dir.display(), "Sandbox session created");
        Ok(Self { config, session_dir })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Recreate the session directory if something removed it
    pub async fn ensure_alive(&self) -> Result<(), SandboxError> {
        if tokio::fs::try_exists(&self.session_dir).await.unwrap_or(false) {
            return Ok(());
        }
        warn!(session = %self.session_dir.display(), "Sandbox session missing, recreating");
        tokio::fs::create_dir_all(&self.session_dir)
            .await
            .map_err(|e| SandboxError::Creation(e.to_string()))
    }

    /// Run `code` in a fresh run directory and collect its charts
    pub async fn execute_code(&self, code: &str) -> Result<Execution, SandboxError> {
        self.ensure_alive().await?;

        let run_dir = self.session_dir.join(format!("run-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&run_dir).await?;

        let script = match &self.config.prelude {
            Some(prelude) => format!("{}\n{}", prelude, code),
            None => code.to_string(),
        };
        let script_path = run_dir.join(&self.config.script_name);
        tokio::fs::write(&script_path, script).await?;

        let start = Instant::now();
        let output = process::run_script(&self.config, &run_dir, &script_path).await;

        let result = match output {
            Ok(output) => {
                let charts = collect_charts(&run_dir).await?;
                debug!(
                    exit_code = ?output.exit_code,
                    charts = charts.len(),
                    timed_out = output.timed_out,
                    "Sandbox run finished"
                );
                Ok(build_execution(output, charts, start.elapsed().as_millis() as u64))
            }
            Err(e) => Err(e),
        };

        if !self.config.keep_runs
            && let Err(e) = tokio::fs::remove_dir_all(&run_dir).await
        {
            warn!(run = %run_dir.display(), "Failed to clean run directory: {}", e);
        }

        result
    }

    /// Remove the session directory
    pub async fn close(&self) -> Result<(), SandboxError> {
        match tokio::fs::remove_dir_all(&self.session_dir).await {
            Ok(()) => {
                info!(session = %self.session_dir.display(), "Sandbox session closed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn build_execution(output: process::ProcessOutput, charts: Vec<Chart>, duration_ms: u64) -> Execution {
    let error = if output.timed_out {
        Some(ExecutionError {
            name: "TimeoutError".to_string(),
            value: format!("Execution timed out after {} seconds", output.timeout_secs),
            traceback: output.stderr.clone(),
        })
    } else if output.exit_code != Some(0) {
        Some(parse_error(&output.stderr, output.exit_code))
    } else {
        None
    };

    let text = output
        .stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.to_string());

    Execution {
        stdout: output.stdout,
        stderr: output.stderr,
        text,
        error,
        charts,
        duration_ms,
    }
}

/// Derive the error name and message from the last stderr line
pub fn parse_error(stderr: &str, exit_code: Option<i32>) -> ExecutionError {
    let last = stderr.lines().rev().find(|line| !line.trim().is_empty());

    let (name, value) = match last {
        Some(line) => match line.split_once(": ") {
            Some((name, value)) if is_error_name(name) => (name.to_string(), value.to_string()),
            _ => ("Error".to_string(), line.trim().to_string()),
        },
        None => (
            "Error".to_string(),
            match exit_code {
                Some(code) => format!("Process exited with code {}", code),
                None => "Process terminated by signal".to_string(),
            },
        ),
    };

    ExecutionError {
        name,
        value,
        traceback: stderr.to_string(),
    }
}

fn is_error_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && s.chars().next().is_some_and(|c| c.is_alphabetic())
}
