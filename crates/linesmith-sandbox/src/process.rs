//! Process-level isolation for script runs

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::{SandboxConfig, SandboxError};

/// Raw result of running the interpreter
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when killed by a signal or the timeout
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub timeout_secs: u64,
}

/// Run the script with a cleared environment inside `workdir`
pub async fn run_script(
    config: &SandboxConfig,
    workdir: &Path,
    script: &Path,
) -> Result<ProcessOutput, SandboxError> {
    let mut cmd = Command::new(&config.interpreter);
    cmd.args(&config.interpreter_args)
        .arg(script)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd.env_clear();

    #[cfg(windows)]
    {
        cmd.env("PATH", r"C:\Windows\System32;C:\Windows;C:\Windows\System32\Wbem");
        cmd.env("USERPROFILE", workdir.display().to_string());
    }

    #[cfg(not(windows))]
    {
        cmd.env("PATH", "/usr/local/bin:/usr/bin:/bin");
        cmd.env("HOME", workdir.display().to_string());
    }

    cmd.env("MPLBACKEND", "Agg");
    cmd.env("MPLCONFIGDIR", workdir.display().to_string());
    cmd.env("PYTHONDONTWRITEBYTECODE", "1");
    cmd.env("PYTHONUNBUFFERED", "1");

    let timeout = Duration::from_secs(config.limits.timeout_secs);
    let limit = config.limits.max_output_bytes;

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: truncate_output(&output.stdout, limit),
            stderr: truncate_output(&output.stderr, limit),
            timed_out: false,
            timeout_secs: config.limits.timeout_secs,
        }),
        Ok(Err(e)) => Err(SandboxError::Execution(format!(
            "Failed to run {}: {}",
            config.interpreter, e
        ))),
        // kill_on_drop reaps the child once the output future is dropped
        Err(_) => Ok(ProcessOutput {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
            timeout_secs: config.limits.timeout_secs,
        }),
    }
}

fn truncate_output(bytes: &[u8], limit: usize) -> String {
    if bytes.len() <= limit {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut text = String::from_utf8_lossy(&bytes[..limit]).into_owned();
    text.push_str("\n[output truncated]");
    text
}
