//! Code execution backends

use async_trait::async_trait;

use crate::charts::ChartArtifact;
use crate::error::Result;

/// Result of running one code snippet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeRun {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub text: Option<String>,
    pub error: Option<String>,
    pub traceback: Option<String>,
    pub charts: Vec<ChartArtifact>,
}

/// Runs model-written code. An `Err` means the backend could not run the
/// code at all; failures of the code itself come back as a `CodeRun` with
/// `success == false`.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, code: &str) -> Result<CodeRun>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "sandbox")]
pub use sandbox::SandboxExecutor;

#[cfg(feature = "sandbox")]
mod sandbox {
    use async_trait::async_trait;
    use linesmith_sandbox::{Execution, Sandbox, SandboxConfig};
    use tokio::sync::Mutex;
    use tracing::{info, warn};

    use super::{CodeExecutor, CodeRun};
    use crate::charts::ChartArtifact;
    use crate::error::{Error, Result};

    /// Executor over a local sandbox session, recreated once on failure
    pub struct SandboxExecutor {
        config: SandboxConfig,
        session: Mutex<Option<Sandbox>>,
    }

    impl SandboxExecutor {
        pub async fn create(config: SandboxConfig) -> Result<Self> {
            let sandbox = Sandbox::create(config.clone())
                .await
                .map_err(|e| Error::Agent(e.to_string()))?;
            Ok(Self {
                config,
                session: Mutex::new(Some(sandbox)),
            })
        }
    }

    #[async_trait]
    impl CodeExecutor for SandboxExecutor {
        async fn execute(&self, code: &str) -> Result<CodeRun> {
            let mut session = self.session.lock().await;

            if let Some(sandbox) = session.as_ref() {
                match sandbox.execute_code(code).await {
                    Ok(execution) => return Ok(to_code_run(execution)),
                    Err(e) => {
                        warn!("Sandbox execution failed, recreating session: {}", e);
                        if let Err(close_err) = sandbox.close().await {
                            warn!("Failed to close broken sandbox: {}", close_err);
                        }
                    }
                }
            }

            let sandbox = Sandbox::create(self.config.clone())
                .await
                .map_err(|e| Error::Agent(e.to_string()))?;
            info!(session = %sandbox.session_dir().display(), "Sandbox recreated");

            let execution = sandbox.execute_code(code).await;
            *session = Some(sandbox);
            execution
                .map(to_code_run)
                .map_err(|e| Error::Agent(format!("Sandbox execution failed: {}", e)))
        }

        async fn close(&self) -> Result<()> {
            if let Some(sandbox) = self.session.lock().await.take() {
                sandbox.close().await.map_err(|e| Error::Agent(e.to_string()))?;
            }
            Ok(())
        }
    }

    fn to_code_run(execution: Execution) -> CodeRun {
        let success = execution.is_success();
        let (error, traceback) = match execution.error {
            Some(err) => (Some(format!("{}: {}", err.name, err.value)), Some(err.traceback)),
            None => (None, None),
        };

        CodeRun {
            success,
            stdout: execution.stdout,
            stderr: execution.stderr,
            text: execution.text,
            error,
            traceback,
            charts: execution
                .charts
                .into_iter()
                .map(|chart| ChartArtifact {
                    index: chart.index,
                    png: chart.png,
                })
                .collect(),
        }
    }

    #[cfg(all(test, unix))]
    mod tests {
        use super::*;

        fn shell_config(root: &std::path::Path) -> SandboxConfig {
            let mut config = SandboxConfig::default()
                .with_root(root)
                .with_interpreter("sh")
                .with_timeout_secs(10);
            config.script_name = "main.sh".to_string();
            config.prelude = None;
            config
        }

        #[tokio::test]
        async fn test_executor_maps_charts_and_errors() {
            let root = tempfile::tempdir().unwrap();
            let executor = SandboxExecutor::create(shell_config(root.path())).await.unwrap();

            let ok = executor.execute("printf 'p' > chart.png").await.unwrap();
            assert!(ok.success);
            assert_eq!(ok.charts, vec![ChartArtifact { index: 0, png: b"p".to_vec() }]);

            let failed = executor.execute("echo 'KeyError: spread' >&2; exit 1").await.unwrap();
            assert!(!failed.success);
            assert_eq!(failed.error.as_deref(), Some("KeyError: spread"));
            assert!(failed.traceback.unwrap().contains("KeyError"));

            executor.close().await.unwrap();
        }

        #[tokio::test]
        async fn test_executor_recreates_after_close() {
            let root = tempfile::tempdir().unwrap();
            let executor = SandboxExecutor::create(shell_config(root.path())).await.unwrap();
            executor.close().await.unwrap();

            let run = executor.execute("echo again").await.unwrap();
            assert_eq!(run.text.as_deref(), Some("again"));
        }
    }
}
