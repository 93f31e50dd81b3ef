//! MCP Transport layer

use async_trait::async_trait;
use serde_json::Value;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

/// Transport trait for MCP communication
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&mut self, message: Value) -> io::Result<()>;
    async fn receive(&mut self) -> io::Result<Option<Value>>;
    async fn close(&mut self) -> io::Result<()>;
}

/// Stdio transport for subprocess communication
pub struct StdioTransport {
    child: Child,
    reader: Option<BufReader<ChildStdout>>,
}

impl StdioTransport {
    /// Spawn the server process with piped stdin/stdout
    pub async fn spawn(command: &str, args: &[String], env: &[(String, String)]) -> io::Result<Self> {
        debug!(command, ?args, "Spawning MCP server");

        let mut child = Command::new(command)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("Failed to capture stdout"))?;

        Ok(Self {
            child,
            reader: Some(BufReader::new(stdout)),
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, message: Value) -> io::Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::other("Stdin not available"))?;

        let json = serde_json::to_string(&message)?;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;

        Ok(())
    }

    async fn receive(&mut self) -> io::Result<Option<Value>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| io::Error::other("Reader not available"))?;

        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await?;

            if n == 0 {
                return Ok(None);
            }

            // Servers may emit blank keep-alive lines
            if line.trim().is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(&line)?;
            return Ok(Some(value));
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        drop(self.child.stdin.take());
        // The process may already have exited after stdin closed
        match self.child.kill().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdio_round_trip_through_cat() {
        let mut transport = StdioTransport::spawn("cat", &[], &[]).await.unwrap();

        let message = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        transport.send(message.clone()).await.unwrap();

        let echoed = transport.receive().await.unwrap();
        assert_eq!(echoed, Some(message));

        transport.close().await.unwrap();
    }
}
