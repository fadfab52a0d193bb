//! Worker side: answer requests from the master, one at a time

use super::connection::{Incoming, JsonConnection};
use crate::domain::{TestRunner, WorkerHello};
use crate::error::{ExecutorError, Result};
use async_trait::async_trait;
use concolic_engine::config::ExecutorConfig;
use concolic_engine::shared::models::{ExecutionResult, TestExecutionRequest};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub struct ExecutorWorker<R: TestRunner> {
    connection: JsonConnection,
    runner: R,
}

impl<R: TestRunner> ExecutorWorker<R> {
    /// Connect to the master and announce ourselves as worker `id`
    pub async fn connect(
        host: &str,
        master_port: u16,
        id: usize,
        config: &ExecutorConfig,
        runner: R,
    ) -> Result<Self> {
        let mut connection = JsonConnection::connect(
            host,
            master_port,
            Duration::from_secs(config.connection_timeout_secs),
            Duration::from_secs(config.communication_timeout_secs),
        )
        .await
        .ok_or_else(|| ExecutorError::connect(format!("master worker port {} unreachable", master_port)))?;
        if !connection.send(&WorkerHello { worker: id }).await {
            return Err(ExecutorError::connect("master did not take the worker hello"));
        }
        Ok(Self { connection, runner })
    }

    /// Serve until the master closes the connection; returns the number of
    /// requests answered
    pub async fn run(mut self) -> usize {
        let mut served = 0;
        loop {
            let line = match self.connection.read().await {
                Incoming::Line(line) => line,
                // idle between requests
                Incoming::TimedOut => continue,
                Incoming::Closed => break,
            };
            let result = match serde_json::from_str::<TestExecutionRequest>(&line) {
                Ok(request) => {
                    debug!(class = %request.klass, test = %request.test_method, "running test");
                    self.runner.run(&request).await
                }
                Err(e) => {
                    warn!(error = %e, "malformed request");
                    ExecutionResult::failed(format!("malformed request: {}", e))
                }
            };
            if !self.connection.send(&result).await {
                warn!("master did not take the result");
                break;
            }
            served += 1;
        }
        info!(served, "worker finished");
        served
    }
}

/// Runs an external command per request: request JSON on stdin, one
/// `ExecutionResult` JSON document on stdout
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTestRunner {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    async fn run_command(&self, input: &[u8]) -> std::io::Result<(bool, Vec<u8>)> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).await?;
        }
        let mut output = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout.read_to_end(&mut output).await?;
        }
        let status = child.wait().await?;
        Ok((status.success(), output))
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run(&self, request: &TestExecutionRequest) -> ExecutionResult {
        let input = match serde_json::to_vec(request) {
            Ok(input) => input,
            Err(e) => return ExecutionResult::setup_failed(e.to_string()),
        };
        let (success, output) = match timeout(self.timeout, self.run_command(&input)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                return ExecutionResult::setup_failed(format!("cannot run '{}': {}", self.command, e))
            }
            Err(_) => return ExecutionResult::timed_out(format!("'{}' timed out", self.command)),
        };
        match serde_json::from_slice::<ExecutionResult>(&output) {
            Ok(result) => result,
            Err(_) if !success => ExecutionResult::failed(format!("'{}' exited with failure", self.command)),
            Err(e) => ExecutionResult::failed(format!("unreadable runner output: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TestExecutionRequest {
        TestExecutionRequest::new("FooTest", "test0")
    }

    #[tokio::test]
    async fn test_missing_command_is_setup_failure() {
        let runner = CommandTestRunner::new("/nonexistent/runner", vec![], Duration::from_secs(5));
        let result = runner.run(&request()).await;
        assert!(matches!(result, ExecutionResult::SetupFailedResult { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_is_the_result() {
        let script = r#"cat > /dev/null; echo '{"result":"executionFailedResult","message":"boom"}'"#;
        let runner = CommandTestRunner::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_secs(5),
        );
        assert_eq!(runner.run(&request()).await, ExecutionResult::failed("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        let runner = CommandTestRunner::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(200),
        );
        let result = runner.run(&request()).await;
        assert!(matches!(result, ExecutionResult::ExecutionTimedOutResult { .. }));
    }
}
