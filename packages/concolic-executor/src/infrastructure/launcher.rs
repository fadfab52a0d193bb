//! Worker processes started from the configured binary

use crate::domain::{WorkerLauncher, WorkerProcess};
use crate::error::{ExecutorError, Result};
use async_trait::async_trait;
use concolic_engine::config::ExecutorConfig;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::debug;

const TERMINATE_WAIT: Duration = Duration::from_millis(500);

pub struct ChildWorker {
    child: Child,
}

#[async_trait]
impl WorkerProcess for ChildWorker {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn terminate(&mut self) {
        if !self.is_alive() {
            return;
        }
        let _ = self.child.start_kill();
        if tokio::time::timeout(TERMINATE_WAIT, self.child.wait()).await.is_err() {
            debug!(pid = ?self.child.id(), "worker still running after kill");
        }
    }
}

/// Spawns `worker_command --host <host> --master-port <port> --worker-id <id> worker_args..`
#[derive(Debug, Clone)]
pub struct ProcessWorkerLauncher {
    command: String,
    args: Vec<String>,
    host: String,
}

impl ProcessWorkerLauncher {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            command: config.worker_command.clone(),
            args: config.worker_args.clone(),
            host: config.host.clone(),
        }
    }
}

#[async_trait]
impl WorkerLauncher for ProcessWorkerLauncher {
    async fn launch(&self, id: usize, worker_port: u16) -> Result<Box<dyn WorkerProcess>> {
        debug!(worker = id, command = %self.command, worker_port, "starting worker process");
        let child = Command::new(&self.command)
            .arg("--host")
            .arg(&self.host)
            .arg("--master-port")
            .arg(worker_port.to_string())
            .arg("--worker-id")
            .arg(id.to_string())
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::spawn(&self.command, e))?;
        Ok(Box::new(ChildWorker { child }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let launcher = ProcessWorkerLauncher {
            command: "/nonexistent/concolic-worker".to_string(),
            args: vec![],
            host: "127.0.0.1".to_string(),
        };
        let err = launcher.launch(0, 1).await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::Spawn);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_stops_the_process() {
        let child = Command::new("sleep").arg("30").kill_on_drop(true).spawn().unwrap();
        let mut process = ChildWorker { child };
        assert!(process.is_alive());
        process.terminate().await;
        assert!(!process.is_alive());
    }
}
