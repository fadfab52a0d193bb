//! Domain layer for the isolated executor
//!
//! # Roles
//!
//! - **Controller**: owned by the exploration driver, learns where the
//!   master accepts clients
//! - **Master**: accepts clients and workers, proxies each client request to
//!   one idle worker
//! - **Worker**: separate process, runs one test per request
//! - **Client**: one connection per request, from the exploration loop to
//!   the master
//!
//! Every message is a single JSON document followed by `\n`.

use async_trait::async_trait;
use concolic_engine::shared::models::{ExecutionResult, TestExecutionRequest};
use serde::{Deserialize, Serialize};

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Messages
// ═══════════════════════════════════════════════════════════════════════════

/// Sent once by the master to the controller: where clients connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCommand {
    pub port: u16,
}

/// First line a worker sends after connecting, so the master pairs the
/// connection with the process it launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHello {
    pub worker: usize,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unbound,
    WaitingForMasterPort,
    Bound { master_port: u16 },
}

impl ControllerState {
    pub fn master_port(&self) -> Option<u16> {
        match self {
            ControllerState::Bound { master_port } => Some(*master_port),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Ports
// ═══════════════════════════════════════════════════════════════════════════

/// Runs one generated test inside a worker
///
/// Failures of the test itself are result variants; a runner never errors.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, request: &TestExecutionRequest) -> ExecutionResult;
}

/// A launched worker, whatever hosts it
#[async_trait]
pub trait WorkerProcess: Send {
    fn is_alive(&mut self) -> bool;

    /// Stop the worker; no-op if it already exited
    async fn terminate(&mut self);
}

/// Starts worker `id`, which connects back to `worker_port` and introduces
/// itself with a [`WorkerHello`]
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn launch(&self, id: usize, worker_port: u16) -> Result<Box<dyn WorkerProcess>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_command_wire_format() {
        let json = serde_json::to_string(&PortCommand { port: 4242 }).unwrap();
        assert_eq!(json, r#"{"port":4242}"#);
        let back: PortCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, 4242);
    }

    #[test]
    fn test_worker_hello_wire_format() {
        let json = serde_json::to_string(&WorkerHello { worker: 3 }).unwrap();
        assert_eq!(json, r#"{"worker":3}"#);
    }

    #[test]
    fn test_only_bound_has_port() {
        assert_eq!(ControllerState::Unbound.master_port(), None);
        assert_eq!(ControllerState::WaitingForMasterPort.master_port(), None);
        assert_eq!(
            ControllerState::Bound { master_port: 7 }.master_port(),
            Some(7)
        );
    }
}
