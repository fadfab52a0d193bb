//! Client side of the master protocol
//!
//! One connection per request. Anything that keeps the result from
//! arriving (master unreachable, timeout, closed stream) is a lost
//! execution: `None`, never retried here.

use super::connection::JsonConnection;
use async_trait::async_trait;
use concolic_engine::config::ExecutorConfig;
use concolic_engine::features::concolic::TestExecutor;
use concolic_engine::shared::models::{ExecutionResult, TestExecutionRequest};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct MasterClient {
    host: String,
    port: u16,
    connection_timeout: Duration,
    communication_timeout: Duration,
}

impl MasterClient {
    pub fn new(host: &str, port: u16, config: &ExecutorConfig) -> Self {
        Self {
            host: host.to_string(),
            port,
            connection_timeout: Duration::from_secs(config.connection_timeout_secs),
            communication_timeout: Duration::from_secs(config.communication_timeout_secs),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl TestExecutor for MasterClient {
    async fn execute(&self, request: &TestExecutionRequest) -> Option<ExecutionResult> {
        let Some(mut connection) = JsonConnection::connect(
            &self.host,
            self.port,
            self.connection_timeout,
            self.communication_timeout,
        )
        .await
        else {
            warn!(port = self.port, "master unreachable");
            return None;
        };
        if !connection.send(request).await {
            debug!(test = %request.test_method, "request not delivered");
            return None;
        }
        let result = connection.receive::<ExecutionResult>().await;
        if result.is_none() {
            debug!(test = %request.test_method, "no result from master");
        }
        connection.close().await;
        result
    }
}
