//! Master: client listener in front of the worker pool

use super::connection::JsonConnection;
use super::pool::WorkerPool;
use crate::domain::{PortCommand, WorkerLauncher};
use crate::error::{ExecutorError, Result};
use concolic_engine::config::ExecutorConfig;
use concolic_engine::features::concolic::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub struct ExecutorMaster {
    clients: TcpListener,
    pool: Arc<WorkerPool>,
    config: ExecutorConfig,
    /// Held open so the controller sees the master's lifetime
    controller: Option<TcpStream>,
}

async fn bind(host: &str) -> Result<TcpListener> {
    let address = format!("{}:0", host);
    TcpListener::bind(&address)
        .await
        .map_err(|e| ExecutorError::bind(&address, e))
}

impl ExecutorMaster {
    /// Bind the client and worker listeners on ephemeral ports
    pub async fn bind(config: &ExecutorConfig, launcher: Arc<dyn WorkerLauncher>) -> Result<Self> {
        let clients = bind(&config.host).await?;
        let workers = bind(&config.host).await?;
        Ok(Self {
            clients,
            pool: Arc::new(WorkerPool::new(workers, launcher, config)),
            config: config.clone(),
            controller: None,
        })
    }

    pub fn client_port(&self) -> Result<u16> {
        Ok(self.clients.local_addr()?.port())
    }

    pub fn worker_port(&self) -> Result<u16> {
        Ok(self.pool.worker_port()?)
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Tell the controller where clients connect
    pub async fn announce(&mut self, controller_port: u16) -> Result<()> {
        let wait = Duration::from_secs(self.config.connection_timeout_secs);
        let mut stream = timeout(wait, TcpStream::connect((self.config.host.as_str(), controller_port)))
            .await
            .map_err(|_| {
                ExecutorError::connect(format!("controller on port {} did not answer", controller_port))
            })??;
        let command = PortCommand {
            port: self.client_port()?,
        };
        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        debug!(controller_port, client_port = command.port, "announced to controller");
        self.controller = Some(stream);
        Ok(())
    }

    /// Launch the workers, then serve clients until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) {
        self.pool.start().await;
        let wait = Duration::from_secs(self.config.connection_timeout_secs);
        info!(port = ?self.client_port().ok(), workers = self.pool.size(), "master accepting clients");

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = timeout(wait, self.clients.accept()) => accepted,
            };
            match accepted {
                Ok(Ok((stream, peer))) => {
                    debug!(%peer, "client connected");
                    let pool = Arc::clone(&self.pool);
                    let connection = JsonConnection::new(
                        stream,
                        Duration::from_secs(self.config.communication_timeout_secs),
                    );
                    tokio::spawn(async move { pool.handle_client(connection).await });
                }
                Ok(Err(e)) => warn!(error = %e, "client accept failed"),
                Err(_) => debug!("master is waiting for clients"),
            }
        }

        info!("master shutting down");
        self.pool.shutdown().await;
    }
}
