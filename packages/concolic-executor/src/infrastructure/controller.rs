//! Controller side: where the exploration driver learns the master's port

use super::client::MasterClient;
use super::connection::JsonConnection;
use crate::domain::{ControllerState, PortCommand};
use crate::error::{ExecutorError, Result};
use concolic_engine::config::ExecutorConfig;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub struct ExecutorController {
    listener: TcpListener,
    config: ExecutorConfig,
    state: ControllerState,
    /// Kept open for the master's lifetime
    master: Option<JsonConnection>,
}

impl ExecutorController {
    /// Listen on an ephemeral port of `config.host`
    pub async fn bind(config: &ExecutorConfig) -> Result<Self> {
        let address = format!("{}:0", config.host);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ExecutorError::bind(&address, e))?;
        Ok(Self {
            listener,
            config: config.clone(),
            state: ControllerState::Unbound,
            master: None,
        })
    }

    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Accept the master and read its client port. `false` when no master
    /// announced itself within the connection timeout.
    pub async fn init(&mut self) -> bool {
        self.state = ControllerState::WaitingForMasterPort;
        debug!("controller waiting for master");
        let wait = Duration::from_secs(self.config.connection_timeout_secs);
        let stream = match timeout(wait, self.listener.accept()).await {
            Ok(Ok((stream, _))) => stream,
            Ok(Err(e)) => {
                warn!(error = %e, "master accept failed");
                self.state = ControllerState::Unbound;
                return false;
            }
            Err(_) => {
                warn!("no master connected in time");
                self.state = ControllerState::Unbound;
                return false;
            }
        };

        let mut connection = JsonConnection::new(
            stream,
            Duration::from_secs(self.config.communication_timeout_secs),
        );
        match connection.receive::<PortCommand>().await {
            Some(PortCommand { port }) => {
                info!(master_port = port, "controller bound to master");
                self.state = ControllerState::Bound { master_port: port };
                self.master = Some(connection);
                true
            }
            None => {
                warn!("master sent no port command");
                self.state = ControllerState::Unbound;
                false
            }
        }
    }

    /// Client for the bound master
    pub fn client(&self) -> Option<MasterClient> {
        let port = self.state.master_port()?;
        Some(MasterClient::new(&self.config.host, port, &self.config))
    }
}
