//! Worker pool
//!
//! A fixed set of workers behind a semaphore: a client task blocks until a
//! worker is idle, forwards exactly one request/response pair and hands the
//! worker back. Dead workers are replaced lazily, when next taken.
//!
//! A worker that closes its stream mid-task has crashed; the request is
//! retried once on a fresh worker. A live worker that misses the
//! communication timeout answers `ExecutionTimedOutResult` and is replaced
//! before its next use, so a late answer can never reach the wrong client.
//!
//! Respawns go through one gate: a launched worker is paired with the first
//! connection on the worker port whose hello carries its id, and strays are
//! closed.

use super::connection::{Incoming, JsonConnection};
use crate::domain::{WorkerHello, WorkerLauncher, WorkerProcess};
use concolic_engine::config::ExecutorConfig;
use concolic_engine::shared::models::ExecutionResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Launch attempts before a request is answered as failed
const RESPAWN_ATTEMPTS: usize = 3;

const FALLBACK_FAILURE: &str = r#"{"result":"executionFailedResult","message":"unencodable result"}"#;

fn encode(result: &ExecutionResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        error!(error = %e, "cannot encode execution result");
        FALLBACK_FAILURE.to_string()
    })
}

pub struct WorkerHandle {
    id: usize,
    process: Option<Box<dyn WorkerProcess>>,
    connection: Option<JsonConnection>,
}

impl WorkerHandle {
    fn new(id: usize) -> Self {
        Self {
            id,
            process: None,
            connection: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn is_alive(&mut self) -> bool {
        self.connection.is_some() && self.process.as_mut().is_some_and(|p| p.is_alive())
    }

    async fn retire(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        if let Some(mut process) = self.process.take() {
            process.terminate().await;
        }
    }
}

enum Forwarded {
    Answer(String),
    TimedOut,
    Crashed,
}

pub struct WorkerPool {
    idle: Mutex<Vec<WorkerHandle>>,
    permits: Semaphore,
    listener: TcpListener,
    /// Held from launch until the worker's connection is accepted
    respawn_gate: AsyncMutex<()>,
    launcher: Arc<dyn WorkerLauncher>,
    size: usize,
    connection_timeout: Duration,
    communication_timeout: Duration,
    launches: AtomicUsize,
}

impl WorkerPool {
    pub fn new(listener: TcpListener, launcher: Arc<dyn WorkerLauncher>, config: &ExecutorConfig) -> Self {
        let size = config.workers.max(1);
        Self {
            idle: Mutex::new((0..size).map(WorkerHandle::new).collect()),
            permits: Semaphore::new(size),
            listener,
            respawn_gate: AsyncMutex::new(()),
            launcher,
            size,
            connection_timeout: Duration::from_secs(config.connection_timeout_secs),
            communication_timeout: Duration::from_secs(config.communication_timeout_secs),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn worker_port(&self) -> std::io::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Worker launches so far, initial ones included
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Launch every worker up front; failures are left for lazy respawn
    pub async fn start(&self) {
        let mut handles = std::mem::take(&mut *self.idle.lock());
        let mut started = 0;
        for handle in &mut handles {
            if self.respawn(handle).await {
                started += 1;
            } else {
                warn!(worker = handle.id, "worker did not start, will retry on first use");
            }
        }
        self.idle.lock().extend(handles);
        info!(workers = self.size, started, "worker pool started");
    }

    async fn respawn(&self, handle: &mut WorkerHandle) -> bool {
        handle.retire().await;
        let port = match self.worker_port() {
            Ok(port) => port,
            Err(e) => {
                error!(error = %e, "worker listener lost its address");
                return false;
            }
        };
        let _gate = self.respawn_gate.lock().await;
        self.launches.fetch_add(1, Ordering::SeqCst);
        let mut process = match self.launcher.launch(handle.id, port).await {
            Ok(process) => process,
            Err(e) => {
                warn!(worker = handle.id, error = %e, "worker launch failed");
                return false;
            }
        };
        match timeout(self.connection_timeout, self.accept_worker(handle.id)).await {
            Ok(Ok(connection)) => {
                handle.process = Some(process);
                handle.connection = Some(connection);
                true
            }
            Ok(Err(e)) => {
                warn!(worker = handle.id, error = %e, "worker accept failed");
                process.terminate().await;
                false
            }
            Err(_) => {
                warn!(worker = handle.id, "worker connection timeout");
                process.terminate().await;
                false
            }
        }
    }

    /// Accept until a connection introduces itself as worker `id`
    async fn accept_worker(&self, id: usize) -> std::io::Result<JsonConnection> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let mut connection = JsonConnection::new(stream, self.communication_timeout);
            match connection.receive::<WorkerHello>().await {
                Some(WorkerHello { worker }) if worker == id => {
                    debug!(worker = id, %peer, "worker connected");
                    return Ok(connection);
                }
                Some(WorkerHello { worker }) => {
                    warn!(worker = id, announced = worker, %peer, "closing connection of another worker");
                }
                None => warn!(worker = id, %peer, "closing connection without hello"),
            }
            connection.close().await;
        }
    }

    async fn ensure_alive(&self, handle: &mut WorkerHandle) -> bool {
        for attempt in 0..RESPAWN_ATTEMPTS {
            if handle.is_alive() {
                return true;
            }
            info!(worker = handle.id, attempt, "respawning worker");
            self.respawn(handle).await;
        }
        handle.is_alive()
    }

    async fn forward(&self, handle: &mut WorkerHandle, request: &str) -> Forwarded {
        let Some(connection) = handle.connection.as_mut() else {
            return Forwarded::Crashed;
        };
        if !connection.send_line(request).await {
            return Forwarded::Crashed;
        }
        match connection.read().await {
            Incoming::Line(line) => Forwarded::Answer(line),
            Incoming::TimedOut => Forwarded::TimedOut,
            Incoming::Closed => Forwarded::Crashed,
        }
    }

    async fn process_on(&self, handle: &mut WorkerHandle, request: &str) -> String {
        for attempt in 0..2 {
            if !self.ensure_alive(handle).await {
                error!(worker = handle.id, "worker unavailable");
                return encode(&ExecutionResult::failed("worker unavailable"));
            }
            match self.forward(handle, request).await {
                Forwarded::Answer(line) => return line,
                Forwarded::TimedOut => {
                    warn!(worker = handle.id, "worker timed out");
                    handle.retire().await;
                    return encode(&ExecutionResult::timed_out("timeout"));
                }
                Forwarded::Crashed => {
                    warn!(worker = handle.id, attempt, "worker died during request");
                    handle.retire().await;
                }
            }
        }
        encode(&ExecutionResult::failed("worker died during request"))
    }

    /// Run one raw request line on an idle worker; always yields a result line
    pub async fn process(&self, request: &str) -> String {
        let Ok(_permit) = self.permits.acquire().await else {
            return encode(&ExecutionResult::failed("worker pool closed"));
        };
        let Some(mut handle) = self.idle.lock().pop() else {
            error!("permit granted with no idle worker");
            return encode(&ExecutionResult::failed("no idle worker"));
        };
        debug!(worker = handle.id, "worker selected");
        let result = self.process_on(&mut handle, request).await;
        self.idle.lock().push(handle);
        result
    }

    /// Serve one client connection: one request, one result
    pub async fn handle_client(&self, mut client: JsonConnection) {
        let peer = client.peer();
        match client.receive_line().await {
            Some(request) => {
                let result = self.process(&request).await;
                if !client.send_line(&result).await {
                    warn!(?peer, "client left before the result was delivered");
                }
            }
            None => debug!(?peer, "client sent no request"),
        }
        client.close().await;
    }

    /// Stop accepting work and terminate every idle worker
    pub async fn shutdown(&self) {
        self.permits.close();
        let handles = std::mem::take(&mut *self.idle.lock());
        for mut handle in handles {
            debug!(worker = handle.id, "terminating worker");
            handle.retire().await;
        }
    }
}
