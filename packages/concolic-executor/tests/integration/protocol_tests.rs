//! Master/worker/client protocol over loopback sockets
//!
//! Workers run as in-process tasks so each test can script how they
//! misbehave: crash on a request, or never answer.

use async_trait::async_trait;
use concolic_engine::config::ExecutorConfig;
use concolic_engine::features::concolic::{CancellationToken, TestExecutor};
use concolic_engine::shared::models::{
    ExecutionCompletedResult, ExecutionResult, SymbolicState, TestExecutionRequest,
};
use concolic_executor::{
    ControllerState, ExecutorController, ExecutorMaster, ExecutorWorker, JsonConnection,
    MasterClient, TestRunner, WorkerHello, WorkerLauncher, WorkerProcess,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

// ============================================================================
// In-process workers
// ============================================================================

/// Echoes the test method back as the trace
struct EchoRunner;

#[async_trait]
impl TestRunner for EchoRunner {
    async fn run(&self, request: &TestExecutionRequest) -> ExecutionResult {
        ExecutionResult::completed(ExecutionCompletedResult::SuccessResult {
            trace: vec![request.test_method.clone()],
            symbolic_state: SymbolicState::from_clauses(vec![]),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Serve,
    /// Read one request, then drop the connection
    CrashOnRequest,
    /// Read one request and never answer
    Hang,
    /// Connect once introducing itself as another worker, then serve
    StrayThenServe,
}

struct TaskWorker(JoinHandle<()>);

#[async_trait]
impl WorkerProcess for TaskWorker {
    fn is_alive(&mut self) -> bool {
        !self.0.is_finished()
    }

    async fn terminate(&mut self) {
        self.0.abort();
    }
}

struct TaskLauncher {
    config: ExecutorConfig,
    /// Behaviour of each launch in order; `Serve` once exhausted
    plan: Mutex<VecDeque<Behaviour>>,
}

impl TaskLauncher {
    fn new(config: &ExecutorConfig, plan: &[Behaviour]) -> Arc<Self> {
        Arc::new(Self {
            config: config.clone(),
            plan: Mutex::new(plan.iter().copied().collect()),
        })
    }
}

#[async_trait]
impl WorkerLauncher for TaskLauncher {
    async fn launch(
        &self,
        id: usize,
        worker_port: u16,
    ) -> concolic_executor::Result<Box<dyn WorkerProcess>> {
        let behaviour = self.plan.lock().pop_front().unwrap_or(Behaviour::Serve);
        let config = self.config.clone();
        let task = tokio::spawn(async move {
            let wait = Duration::from_secs(config.connection_timeout_secs);
            let introduced = |worker: usize| {
                let host = config.host.clone();
                async move {
                    let mut connection = JsonConnection::connect(&host, worker_port, wait, wait)
                        .await
                        .unwrap();
                    assert!(connection.send(&WorkerHello { worker }).await);
                    connection
                }
            };
            match behaviour {
                Behaviour::Serve => {
                    serve(&config, worker_port, id).await;
                }
                Behaviour::CrashOnRequest => {
                    let mut connection = introduced(id).await;
                    connection.receive_line().await;
                }
                Behaviour::Hang => {
                    let mut connection = introduced(id).await;
                    connection.receive_line().await;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Behaviour::StrayThenServe => {
                    let _stray = introduced(id + 100).await;
                    serve(&config, worker_port, id).await;
                }
            }
        });
        Ok(Box::new(TaskWorker(task)))
    }
}

async fn serve(config: &ExecutorConfig, worker_port: u16, id: usize) {
    let worker = ExecutorWorker::connect(&config.host, worker_port, id, config, EchoRunner)
        .await
        .unwrap();
    worker.run().await;
}

// ============================================================================
// Helpers
// ============================================================================

fn config(workers: usize, communication_timeout_secs: u64) -> ExecutorConfig {
    ExecutorConfig {
        workers,
        connection_timeout_secs: 5,
        communication_timeout_secs,
        ..ExecutorConfig::default()
    }
}

struct RunningMaster {
    master: Arc<ExecutorMaster>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl RunningMaster {
    async fn start(config: &ExecutorConfig, plan: &[Behaviour]) -> Self {
        let master = Arc::new(
            ExecutorMaster::bind(config, TaskLauncher::new(config, plan))
                .await
                .unwrap(),
        );
        let shutdown = CancellationToken::new();
        let task = {
            let master = Arc::clone(&master);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { master.run(shutdown).await })
        };
        Self {
            master,
            shutdown,
            task,
        }
    }

    /// Client with a longer patience than the master's workers
    fn client(&self) -> MasterClient {
        MasterClient::new("127.0.0.1", self.master.client_port().unwrap(), &config(1, 30))
    }

    fn launches(&self) -> usize {
        self.master.pool().launches()
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap();
    }
}

fn request(test: &str) -> TestExecutionRequest {
    TestExecutionRequest::new("FooTest", test)
}

fn trace_of(result: Option<ExecutionResult>) -> Vec<String> {
    match result {
        Some(ExecutionResult::ExecutionCompletedResult {
            completed: ExecutionCompletedResult::SuccessResult { trace, .. },
        }) => trace,
        other => panic!("expected a successful run, got {:?}", other),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_request_round_trip() {
    let master = RunningMaster::start(&config(1, 5), &[]).await;
    let client = master.client();

    assert_eq!(trace_of(client.execute(&request("test0")).await), vec!["test0"]);
    assert_eq!(trace_of(client.execute(&request("test1")).await), vec!["test1"]);
    assert_eq!(master.launches(), 1);
    master.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_share_the_pool() {
    let master = RunningMaster::start(&config(2, 5), &[]).await;
    let client = master.client();

    let (ra, rb, rc, rd) = (request("a"), request("b"), request("c"), request("d"));
    let (a, b, c, d) = tokio::join!(
        client.execute(&ra),
        client.execute(&rb),
        client.execute(&rc),
        client.execute(&rd),
    );
    assert_eq!(trace_of(a), vec!["a"]);
    assert_eq!(trace_of(b), vec!["b"]);
    assert_eq!(trace_of(c), vec!["c"]);
    assert_eq!(trace_of(d), vec!["d"]);
    assert_eq!(master.launches(), 2);
    master.stop().await;
}

#[tokio::test]
async fn test_controller_learns_client_port() {
    let config = config(1, 5);
    let mut controller = ExecutorController::bind(&config).await.unwrap();
    let mut master = ExecutorMaster::bind(&config, TaskLauncher::new(&config, &[]))
        .await
        .unwrap();
    master.announce(controller.port().unwrap()).await.unwrap();

    assert!(controller.init().await);
    assert_eq!(
        controller.state(),
        ControllerState::Bound {
            master_port: master.client_port().unwrap()
        }
    );

    let master = Arc::new(master);
    let shutdown = CancellationToken::new();
    let task = {
        let (master, shutdown) = (Arc::clone(&master), shutdown.clone());
        tokio::spawn(async move { master.run(shutdown).await })
    };
    let client = controller.client().unwrap();
    assert_eq!(trace_of(client.execute(&request("viaController")).await), vec!["viaController"]);
    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_dead_worker_is_respawned_once() {
    let master = RunningMaster::start(&config(1, 5), &[Behaviour::CrashOnRequest]).await;
    let client = master.client();

    assert_eq!(trace_of(client.execute(&request("retried")).await), vec!["retried"]);
    assert_eq!(master.launches(), 2);

    assert_eq!(trace_of(client.execute(&request("after")).await), vec!["after"]);
    assert_eq!(master.launches(), 2);
    master.stop().await;
}

#[tokio::test]
async fn test_silent_worker_times_out_and_is_replaced() {
    let master = RunningMaster::start(&config(1, 1), &[Behaviour::Hang]).await;
    let client = master.client();

    let result = client.execute(&request("slow")).await;
    assert!(matches!(
        result,
        Some(ExecutionResult::ExecutionTimedOutResult { .. })
    ));
    assert_eq!(master.launches(), 1);

    assert_eq!(trace_of(client.execute(&request("next")).await), vec!["next"]);
    assert_eq!(master.launches(), 2);
    master.stop().await;
}

#[tokio::test]
async fn test_worker_pairs_with_its_own_connection() {
    let master = RunningMaster::start(&config(1, 5), &[Behaviour::StrayThenServe]).await;
    let client = master.client();

    assert_eq!(trace_of(client.execute(&request("paired")).await), vec!["paired"]);
    assert_eq!(master.launches(), 1);
    master.stop().await;
}

#[tokio::test]
async fn test_unreachable_master_is_a_lost_result() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = MasterClient::new("127.0.0.1", port, &config(1, 1));
    assert_eq!(client.execute(&request("nobody")).await, None);
}
