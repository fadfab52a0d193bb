//! Isolated test execution for concolic exploration
//!
//! Generated tests run in separate worker processes so that a crash or a
//! runaway test costs one worker, never the exploration state.
//!
//! ```text
//!   exploration loop                 master process              workers
//!  ┌──────────────────┐  port cmd  ┌────────────────┐        ┌───────────┐
//!  │ExecutorController│◀───────────│ ExecutorMaster │        │ Worker #0 │
//!  │                  │            │                │ ◀────▶ │ Worker #1 │
//!  │ MasterClient ────┼── request ▶│   WorkerPool   │        │    ...    │
//!  └──────────────────┘◀── result ─└────────────────┘        └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use concolic_executor::{ExecutorController, ExecutorMaster, ProcessWorkerLauncher};
//!
//! let mut controller = ExecutorController::bind(&config.executor).await?;
//! // concolic-master --controller-port <controller.port()?>
//! controller.init().await;
//! let client = controller.client().expect("master bound");
//! let explorer = ConcolicExplorer::new(&ctx, generator, Arc::new(client));
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, ExecutorError, Result};

pub use domain::{
    ControllerState, PortCommand, TestRunner, WorkerHello, WorkerLauncher, WorkerProcess,
};
pub use infrastructure::{
    CommandTestRunner, ExecutorController, ExecutorMaster, ExecutorWorker, JsonConnection,
    MasterClient, ProcessWorkerLauncher, WorkerPool,
};
