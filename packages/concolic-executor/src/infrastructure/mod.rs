//! Socket and process adapters for the executor roles

pub mod client;
pub mod connection;
pub mod controller;
pub mod launcher;
pub mod master;
pub mod pool;
pub mod worker;

pub use client::MasterClient;
pub use connection::{Incoming, JsonConnection};
pub use controller::ExecutorController;
pub use launcher::{ChildWorker, ProcessWorkerLauncher};
pub use master::ExecutorMaster;
pub use pool::{WorkerHandle, WorkerPool};
pub use worker::{CommandTestRunner, ExecutorWorker};
