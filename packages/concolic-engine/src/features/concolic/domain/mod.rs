//! Concolic domain: cancellation and ports

pub mod cancellation;
pub mod ports;

pub use cancellation::CancellationToken;
pub use ports::{TestCaseGenerator, TestExecutor};
