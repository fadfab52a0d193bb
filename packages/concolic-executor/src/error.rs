//! Error types for concolic-executor
//!
//! Only startup failures surface as errors: binding listeners, reaching the
//! controller or master, launching worker processes. Lost or late messages
//! on an established connection are `None`, never an `ExecutorError`.

use concolic_engine::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Executor error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Listener could not be bound
    Bind,
    /// Peer could not be reached in time
    Connect,
    /// Worker process could not be started
    Spawn,
    /// Malformed protocol message
    Serialization,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Bind => "bind",
            ErrorKind::Connect => "connect",
            ErrorKind::Spawn => "spawn",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct ExecutorError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ExecutorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn bind(address: impl fmt::Display, source: std::io::Error) -> Self {
        Self::new(ErrorKind::Bind, format!("cannot bind {}", address)).with_source(source)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connect, message)
    }

    pub fn spawn(command: &str, source: std::io::Error) -> Self {
        Self::new(ErrorKind::Spawn, format!("cannot start '{}'", command)).with_source(source)
    }
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        ExecutorError::new(ErrorKind::IO, format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for ExecutorError {
    fn from(err: serde_json::Error) -> Self {
        ExecutorError::new(ErrorKind::Serialization, format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<ConfigError> for ExecutorError {
    fn from(err: ConfigError) -> Self {
        ExecutorError::new(ErrorKind::Config, err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ExecutorError>;
