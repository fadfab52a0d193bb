//! Pipeline errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("inlining failed: {0}")]
    Inlining(String),

    #[error("{pass} failed: {message}")]
    Pass { pass: &'static str, message: String },
}

impl PipelineError {
    pub fn inlining(msg: impl Into<String>) -> Self {
        Self::Inlining(msg.into())
    }

    pub fn pass(pass: &'static str, message: impl Into<String>) -> Self {
        Self::Pass {
            pass,
            message: message.into(),
        }
    }
}
