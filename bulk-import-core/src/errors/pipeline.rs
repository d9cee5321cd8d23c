//! Terminal pipeline error types
//!
//! Every variant ends the current attempt: the tracker is moved to `failed` and a
//! failure row is appended. Transient conditions are expressed through
//! [`PipelineOutcome::Retry`](crate::pipeline::PipelineOutcome) instead.

use thiserror::Error;

/// Errors that terminate a pipeline attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The remote export reported a failure
    #[error("Export from source instance failed: {0}")]
    UpstreamFailed(String),

    /// The remote export stayed empty past the configured timeout
    #[error("{0}")]
    Expired(String),

    /// The pipeline transformation reported a non-retryable error
    #[error("{message}")]
    Fatal {
        /// Error class reported by the pipeline
        class: String,
        /// Human readable reason
        message: String,
    },
}

impl PipelineError {
    pub fn fatal(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fatal {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Class name persisted alongside the failure
    pub fn exception_class(&self) -> &str {
        match self {
            Self::UpstreamFailed(_) => "PipelineFailedError",
            Self::Expired(_) => "PipelineExpiredError",
            Self::Fatal { class, .. } => class,
        }
    }
}
