use thiserror::Error;

use super::pipeline::PipelineError;

/// Infrastructure errors surfaced by the coordinator
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// A lookup by identifier found nothing
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of row that was looked up
        resource: &'static str,
        /// Identifier that was requested
        id: i32,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A status event is not allowed from the current status
    #[error("Cannot apply '{event}' to a tracker in status '{from}'")]
    InvalidTransition {
        /// Status the tracker was in
        from: String,
        /// Event that was rejected
        event: String,
    },

    /// A terminal pipeline error; recorded as a failure, never retried
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The tracker names a pipeline that is not registered
    #[error("Pipeline '{0}' is not registered")]
    UnknownPipeline(String),

    /// The scheduling runtime rejected a job
    #[error("Failed to schedule job: {0}")]
    Scheduling(anyhow::Error),

    /// Anything else, including errors raised by collaborators
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl CoordinatorError {
    pub fn not_found(resource: &'static str, id: i32) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Terminal errors go straight to the failure path instead of the runtime retry
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }

    /// Short class name used when the error ends up in a failure row
    pub fn exception_class(&self) -> &str {
        match self {
            Self::Pipeline(err) => err.exception_class(),
            Self::NotFound { .. } => "NotFound",
            Self::Database(_) => "DatabaseError",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::UnknownPipeline(_) => "UnknownPipeline",
            Self::Scheduling(_) => "SchedulingError",
            Self::Unexpected(_) => "UnexpectedError",
        }
    }
}
