//! Error types for the pipeline coordinator
//!
//! The coordinator separates two families of errors:
//!
//! - **PipelineError**: terminal conditions raised while deciding or running a
//!   pipeline (upstream export failed, empty export expired, pipeline reported a
//!   fatal error). These are recorded as failures and never retried.
//! - **CoordinatorError**: infrastructure and lookup errors (database, missing rows,
//!   scheduling). These propagate to the worker runtime, which retries the
//!   invocation and routes it to the failure path once its budget is exhausted.
//!
//! # Examples
//!
//! ```rust
//! use bulk_import::errors::{CoordinatorError, PipelineError};
//!
//! let err = PipelineError::UpstreamFailed("disk full".to_string());
//! assert_eq!(err.exception_class(), "PipelineFailedError");
//!
//! let err = CoordinatorError::not_found("tracker", 42);
//! assert!(err.is_not_found());
//! ```

pub mod coordinator;
pub mod pipeline;

pub use coordinator::CoordinatorError;
pub use pipeline::PipelineError;

/// Result type alias for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
