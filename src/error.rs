//! Unified error handling for the path-analyzer library.
//!
//! Every fallible operation in the crate returns [`Result`], so callers get
//! one error type whether a failure came from input validation, the elevation
//! service, or the worker pool.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Underlying error that caused a [`PathError`].
pub type ErrorSource = Arc<dyn Error + Send + Sync>;

/// Unified error type for path analysis operations.
///
/// Equality compares kind and message only; the attached source is ignored.
#[derive(Debug, Clone)]
pub enum PathError {
    /// Path has too few valid points, or raw input could not be parsed
    InvalidInput {
        message: String,
        source: Option<ErrorSource>,
    },
    /// The external elevation service failed (not retried internally)
    ElevationLookupFailed {
        message: String,
        source: Option<ErrorSource>,
    },
    /// `WorkerPool::create` was called more than once in this process
    PoolAlreadyCreated,
    /// A task submitted to the worker pool failed or panicked
    TaskFailed { task: String, message: String },
    /// A task name with no registered handler was submitted
    UnknownTask { task: String },
}

impl PathError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        PathError::InvalidInput {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_input_from<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        PathError::InvalidInput {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub(crate) fn lookup_failed(message: impl Into<String>) -> Self {
        PathError::ElevationLookupFailed {
            message: message.into(),
            source: None,
        }
    }

    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    pub(crate) fn lookup_failed_from<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        PathError::ElevationLookupFailed {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub(crate) fn task_failed(task: &str, message: impl Into<String>) -> Self {
        PathError::TaskFailed {
            task: task.to_string(),
            message: message.into(),
        }
    }
}

impl PartialEq for PathError {
    fn eq(&self, other: &Self) -> bool {
        use PathError::*;
        match (self, other) {
            (InvalidInput { message: a, .. }, InvalidInput { message: b, .. }) => a == b,
            (ElevationLookupFailed { message: a, .. }, ElevationLookupFailed { message: b, .. }) => {
                a == b
            }
            (PoolAlreadyCreated, PoolAlreadyCreated) => true,
            (TaskFailed { task: a, message: m }, TaskFailed { task: b, message: n }) => {
                a == b && m == n
            }
            (UnknownTask { task: a }, UnknownTask { task: b }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidInput { message, .. } => {
                write!(f, "Invalid input: {}", message)
            }
            PathError::ElevationLookupFailed { message, .. } => {
                write!(f, "Elevation lookup failed: {}", message)
            }
            PathError::PoolAlreadyCreated => {
                write!(f, "Worker pool has already been created")
            }
            PathError::TaskFailed { task, message } => {
                write!(f, "Task '{}' failed: {}", task, message)
            }
            PathError::UnknownTask { task } => {
                write!(f, "No task registered under '{}'", task)
            }
        }
    }
}

impl Error for PathError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PathError::InvalidInput { source, .. } | PathError::ElevationLookupFailed { source, .. } => {
                source.as_deref().map(|e| e as &(dyn Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PathError {
    fn from(e: serde_json::Error) -> Self {
        PathError::invalid_input_from(format!("JSON: {}", e), e)
    }
}

/// Result type alias for path analysis operations.
pub type Result<T> = std::result::Result<T, PathError>;

/// Extension trait for converting Option to PathError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid input error.
    fn ok_or_invalid_input(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_input(self, message: &str) -> Result<T> {
        self.ok_or_else(|| PathError::invalid_input(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PathError::TaskFailed {
            task: "analyze".to_string(),
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("analyze"));
        assert!(err.to_string().contains("boom"));
        assert_eq!(
            PathError::PoolAlreadyCreated.to_string(),
            "Worker pool has already been created"
        );
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_invalid_input("need two points");
        assert!(matches!(result, Err(PathError::InvalidInput { .. })));
        assert_eq!(Some(3).ok_or_invalid_input("unused"), Ok(3));
    }

    #[test]
    fn test_from_json_error() {
        let err = serde_json::from_str::<Vec<f64>>("not json").unwrap_err();
        let err = PathError::from(err);
        assert!(matches!(err, PathError::InvalidInput { .. }));
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
    }

    #[test]
    fn test_equality_ignores_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "reset");
        let with_source = PathError::lookup_failed_from("request error", io);
        assert_eq!(with_source, PathError::lookup_failed("request error"));
        assert!(with_source.source().is_some());
        assert!(PathError::lookup_failed("request error").source().is_none());
        assert_ne!(with_source, PathError::invalid_input("request error"));
    }
}
