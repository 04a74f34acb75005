//! Errors - エラー型と分類
//!
//! Every failure of the execution pipeline is a [`StacTaskError`]. The
//! variant is the error's kind and is preserved all the way up to the caller:
//! nothing in this crate downgrades a specific error into a generic one.

use thiserror::Error;

use super::state::ExecutionState;

/// Boxed error raised by task implementations (opaque to the pipeline).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// ErrorKind は StacTaskError の分類
///
/// Callers log this next to the message and decide on their own whether a
/// whole execution is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Indirection,
    Configuration,
    UnknownTask,
    DuplicateRegistration,
    Validation,
    Format,
    Task,
    Asset,
    Timeout,
    Internal,
}

#[derive(Debug, Error)]
pub enum StacTaskError {
    /// An indirect payload pointed at another indirect payload.
    #[error("multiple indirections are not supported (while loading {href})")]
    Indirection { href: String },

    /// The process definition does not configure the task correctly.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("task not found: {name} (available tasks: {available})")]
    UnknownTask { name: String, available: String },

    #[error("task is already registered: {0}")]
    DuplicateRegistration(String),

    /// A feature could not be decoded into (or encoded from) a task's item shape.
    #[error("invalid item at index {index}: {message}")]
    Validation { index: usize, message: String },

    /// The payload document itself is malformed.
    #[error("invalid payload: {0}")]
    Format(String),

    /// Raised by a task implementation.
    #[error("task error{}: {source}", at_item(.index))]
    Task {
        index: Option<usize>,
        #[source]
        source: BoxError,
    },

    #[error("asset error ({href}): {message}")]
    Asset { href: String, message: String },

    #[error("execution of {task} timed out after {secs}s")]
    Timeout { task: String, secs: u64 },

    #[error("invalid execution transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ExecutionState,
        to: ExecutionState,
    },
}

fn at_item(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!(" on item {index}"),
        None => String::new(),
    }
}

impl StacTaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Indirection { .. } => ErrorKind::Indirection,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::UnknownTask { .. } => ErrorKind::UnknownTask,
            Self::DuplicateRegistration(_) => ErrorKind::DuplicateRegistration,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Format(_) => ErrorKind::Format,
            Self::Task { .. } => ErrorKind::Task,
            Self::Asset { .. } => ErrorKind::Asset,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidTransition { .. } => ErrorKind::Internal,
        }
    }

    /// Wrap an arbitrary domain error raised by a task.
    pub fn task(source: impl Into<BoxError>) -> Self {
        Self::Task {
            index: None,
            source: source.into(),
        }
    }

    pub fn asset(href: impl Into<String>, message: impl ToString) -> Self {
        Self::Asset {
            href: href.into(),
            message: message.to_string(),
        }
    }

    /// Attribute a task-raised error to the item it failed on.
    ///
    /// Errors of any other kind are returned unchanged.
    pub fn at_item(self, item: usize) -> Self {
        match self {
            Self::Task { index: None, source } => Self::Task {
                index: Some(item),
                source,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_errors_are_attributed_once() {
        let err = StacTaskError::task("boom").at_item(3).at_item(5);
        assert!(matches!(err, StacTaskError::Task { index: Some(3), .. }));
        assert_eq!(err.to_string(), "task error on item 3: boom");
    }

    #[test]
    fn attribution_keeps_other_kinds() {
        let err = StacTaskError::Configuration("nope".to_string()).at_item(1);
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn unattributed_task_error_message() {
        let err = StacTaskError::task("boom");
        assert_eq!(err.to_string(), "task error: boom");
        assert_eq!(err.kind(), ErrorKind::Task);
    }
}
