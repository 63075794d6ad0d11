use crate::persistence::PersistenceError;
use crate::task::TaskId;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid time '{input}': expected HH:MM")]
    Format { input: String },
    #[error("{0}")]
    Validation(String),
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("{0}")]
    Import(ImportFailure),
    #[error("storage error: {0}")]
    Storage(#[from] PersistenceError),
    #[error("no drag in progress")]
    NotDragging,
}

impl PlannerError {
    pub fn format(input: impl Into<String>) -> Self {
        Self::Format {
            input: input.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

/// A single import entry that failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: String,
}

/// Why a bulk import was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportFailure {
    NotAnArray,
    Rejected(Vec<RejectedEntry>),
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFailure::NotAnArray => write!(f, "import payload must be a JSON array of tasks"),
            ImportFailure::Rejected(entries) => {
                write!(f, "{} invalid task record(s):", entries.len())?;
                for entry in entries {
                    write!(f, " [#{}] {};", entry.index, entry.reason)?;
                }
                Ok(())
            }
        }
    }
}
