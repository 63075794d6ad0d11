use crate::task::Task;
use serde_json::Value;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("storage lock poisoned")]
    LockPoisoned,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Key the task blob is stored under in key-value backends.
pub const DEFAULT_STORAGE_KEY: &str = "dayPlannerTasks";

/// A single-slot key-value blob store holding the serialized task list.
pub trait TaskBlobStore {
    fn load_blob(&self) -> PersistenceResult<Option<String>>;
    fn save_blob(&self, blob: &str) -> PersistenceResult<()>;
}

impl<S: TaskBlobStore + ?Sized> TaskBlobStore for Box<S> {
    fn load_blob(&self) -> PersistenceResult<Option<String>> {
        (**self).load_blob()
    }

    fn save_blob(&self, blob: &str) -> PersistenceResult<()> {
        (**self).save_blob(blob)
    }
}

/// Raw task records as stored; an empty array when nothing was saved yet.
///
/// Records are not validated here. Hand the value to
/// [`crate::TaskStore::replace_all`].
pub fn load_tasks<S: TaskBlobStore + ?Sized>(store: &S) -> PersistenceResult<Value> {
    match store.load_blob()? {
        Some(blob) if !blob.trim().is_empty() => Ok(serde_json::from_str(&blob)?),
        _ => Ok(Value::Array(Vec::new())),
    }
}

pub fn save_tasks<S: TaskBlobStore + ?Sized>(store: &S, tasks: &[Task]) -> PersistenceResult<()> {
    let blob = serde_json::to_string(tasks)?;
    store.save_blob(&blob)
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    JsonFileBlobStore, export_file_name, export_tasks_to_csv, load_tasks_from_json_file,
    save_tasks_to_json_file, tasks_to_pretty_json,
};
pub use memory::MemoryBlobStore;
