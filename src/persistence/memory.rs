use super::{PersistenceError, PersistenceResult, TaskBlobStore};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-local blob store. Saves can be made to fail on demand so callers
/// can exercise their degraded paths.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blob: Mutex<Option<String>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
            ..Self::default()
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl TaskBlobStore for MemoryBlobStore {
    fn load_blob(&self) -> PersistenceResult<Option<String>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistenceError::InvalidData("blob store unavailable".into()));
        }
        let guard = self.blob.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn save_blob(&self, blob: &str) -> PersistenceResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::InvalidData("blob store unavailable".into()));
        }
        let mut guard = self.blob.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        *guard = Some(blob.to_string());
        Ok(())
    }
}
