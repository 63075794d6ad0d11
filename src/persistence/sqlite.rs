use super::{DEFAULT_STORAGE_KEY, PersistenceError, PersistenceResult, TaskBlobStore};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

/// Key-value table in SQLite; the planner uses a single key.
pub struct SqliteBlobStore {
    connection: Mutex<Connection>,
    key: String,
}

impl SqliteBlobStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        Self::with_key(path, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key<P: AsRef<Path>>(path: P, key: impl Into<String>) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection, key)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, DEFAULT_STORAGE_KEY)
    }

    fn from_connection(connection: Connection, key: impl Into<String>) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
            key: key.into(),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl TaskBlobStore for SqliteBlobStore {
    fn load_blob(&self) -> PersistenceResult<Option<String>> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let value = stmt
            .query_row(params![self.key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn save_blob(&self, blob: &str) -> PersistenceResult<()> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![self.key, blob],
        )?;
        Ok(())
    }
}
