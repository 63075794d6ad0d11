use super::{PersistenceResult, TaskBlobStore};
use crate::task::Task;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Keeps the task blob in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBlobStore {
    path: PathBuf,
}

impl JsonFileBlobStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskBlobStore for JsonFileBlobStore {
    fn load_blob(&self) -> PersistenceResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_blob(&self, blob: &str) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Stage next to the target, then rename over it.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, blob)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

pub fn tasks_to_pretty_json(tasks: &[Task]) -> PersistenceResult<String> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// `day-planner-tasks-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("day-planner-tasks-{}.json", date.format("%Y-%m-%d"))
}

pub fn save_tasks_to_json_file<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, tasks)?;
    Ok(())
}

/// Reads an export file without validating its records.
pub fn load_tasks_from_json_file<P: AsRef<Path>>(path: P) -> PersistenceResult<Value> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[derive(Serialize)]
struct TaskCsvRecord<'a> {
    id: &'a str,
    title: &'a str,
    date: String,
    start_time: String,
    end_time: String,
    priority: &'static str,
    completed: bool,
    description: &'a str,
}

impl<'a> From<&'a Task> for TaskCsvRecord<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id.as_str(),
            title: &task.title,
            date: task.scheduled_date.format("%Y-%m-%d").to_string(),
            start_time: task.start_time.to_string(),
            end_time: task.end_time.to_string(),
            priority: task.priority.as_str(),
            completed: task.completed,
            description: task.description.as_deref().unwrap_or_default(),
        }
    }
}

pub fn export_tasks_to_csv<W: Write>(tasks: &[Task], writer: W) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}
