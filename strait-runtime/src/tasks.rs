//! Analysis task records and storage
//!
//! Task state lives behind the [`TaskStore`] trait so the runner can be
//! handed any keyed store. [`MemoryTaskStore`] keeps records in a
//! concurrent map for the lifetime of the process.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strait_core::IndicatorReport;
use strait_report::GeneratedReport;
use uuid::Uuid;

/// Task identifier (UUID v4, hyphenated)
pub type TaskId = String;

/// Generate a fresh task ID
pub fn new_task_id() -> TaskId {
    Uuid::new_v4().to_string()
}

/// Lifecycle of an analysis task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Output of a completed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub indicators: IndicatorReport,
    pub report: GeneratedReport,
    pub timestamp: DateTime<Utc>,
}

/// State of one analysis task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Percent complete, 0 to 100
    pub progress: u8,
    /// Requested analysis tier
    pub model: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(id: TaskId, model: &str) -> Self {
        Self {
            id,
            status: TaskStatus::Running,
            progress: 0,
            model: model.to_string(),
            created_at: Utc::now(),
            result: None,
            error: None,
        }
    }
}

/// Keyed store of task records
pub trait TaskStore: Send + Sync {
    fn insert(&self, record: TaskRecord);

    fn get(&self, id: &str) -> Option<TaskRecord>;

    /// Apply `update` to a stored record; false if the ID is unknown
    fn update(&self, id: &str, update: &dyn Fn(&mut TaskRecord)) -> bool;

    fn list(&self) -> Vec<TaskRecord>;
}

/// In-process task store
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: DashMap<TaskId, TaskRecord>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TaskStore for MemoryTaskStore {
    fn insert(&self, record: TaskRecord) {
        self.tasks.insert(record.id.clone(), record);
    }

    fn get(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.get(id).map(|entry| entry.value().clone())
    }

    fn update(&self, id: &str, update: &dyn Fn(&mut TaskRecord)) -> bool {
        match self.tasks.get_mut(id) {
            Some(mut entry) => {
                update(entry.value_mut());
                true
            }
            None => false,
        }
    }

    fn list(&self) -> Vec<TaskRecord> {
        let mut records: Vec<_> = self.tasks.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_running() {
        let record = TaskRecord::new(new_task_id(), "o3-2025-04-16");
        assert_eq!(record.status, TaskStatus::Running);
        assert_eq!(record.progress, 0);
        assert!(Uuid::parse_str(&record.id).is_ok());
        assert!(!record.status.is_finished());
    }

    #[test]
    fn test_store_update() {
        let store = MemoryTaskStore::new();
        let record = TaskRecord::new("task-1".to_string(), "m");
        store.insert(record);

        assert!(store.update("task-1", &|r: &mut TaskRecord| {
            r.progress = 40;
        }));
        assert!(!store.update("missing", &|r: &mut TaskRecord| r.progress = 100));

        assert_eq!(store.get("task-1").unwrap().progress, 40);
        assert_eq!(store.len(), 1);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(TaskStatus::Failed.to_string(), "failed");
    }
}
