//! Status polling for backend background tasks.
//!
//! Long-running operations (raw-data dumps, big exports) run as server
//! tasks identified by an opaque task id. [`ServerTask`] polls the status
//! endpoint and exposes progress; a 404 from the endpoint means the task
//! row does not exist yet and reads as pending.

use serde::Deserialize;
use serde_json::Value;

use crate::api::{ApiError, ReportingApi};

/// Lifecycle state of a server task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Started,
    Success,
    Failure,
    /// A status string this client does not know.
    Unknown,
}

impl TaskStatus {
    pub fn from_str(status: &str) -> Self {
        match status {
            "PENDING" => TaskStatus::Pending,
            "STARTED" => TaskStatus::Started,
            "SUCCESS" => TaskStatus::Success,
            "FAILURE" => TaskStatus::Failure,
            _ => TaskStatus::Unknown,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

/// Task status payload as returned by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusRecord {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub progress_current: Option<u64>,
    #[serde(default)]
    pub progress_total: Option<u64>,
    /// Remaining payload, task-specific.
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, Value>,
}

/// One background task handle, refreshed by polling.
#[derive(Debug)]
pub struct ServerTask {
    task_id: String,
    status: Option<TaskStatus>,
    data: Option<TaskStatusRecord>,
}

impl ServerTask {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: None,
            data: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.map(|s| s.is_finished()).unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.status == Some(TaskStatus::Started)
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(TaskStatus::Pending)
    }

    /// Completed fraction as a percentage, when the task reports progress.
    pub fn progress_percentage(&self) -> Option<f64> {
        let data = self.data.as_ref()?;
        let total = data.progress_total?;
        let current = data.progress_current?;
        if total == 0 {
            return None;
        }
        Some(100.0 * current as f64 / total as f64)
    }

    /// Poll the status endpoint.
    ///
    /// A 404 means the task row has not been created yet (the queue may be
    /// lagging); it is mapped to pending rather than treated as an error.
    pub async fn refresh(&mut self, api: &ReportingApi) -> Result<(), ApiError> {
        match api.get_task_status(&self.task_id).await {
            Ok(record) => {
                self.status = Some(TaskStatus::from_str(&record.status));
                self.data = Some(record);
                Ok(())
            }
            Err(error) if error.status() == Some(404) => {
                self.status = Some(TaskStatus::Pending);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(TaskStatus::from_str("PENDING"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_str("STARTED"), TaskStatus::Started);
        assert_eq!(TaskStatus::from_str("SUCCESS"), TaskStatus::Success);
        assert_eq!(TaskStatus::from_str("FAILURE"), TaskStatus::Failure);
        assert_eq!(TaskStatus::from_str("RETRY"), TaskStatus::Unknown);
    }

    #[test]
    fn finished_states() {
        assert!(TaskStatus::Success.is_finished());
        assert!(TaskStatus::Failure.is_finished());
        assert!(!TaskStatus::Started.is_finished());
        assert!(!TaskStatus::Pending.is_finished());
    }

    #[test]
    fn progress_percentage_needs_both_counters() {
        let mut task = ServerTask::new("abc");
        assert!(task.progress_percentage().is_none());

        task.data = Some(TaskStatusRecord {
            status: "STARTED".to_string(),
            progress_current: Some(25),
            progress_total: Some(100),
            extra: Default::default(),
        });
        assert_eq!(task.progress_percentage(), Some(25.0));

        task.data.as_mut().unwrap().progress_total = Some(0);
        assert!(task.progress_percentage().is_none());
    }

    #[test]
    fn fresh_task_has_no_status() {
        let task = ServerTask::new("abc");
        assert!(task.status().is_none());
        assert!(!task.is_finished());
        assert!(!task.is_running());
    }
}
