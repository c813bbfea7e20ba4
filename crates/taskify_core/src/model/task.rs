//! Task domain model.
//!
//! # Responsibility
//! - Define the task record held by the synchronization store.
//! - Provide priority parsing shared by storage and filters.
//!
//! # Invariants
//! - `project_id == None` marks a fallback-category task; such tasks are
//!   local-only and never sent to the remote store.
//! - `title` is non-empty after trim.
//! - `due_date` is a calendar date without time zone (`YYYY-MM-DD`).

use crate::model::project::ProjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Display name of the grouping used for tasks without a project.
pub const FALLBACK_CATEGORY: &str = "Personal";

const LOCAL_TASK_ID_PREFIX: &str = "local-";

/// Opaque task identifier.
///
/// Remote-assigned for project-backed tasks; generated by the client with a
/// `local-` prefix for fallback-category tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates an id for a task that only lives in local state.
    pub fn new_local() -> Self {
        Self(format!("{LOCAL_TASK_ID_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_TASK_ID_PREFIX)
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(TaskValidationError::UnknownPriority(other.to_string())),
        }
    }
}

/// Validation failures for task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    UnknownPriority(String),
    UnknownCategory(String),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be blank"),
            Self::UnknownPriority(value) => write!(f, "unknown task priority: `{value}`"),
            Self::UnknownCategory(value) => write!(f, "unknown task category: `{value}`"),
        }
    }
}

impl Error for TaskValidationError {}

/// Task as held in local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// `None` for fallback-category tasks.
    pub project_id: Option<ProjectId>,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Task {
    /// Creates a local-only task in the fallback category.
    pub fn new_local(
        title: impl Into<String>,
        priority: Priority,
        due_date: Option<NaiveDate>,
        created_at: i64,
    ) -> Self {
        Self {
            id: TaskId::new_local(),
            project_id: None,
            title: title.into(),
            description: None,
            completed: false,
            due_date,
            priority,
            created_at,
        }
    }

    /// Returns whether mutations of this task go through the remote store.
    pub fn is_project_backed(&self) -> bool {
        self.project_id.is_some()
    }
}

/// Normalizes a user-entered task title.
pub fn normalize_task_title(title: &str) -> Result<String, TaskValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_task_title, Priority, Task, TaskId, TaskValidationError};
    use chrono::NaiveDate;

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(TaskValidationError::UnknownPriority(_))
        ));
    }

    #[test]
    fn default_priority_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn local_task_has_local_id_and_no_project() {
        let task = Task::new_local("stretch", Priority::Normal, None, 0);
        assert!(task.id.is_local());
        assert!(!task.is_project_backed());
        assert!(!task.completed);
        assert!(!TaskId::new("b7c2").is_local());
    }

    #[test]
    fn task_serializes_iso_due_date_and_snake_case_priority() {
        let mut task = Task::new_local(
            "dentist",
            Priority::High,
            NaiveDate::from_ymd_opt(2024, 3, 9),
            0,
        );
        task.id = TaskId::new("t1");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["due_date"], "2024-03-09");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["id"], "t1");
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            normalize_task_title("   ").unwrap_err(),
            TaskValidationError::EmptyTitle
        );
    }
}
