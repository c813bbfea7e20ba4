//! Remote store client contract and implementations.
//!
//! # Responsibility
//! - Define async create/list/update/delete operations for projects and
//!   tasks, plus bulk task deletion by project.
//! - Define the persisted record shapes returned by implementations.
//!
//! # Invariants
//! - Every call is scoped to the identity published by the auth session; the
//!   caller never passes an owner explicitly.
//! - Clients never retry internally: each call happens exactly once or
//!   reports failure.
//! - Records owned by another user are reported as `NotFound`.

use crate::auth::{current_identity, IdentityReceiver, UserId};
use crate::model::project::{Project, ProjectId};
use crate::model::task::{Priority, Task, TaskId};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRemoteStore;
pub use sqlite::SqliteRemoteStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure classes reported by remote store clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    NotAuthenticated,
    /// Target id does not exist for the current owner.
    NotFound(String),
    /// Transport, server or storage failure with an opaque reason.
    Failure(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user not authenticated"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Failure(reason) => write!(f, "remote store failure: {reason}"),
        }
    }
}

impl Error for RemoteError {}

impl From<rusqlite::Error> for RemoteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Failure(value.to_string())
    }
}

/// Operation names, used for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    CreateProject,
    ListProjects,
    UpdateProject,
    DeleteProject,
    CreateTask,
    ListTasks,
    UpdateTask,
    DeleteTask,
    DeleteTasksByProject,
}

impl RemoteOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateProject => "create_project",
            Self::ListProjects => "list_projects",
            Self::UpdateProject => "update_project",
            Self::DeleteProject => "delete_project",
            Self::CreateTask => "create_task",
            Self::ListTasks => "list_tasks",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::DeleteTasksByProject => "delete_tasks_by_project",
        }
    }
}

/// Persisted project shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            name: record.title,
            description: record.description,
            created_at: record.created_at,
        }
    }
}

/// Persisted task shape. Every persisted task belongs to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: i64,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            project_id: Some(record.project_id),
            title: record.title,
            description: record.description,
            completed: record.completed,
            due_date: record.due_date,
            priority: record.priority,
            created_at: record.created_at,
        }
    }
}

/// Fields for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
}

/// Partial project update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fields for creating a task inside a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

/// Partial task update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

/// Async persistence contract consumed by the synchronization store.
///
/// Futures are not `Send`: the core runs on a single thread.
#[async_trait(?Send)]
pub trait RemoteStore {
    async fn create_project(&self, project: &NewProject) -> RemoteResult<ProjectRecord>;
    /// Lists the owner's projects, newest first.
    async fn list_projects(&self) -> RemoteResult<Vec<ProjectRecord>>;
    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> RemoteResult<ProjectRecord>;
    async fn delete_project(&self, id: &ProjectId) -> RemoteResult<()>;

    async fn create_task(&self, task: &NewTask) -> RemoteResult<TaskRecord>;
    /// Lists tasks of all the owner's projects, newest first.
    async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>>;
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RemoteResult<TaskRecord>;
    async fn delete_task(&self, id: &TaskId) -> RemoteResult<()>;
    /// Deletes every task of one project and returns how many were removed.
    async fn delete_tasks_by_project(&self, project_id: &ProjectId) -> RemoteResult<u64>;
}

/// Resolves the owner for a remote call from the session channel.
pub(crate) fn require_owner(session: &IdentityReceiver) -> RemoteResult<UserId> {
    current_identity(session)
        .map(|identity| identity.id)
        .ok_or(RemoteError::NotAuthenticated)
}
