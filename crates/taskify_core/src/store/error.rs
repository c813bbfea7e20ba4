//! Error taxonomy for synchronization store operations.

use crate::model::project::{ProjectId, ProjectValidationError};
use crate::model::task::TaskValidationError;
use crate::remote::RemoteError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Entity kind named by `SyncError::NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Task,
    /// Reported by the remote store without saying which kind.
    Record,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => f.write_str("project"),
            Self::Task => f.write_str("task"),
            Self::Record => f.write_str("record"),
        }
    }
}

/// Input rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Project(ProjectValidationError),
    Task(TaskValidationError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Project(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

/// Project cascade delete that removed the tasks but not the project.
///
/// Retrying `delete_project` for `project_id` is safe: the task half is
/// already done and runs again as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeFailure {
    pub project_id: ProjectId,
    pub tasks_deleted: u64,
    pub reason: String,
}

/// Failures surfaced by `SyncStore` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No identity is active.
    NotAuthenticated,
    NotFound { entity: EntityKind, id: String },
    Validation(ValidationError),
    /// Opaque remote failure; the reason is kept for display.
    Remote(String),
    PartialFailure(CascadeFailure),
}

impl SyncError {
    pub fn project_not_found(id: &ProjectId) -> Self {
        Self::NotFound {
            entity: EntityKind::Project,
            id: id.to_string(),
        }
    }

    pub fn task_not_found(id: impl Display) -> Self {
        Self::NotFound {
            entity: EntityKind::Task,
            id: id.to_string(),
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user not authenticated"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Remote(reason) => write!(f, "{reason}"),
            Self::PartialFailure(failure) => write!(
                f,
                "project {} kept after deleting {} task(s): {}",
                failure.project_id, failure.tasks_deleted, failure.reason
            ),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::NotAuthenticated => Self::NotAuthenticated,
            RemoteError::NotFound(id) => Self::NotFound {
                entity: EntityKind::Record,
                id,
            },
            RemoteError::Failure(reason) => Self::Remote(reason),
        }
    }
}

impl From<ProjectValidationError> for SyncError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(ValidationError::Project(value))
    }
}

impl From<TaskValidationError> for SyncError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(ValidationError::Task(value))
    }
}
