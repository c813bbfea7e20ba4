//! Project domain model.
//!
//! # Responsibility
//! - Define the project record mirrored from the remote store.
//! - Validate user-provided project fields before any remote call.
//!
//! # Invariants
//! - `id` is assigned by the remote store, never by the client.
//! - `name` is non-empty after trim; uniqueness is not required.
//! - A project carries no rendering information.

use crate::auth::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque remote-assigned project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation failures for project input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    EmptyName,
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "project name must not be blank"),
        }
    }
}

impl Error for ProjectValidationError {}

/// Project owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds, as reported by the remote store.
    pub created_at: i64,
}

/// Normalizes a user-entered project name.
///
/// Returns the trimmed name, or `EmptyName` when nothing is left.
pub fn normalize_project_name(name: &str) -> Result<String, ProjectValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProjectValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Collapses blank descriptions to `None`.
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{normalize_description, normalize_project_name, ProjectValidationError};

    #[test]
    fn project_name_is_trimmed() {
        assert_eq!(normalize_project_name("  Work ").unwrap(), "Work");
    }

    #[test]
    fn blank_project_name_is_rejected() {
        assert_eq!(
            normalize_project_name(" \t").unwrap_err(),
            ProjectValidationError::EmptyName
        );
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(normalize_description(Some("   ")), None);
        assert_eq!(
            normalize_description(Some(" notes ")).as_deref(),
            Some("notes")
        );
    }
}
