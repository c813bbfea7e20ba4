//! Read-only copy of store state handed to rendering layers.

use crate::auth::Identity;
use crate::model::project::{Project, ProjectId};
use crate::model::task::{Task, TaskId};
use crate::view::{
    category_name, compute_counts, filter_tasks, group_by_category, TaskGroup, ViewCounts,
    ViewState,
};
use chrono::NaiveDate;

/// Point-in-time view of the synchronization store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub identity: Option<Identity>,
    pub loading: bool,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub view: ViewState,
    pub pending_title: String,
}

impl StoreSnapshot {
    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| &project.id == id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn category_of(&self, task: &Task) -> &str {
        category_name(task, &self.projects)
    }

    /// Tasks visible under the current view state.
    pub fn visible_tasks(&self, today: NaiveDate) -> Vec<&Task> {
        filter_tasks(&self.tasks, &self.projects, &self.view, today)
    }

    /// Visible tasks grouped by category for display.
    pub fn visible_groups(&self, today: NaiveDate) -> Vec<TaskGroup<'_>> {
        group_by_category(&self.visible_tasks(today), &self.projects)
    }

    pub fn counts(&self) -> ViewCounts {
        compute_counts(&self.tasks, self.view.selected_date)
    }
}
