//! Ephemeral view state and read-only task views.
//!
//! # Responsibility
//! - Hold the current view mode, selections and filters.
//! - Own the explicit navigation transitions between view modes.
//!
//! # Invariants
//! - `ViewMode::SingleProject` is the only mode that reads
//!   `selected_project`.
//! - Mode changes only happen through the transition methods below, plus
//!   `project_removed` when the selected project disappears.

use crate::model::project::ProjectId;
use crate::model::task::{Priority, TaskValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod filter;

pub use filter::{
    category_name, compute_counts, filter_tasks, group_by_category, week_bounds, TaskGroup,
    ViewCounts,
};

/// Mutually exclusive task list presentations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Tasks due on the selected date.
    #[default]
    DefaultDate,
    /// Tasks of the selected project.
    SingleProject,
    /// Every task (the inbox).
    All,
    Search,
}

/// Priority restriction applied to the visible tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == priority,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value.parse::<Priority>().map(Self::Only)
    }
}

impl Display for PriorityFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(priority) => write!(f, "{priority}"),
        }
    }
}

/// Due-date restriction applied to the visible tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueDateFilter {
    #[default]
    All,
    On(NaiveDate),
    /// Current calendar week, Sunday through Saturday.
    ThisWeek,
}

/// Rejected due-date filter text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDueDateFilter(pub String);

impl Display for InvalidDueDateFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid due-date filter `{}`; expected all|week|YYYY-MM-DD",
            self.0
        )
    }
}

impl std::error::Error for InvalidDueDateFilter {}

impl FromStr for DueDateFilter {
    type Err = InvalidDueDateFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "week" => Ok(Self::ThisWeek),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(Self::On)
                .map_err(|_| InvalidDueDateFilter(value.to_string())),
        }
    }
}

impl Display for DueDateFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::ThisWeek => f.write_str("week"),
            Self::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Current navigation and filter selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub mode: ViewMode,
    pub selected_project: Option<ProjectId>,
    pub selected_date: NaiveDate,
    pub search_query: String,
    pub priority_filter: PriorityFilter,
    pub due_filter: DueDateFilter,
}

impl ViewState {
    /// Starts in the default-date view on `today` with no filters.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            mode: ViewMode::DefaultDate,
            selected_project: None,
            selected_date: today,
            search_query: String::new(),
            priority_filter: PriorityFilter::All,
            due_filter: DueDateFilter::All,
        }
    }

    pub fn select_project(&mut self, project_id: ProjectId) {
        self.selected_project = Some(project_id);
        self.mode = ViewMode::SingleProject;
    }

    /// Resets filters, search and selection and returns to the default-date
    /// view. The selected date is kept.
    pub fn clear_filters(&mut self) {
        self.priority_filter = PriorityFilter::All;
        self.due_filter = DueDateFilter::All;
        self.search_query.clear();
        self.selected_project = None;
        self.mode = ViewMode::DefaultDate;
    }

    pub fn open_search(&mut self) {
        self.mode = ViewMode::Search;
    }

    pub fn show_all(&mut self) {
        self.selected_project = None;
        self.mode = ViewMode::All;
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.selected_project = None;
        self.mode = ViewMode::DefaultDate;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn set_priority_filter(&mut self, filter: PriorityFilter) {
        self.priority_filter = filter;
    }

    pub fn set_due_filter(&mut self, filter: DueDateFilter) {
        self.due_filter = filter;
    }

    /// Drops a removed project from the selection.
    ///
    /// Returns `true` when this forced a transition back to the default-date
    /// view.
    pub fn project_removed(&mut self, project_id: &ProjectId) -> bool {
        if self.selected_project.as_ref() != Some(project_id) {
            return false;
        }
        self.selected_project = None;
        if self.mode == ViewMode::SingleProject {
            self.mode = ViewMode::DefaultDate;
            return true;
        }
        false
    }

    pub fn has_active_filters(&self) -> bool {
        self.priority_filter != PriorityFilter::All
            || self.due_filter != DueDateFilter::All
            || !self.search_query.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{DueDateFilter, PriorityFilter, ViewMode, ViewState};
    use crate::model::project::ProjectId;
    use crate::model::task::Priority;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn filters_parse_wire_strings() {
        assert_eq!("all".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!(
            "high".parse::<PriorityFilter>().unwrap(),
            PriorityFilter::Only(Priority::High)
        );
        assert_eq!("week".parse::<DueDateFilter>().unwrap(), DueDateFilter::ThisWeek);
        assert_eq!(
            "2024-05-07".parse::<DueDateFilter>().unwrap(),
            DueDateFilter::On(day(7))
        );
        assert!("tomorrow".parse::<DueDateFilter>().is_err());
        assert_eq!(DueDateFilter::On(day(7)).to_string(), "2024-05-07");
    }

    #[test]
    fn navigation_transitions() {
        let mut view = ViewState::new(day(6));
        assert_eq!(view.mode, ViewMode::DefaultDate);

        view.select_project(ProjectId::new("p1"));
        assert_eq!(view.mode, ViewMode::SingleProject);

        view.open_search();
        assert_eq!(view.mode, ViewMode::Search);

        view.show_all();
        assert_eq!(view.mode, ViewMode::All);
        assert_eq!(view.selected_project, None);

        view.select_date(day(9));
        assert_eq!(view.mode, ViewMode::DefaultDate);
        assert_eq!(view.selected_date, day(9));
    }

    #[test]
    fn clear_filters_resets_everything_but_the_date() {
        let mut view = ViewState::new(day(6));
        view.select_project(ProjectId::new("p1"));
        view.set_priority_filter(PriorityFilter::Only(Priority::High));
        view.set_due_filter(DueDateFilter::ThisWeek);
        view.set_search_query("yoga");
        assert!(view.has_active_filters());

        view.clear_filters();
        assert_eq!(view, ViewState::new(day(6)));
        assert!(!view.has_active_filters());
    }

    #[test]
    fn removing_selected_project_forces_default_date_view() {
        let mut view = ViewState::new(day(6));
        view.select_project(ProjectId::new("p1"));

        assert!(!view.project_removed(&ProjectId::new("p2")));
        assert_eq!(view.mode, ViewMode::SingleProject);

        assert!(view.project_removed(&ProjectId::new("p1")));
        assert_eq!(view.mode, ViewMode::DefaultDate);
        assert_eq!(view.selected_project, None);
    }
}
