//! Pure task filtering, grouping and counting.
//!
//! Filters apply in order priority, due date, view mode, free-text search,
//! and compose by logical AND. Nothing here touches the store or the clock:
//! callers pass `today` explicitly.

use super::{DueDateFilter, ViewMode, ViewState};
use crate::model::project::{Project, ProjectId};
use crate::model::task::{Task, FALLBACK_CATEGORY};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

/// Tasks sharing one display category, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup<'a> {
    pub category: String,
    pub tasks: Vec<&'a Task>,
}

/// Badge counts for navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCounts {
    pub total: usize,
    /// Incomplete tasks due on the selected date.
    pub pending_on_selected_date: usize,
    pub pending_by_project: HashMap<ProjectId, usize>,
    pub pending_fallback: usize,
}

/// Resolves a task's display category.
///
/// Project-backed tasks take the current name of their project; tasks
/// without a project (or whose project is not loaded) use the fallback.
pub fn category_name<'a>(task: &Task, projects: &'a [Project]) -> &'a str {
    task.project_id
        .as_ref()
        .and_then(|id| projects.iter().find(|project| &project.id == id))
        .map_or(FALLBACK_CATEGORY, |project| project.name.as_str())
}

/// Sunday and Saturday of the calendar week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = i64::from(today.weekday().num_days_from_sunday());
    let start = today - Duration::days(offset);
    (start, start + Duration::days(6))
}

/// Returns the visible subset of `tasks` for `view`, keeping input order.
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    projects: &[Project],
    view: &ViewState,
    today: NaiveDate,
) -> Vec<&'a Task> {
    let week = week_bounds(today);
    let query = view.search_query.trim().to_lowercase();

    tasks
        .iter()
        .filter(|task| view.priority_filter.matches(task.priority))
        .filter(|task| matches_due_filter(task, view.due_filter, week))
        .filter(|task| matches_view_mode(task, view))
        .filter(|task| matches_search(task, projects, &query))
        .collect()
}

/// Groups tasks by display category, preserving first-seen category order.
pub fn group_by_category<'a>(tasks: &[&'a Task], projects: &[Project]) -> Vec<TaskGroup<'a>> {
    let mut groups: Vec<TaskGroup<'a>> = Vec::new();
    for &task in tasks {
        let category = category_name(task, projects);
        match groups.iter_mut().find(|group| group.category == category) {
            Some(group) => group.tasks.push(task),
            None => groups.push(TaskGroup {
                category: category.to_string(),
                tasks: vec![task],
            }),
        }
    }
    groups
}

/// Computes navigation counts over the full task collection.
pub fn compute_counts(tasks: &[Task], selected_date: NaiveDate) -> ViewCounts {
    let mut counts = ViewCounts {
        total: tasks.len(),
        ..ViewCounts::default()
    };

    for task in tasks.iter().filter(|task| !task.completed) {
        if task.due_date == Some(selected_date) {
            counts.pending_on_selected_date += 1;
        }
        match &task.project_id {
            Some(project_id) => {
                *counts
                    .pending_by_project
                    .entry(project_id.clone())
                    .or_insert(0) += 1;
            }
            None => counts.pending_fallback += 1,
        }
    }
    counts
}

fn matches_due_filter(task: &Task, filter: DueDateFilter, week: (NaiveDate, NaiveDate)) -> bool {
    match filter {
        DueDateFilter::All => true,
        DueDateFilter::On(date) => task.due_date == Some(date),
        DueDateFilter::ThisWeek => task
            .due_date
            .is_some_and(|due| due >= week.0 && due <= week.1),
    }
}

fn matches_view_mode(task: &Task, view: &ViewState) -> bool {
    match view.mode {
        ViewMode::DefaultDate => task.due_date == Some(view.selected_date),
        ViewMode::SingleProject => match &view.selected_project {
            Some(selected) => task.project_id.as_ref() == Some(selected),
            None => true,
        },
        ViewMode::All | ViewMode::Search => true,
    }
}

fn matches_search(task: &Task, projects: &[Project], query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(query)
        || category_name(task, projects).to_lowercase().contains(query)
}

#[cfg(test)]
mod tests {
    use super::{compute_counts, filter_tasks, group_by_category, week_bounds};
    use crate::auth::UserId;
    use crate::model::project::{Project, ProjectId};
    use crate::model::task::{Priority, Task, TaskId};
    use crate::view::{DueDateFilter, PriorityFilter, ViewState};
    use chrono::NaiveDate;

    // 2024-05-08 is a Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 8).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: ProjectId::new(id),
            owner_id: UserId::new("u1"),
            name: name.to_string(),
            description: None,
            created_at: 0,
        }
    }

    fn task(id: &str, title: &str, project: Option<&str>, due: Option<NaiveDate>) -> Task {
        Task {
            id: TaskId::new(id),
            project_id: project.map(ProjectId::new),
            title: title.to_string(),
            description: None,
            completed: false,
            due_date: due,
            priority: Priority::Normal,
            created_at: 0,
        }
    }

    fn all_view() -> ViewState {
        let mut view = ViewState::new(today());
        view.show_all();
        view
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|task| task.id.to_string()).collect()
    }

    #[test]
    fn week_runs_sunday_through_saturday() {
        assert_eq!(week_bounds(today()), (date(2024, 5, 5), date(2024, 5, 11)));
        assert_eq!(
            week_bounds(date(2024, 5, 5)),
            (date(2024, 5, 5), date(2024, 5, 11))
        );
        assert_eq!(
            week_bounds(date(2024, 5, 11)),
            (date(2024, 5, 5), date(2024, 5, 11))
        );
    }

    #[test]
    fn week_filter_includes_saturday_and_excludes_next_sunday() {
        let tasks = vec![
            task("sat", "saturday", None, Some(date(2024, 5, 11))),
            task("sun", "next sunday", None, Some(date(2024, 5, 12))),
            task("prev", "previous saturday", None, Some(date(2024, 5, 4))),
            task("none", "undated", None, None),
        ];
        let mut view = all_view();
        view.set_due_filter(DueDateFilter::ThisWeek);

        let visible = filter_tasks(&tasks, &[], &view, today());
        assert_eq!(ids(&visible), vec!["sat"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_category() {
        let projects = vec![project("p1", "Fitness")];
        let tasks = vec![
            task("1", "Do 30 minutes of yoga", None, None),
            task("2", "Dentist appointment", None, None),
            task("3", "Run 5k", Some("p1"), None),
        ];
        let mut view = all_view();

        view.set_search_query("YOGA");
        assert_eq!(ids(&filter_tasks(&tasks, &projects, &view, today())), vec!["1"]);

        view.set_search_query("fitness");
        assert_eq!(ids(&filter_tasks(&tasks, &projects, &view, today())), vec!["3"]);

        view.set_search_query("personal");
        assert_eq!(
            ids(&filter_tasks(&tasks, &projects, &view, today())),
            vec!["1", "2"]
        );

        view.set_search_query("   ");
        assert_eq!(filter_tasks(&tasks, &projects, &view, today()).len(), 3);
    }

    #[test]
    fn default_date_view_restricts_to_selected_date() {
        let tasks = vec![
            task("a", "today", None, Some(today())),
            task("b", "tomorrow", None, Some(date(2024, 5, 9))),
            task("c", "undated", None, None),
        ];
        let mut view = ViewState::new(today());
        assert_eq!(ids(&filter_tasks(&tasks, &[], &view, today())), vec!["a"]);

        view.select_date(date(2024, 5, 9));
        assert_eq!(ids(&filter_tasks(&tasks, &[], &view, today())), vec!["b"]);
    }

    #[test]
    fn single_project_view_restricts_to_project() {
        let projects = vec![project("p1", "Work"), project("p2", "Home")];
        let tasks = vec![
            task("a", "report", Some("p1"), None),
            task("b", "laundry", Some("p2"), None),
            task("c", "stretch", None, None),
        ];
        let mut view = ViewState::new(today());
        view.select_project(ProjectId::new("p1"));

        assert_eq!(ids(&filter_tasks(&tasks, &projects, &view, today())), vec!["a"]);
    }

    #[test]
    fn filters_compose_and_are_idempotent() {
        let mut high = task("h", "ship release", None, Some(today()));
        high.priority = Priority::High;
        let tasks = vec![
            high,
            task("n", "ship notes", None, Some(today())),
            task("x", "other", None, Some(date(2024, 5, 20))),
        ];
        let mut view = all_view();
        view.set_priority_filter(PriorityFilter::Only(Priority::High));
        view.set_due_filter(DueDateFilter::On(today()));
        view.set_search_query("ship");

        let once = filter_tasks(&tasks, &[], &view, today());
        assert_eq!(ids(&once), vec!["h"]);

        let owned: Vec<Task> = once.iter().map(|task| (*task).clone()).collect();
        let twice = filter_tasks(&owned, &[], &view, today());
        assert_eq!(ids(&twice), ids(&once));
    }

    #[test]
    fn groups_preserve_first_seen_category_order() {
        let projects = vec![project("p1", "Work")];
        let tasks = vec![
            task("1", "a", None, None),
            task("2", "b", Some("p1"), None),
            task("3", "c", None, None),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();

        let groups = group_by_category(&refs, &projects);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Personal");
        assert_eq!(ids(&groups[0].tasks), vec!["1", "3"]);
        assert_eq!(groups[1].category, "Work");
    }

    #[test]
    fn counts_skip_completed_tasks() {
        let mut done = task("d", "done", Some("p1"), Some(today()));
        done.completed = true;
        let tasks = vec![
            done,
            task("a", "open", Some("p1"), Some(today())),
            task("b", "local", None, None),
        ];

        let counts = compute_counts(&tasks, today());
        assert_eq!(counts.total, 3);
        assert_eq!(counts.pending_on_selected_date, 1);
        assert_eq!(counts.pending_by_project[&ProjectId::new("p1")], 1);
        assert_eq!(counts.pending_fallback, 1);
    }
}
