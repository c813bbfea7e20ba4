//! In-process remote store.
//!
//! # Responsibility
//! - Provide a dependency-free `RemoteStore` for tests and offline hosts.
//! - Allow callers to inject failures and hold responses to model latency.
//!
//! # Invariants
//! - Ids are sequential (`project-N`, `task-N`) and never reused.
//! - Ownership rules match the SQLite store: foreign rows are `NotFound`,
//!   and a project with tasks cannot be deleted.
//! - Injected failures and gates are consumed by exactly one call.

use super::{
    require_owner, NewProject, NewTask, ProjectPatch, ProjectRecord, RemoteError, RemoteOp,
    RemoteResult, RemoteStore, TaskPatch, TaskRecord,
};
use crate::auth::{IdentityReceiver, UserId};
use crate::model::project::ProjectId;
use crate::model::task::TaskId;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio::sync::Notify;

const CLOCK_START_MS: i64 = 1_700_000_000_000;

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    clock_ms: i64,
    projects: Vec<ProjectRecord>,
    tasks: Vec<TaskRecord>,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn tick(&mut self) -> i64 {
        self.clock_ms += 1;
        CLOCK_START_MS + self.clock_ms
    }

    fn owns_project(&self, owner: &UserId, id: &ProjectId) -> bool {
        self.projects
            .iter()
            .any(|project| &project.id == id && &project.owner_id == owner)
    }

    fn task_index(&self, owner: &UserId, id: &TaskId) -> Option<usize> {
        self.tasks
            .iter()
            .position(|task| &task.id == id && self.owns_project(owner, &task.project_id))
    }
}

/// `RemoteStore` kept entirely in memory.
pub struct MemoryRemoteStore {
    session: IdentityReceiver,
    state: RefCell<MemoryState>,
    failures: RefCell<HashMap<RemoteOp, RemoteError>>,
    gates: RefCell<HashMap<RemoteOp, Rc<Notify>>>,
    calls: RefCell<Vec<RemoteOp>>,
}

impl MemoryRemoteStore {
    pub fn new(session: IdentityReceiver) -> Self {
        Self {
            session,
            state: RefCell::new(MemoryState::default()),
            failures: RefCell::new(HashMap::new()),
            gates: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.failures.borrow_mut().insert(op, error);
    }

    /// Holds the response of the next call of `op` until the returned handle
    /// is notified. The call's effect is applied before the hold.
    pub fn gate(&self, op: RemoteOp) -> Rc<Notify> {
        let notify = Rc::new(Notify::new());
        self.gates.borrow_mut().insert(op, Rc::clone(&notify));
        notify
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<RemoteOp> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.calls.borrow().iter().filter(|call| **call == op).count()
    }

    /// Snapshot of stored projects across all owners.
    pub fn stored_projects(&self) -> Vec<ProjectRecord> {
        self.state.borrow().projects.clone()
    }

    /// Snapshot of stored tasks across all owners.
    pub fn stored_tasks(&self) -> Vec<TaskRecord> {
        self.state.borrow().tasks.clone()
    }

    fn begin(&self, op: RemoteOp) -> RemoteResult<UserId> {
        self.calls.borrow_mut().push(op);
        if let Some(error) = self.failures.borrow_mut().remove(&op) {
            return Err(error);
        }
        require_owner(&self.session)
    }

    async fn finish<T>(&self, op: RemoteOp, outcome: RemoteResult<T>) -> RemoteResult<T> {
        let gate = self.gates.borrow_mut().remove(&op);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        outcome
    }
}

#[async_trait(?Send)]
impl RemoteStore for MemoryRemoteStore {
    async fn create_project(&self, project: &NewProject) -> RemoteResult<ProjectRecord> {
        let op = RemoteOp::CreateProject;
        let outcome = self.begin(op).map(|owner| {
            let mut state = self.state.borrow_mut();
            let record = ProjectRecord {
                id: ProjectId::new(state.next_id("project")),
                owner_id: owner,
                title: project.title.clone(),
                description: project.description.clone(),
                created_at: state.tick(),
            };
            state.projects.push(record.clone());
            record
        });
        self.finish(op, outcome).await
    }

    async fn list_projects(&self) -> RemoteResult<Vec<ProjectRecord>> {
        let op = RemoteOp::ListProjects;
        let outcome = self.begin(op).map(|owner| {
            self.state
                .borrow()
                .projects
                .iter()
                .rev()
                .filter(|project| project.owner_id == owner)
                .cloned()
                .collect()
        });
        self.finish(op, outcome).await
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> RemoteResult<ProjectRecord> {
        let op = RemoteOp::UpdateProject;
        let outcome = self.begin(op).and_then(|owner| {
            let mut state = self.state.borrow_mut();
            let project = state
                .projects
                .iter_mut()
                .find(|project| &project.id == id && project.owner_id == owner)
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
            if let Some(title) = &patch.title {
                project.title = title.clone();
            }
            if let Some(description) = &patch.description {
                project.description = Some(description.clone());
            }
            Ok(project.clone())
        });
        self.finish(op, outcome).await
    }

    async fn delete_project(&self, id: &ProjectId) -> RemoteResult<()> {
        let op = RemoteOp::DeleteProject;
        let outcome = self.begin(op).and_then(|owner| {
            let mut state = self.state.borrow_mut();
            if !state.owns_project(&owner, id) {
                return Err(RemoteError::NotFound(id.to_string()));
            }
            if state.tasks.iter().any(|task| &task.project_id == id) {
                return Err(RemoteError::Failure(format!(
                    "project {id} is still referenced by tasks"
                )));
            }
            state.projects.retain(|project| &project.id != id);
            Ok(())
        });
        self.finish(op, outcome).await
    }

    async fn create_task(&self, task: &NewTask) -> RemoteResult<TaskRecord> {
        let op = RemoteOp::CreateTask;
        let outcome = self.begin(op).and_then(|owner| {
            let mut state = self.state.borrow_mut();
            if !state.owns_project(&owner, &task.project_id) {
                return Err(RemoteError::NotFound(task.project_id.to_string()));
            }
            let record = TaskRecord {
                id: TaskId::new(state.next_id("task")),
                project_id: task.project_id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
                due_date: task.due_date,
                completed: false,
                priority: task.priority,
                created_at: state.tick(),
            };
            state.tasks.push(record.clone());
            Ok(record)
        });
        self.finish(op, outcome).await
    }

    async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>> {
        let op = RemoteOp::ListTasks;
        let outcome = self.begin(op).map(|owner| {
            let state = self.state.borrow();
            let tasks: Vec<TaskRecord> = state
                .tasks
                .iter()
                .rev()
                .filter(|task| state.owns_project(&owner, &task.project_id))
                .cloned()
                .collect();
            tasks
        });
        self.finish(op, outcome).await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RemoteResult<TaskRecord> {
        let op = RemoteOp::UpdateTask;
        let outcome = self.begin(op).and_then(|owner| {
            let mut state = self.state.borrow_mut();
            let index = state
                .task_index(&owner, id)
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
            let task = &mut state.tasks[index];
            if let Some(title) = &patch.title {
                task.title = title.clone();
            }
            if let Some(description) = &patch.description {
                task.description = Some(description.clone());
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = Some(due_date);
            }
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            Ok(task.clone())
        });
        self.finish(op, outcome).await
    }

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<()> {
        let op = RemoteOp::DeleteTask;
        let outcome = self.begin(op).and_then(|owner| {
            let mut state = self.state.borrow_mut();
            let index = state
                .task_index(&owner, id)
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
            state.tasks.remove(index);
            Ok(())
        });
        self.finish(op, outcome).await
    }

    async fn delete_tasks_by_project(&self, project_id: &ProjectId) -> RemoteResult<u64> {
        let op = RemoteOp::DeleteTasksByProject;
        let outcome = self.begin(op).and_then(|owner| {
            let mut state = self.state.borrow_mut();
            if !state.owns_project(&owner, project_id) {
                return Err(RemoteError::NotFound(project_id.to_string()));
            }
            let before = state.tasks.len();
            state.tasks.retain(|task| &task.project_id != project_id);
            Ok((before - state.tasks.len()) as u64)
        });
        self.finish(op, outcome).await
    }
}
