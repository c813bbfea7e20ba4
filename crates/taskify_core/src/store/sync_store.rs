//! Task/project synchronization store.
//!
//! # Responsibility
//! - Keep the signed-in user's projects and tasks in memory.
//! - Route every project-backed mutation through the remote store and apply
//!   it locally only after confirmation.
//! - Own the view state and the pending task title.
//!
//! # Invariants
//! - No `RefCell` borrow is held across an `.await`, so operations can
//!   interleave on one thread.
//! - Responses are dropped when the identity changed while they were in
//!   flight, or when their record no longer exists locally.
//! - Fallback-category tasks never reach the remote store.
//! - Validation failures never reach the remote store.
//! - Mutations of the same project or task id run one after another; each
//!   reads the local state the previous one left behind.

use super::entity_lock::{EntityKey, EntityLocks};
use super::error::{CascadeFailure, SyncError, SyncResult};
use super::snapshot::StoreSnapshot;
use crate::auth::{Identity, IdentityReceiver};
use crate::model::project::{
    normalize_description, normalize_project_name, Project, ProjectId,
};
use crate::model::task::{
    normalize_task_title, Priority, Task, TaskId, TaskValidationError, FALLBACK_CATEGORY,
};
use crate::remote::{
    NewProject, NewTask, ProjectPatch, RemoteError, RemoteOp, RemoteStore, TaskPatch,
    TaskRecord,
};
use crate::view::ViewState;
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::cell::RefCell;

struct StoreState {
    identity: Option<Identity>,
    /// Bumped on every identity change; mutation responses from an older
    /// session are dropped.
    session_epoch: u64,
    /// Bumped on every load; results of superseded loads are dropped.
    load_epoch: u64,
    loading: bool,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    view: ViewState,
    pending_title: String,
}

/// Explicit store handle shared with rendering layers.
pub struct SyncStore<R: RemoteStore> {
    remote: R,
    state: RefCell<StoreState>,
    locks: EntityLocks,
}

impl<R: RemoteStore> SyncStore<R> {
    /// Creates a signed-out store whose default-date view shows `today`.
    pub fn new(remote: R, today: NaiveDate) -> Self {
        Self {
            remote,
            state: RefCell::new(StoreState {
                identity: None,
                session_epoch: 0,
                load_epoch: 0,
                loading: false,
                projects: Vec::new(),
                tasks: Vec::new(),
                view: ViewState::new(today),
                pending_title: String::new(),
            }),
            locks: EntityLocks::default(),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.borrow();
        StoreSnapshot {
            identity: state.identity.clone(),
            loading: state.loading,
            projects: state.projects.clone(),
            tasks: state.tasks.clone(),
            view: state.view.clone(),
            pending_title: state.pending_title.clone(),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.borrow().projects.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.state
            .borrow()
            .projects
            .iter()
            .find(|project| &project.id == id)
            .cloned()
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state
            .borrow()
            .tasks
            .iter()
            .find(|task| &task.id == id)
            .cloned()
    }

    /// Current display category of a task.
    pub fn category_of(&self, task: &Task) -> String {
        crate::view::category_name(task, &self.state.borrow().projects).to_string()
    }

    /// Owned copies of the tasks visible under the current view state.
    pub fn visible_tasks(&self, today: NaiveDate) -> Vec<Task> {
        self.snapshot()
            .visible_tasks(today)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn view(&self) -> ViewState {
        self.state.borrow().view.clone()
    }

    /// Applies a navigation or filter change to the view state.
    pub fn update_view<T>(&self, change: impl FnOnce(&mut ViewState) -> T) -> T {
        change(&mut self.state.borrow_mut().view)
    }

    /// Switches to the single-project view for a known project.
    pub fn select_project(&self, id: &ProjectId) -> SyncResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.projects.iter().any(|project| &project.id == id) {
            return Err(SyncError::project_not_found(id));
        }
        state.view.select_project(id.clone());
        Ok(())
    }

    pub fn pending_title(&self) -> String {
        self.state.borrow().pending_title.clone()
    }

    pub fn set_pending_title(&self, title: impl Into<String>) {
        self.state.borrow_mut().pending_title = title.into();
    }

    /// Reacts to an identity change from the auth session.
    ///
    /// `None` clears all local state synchronously. `Some` reloads projects
    /// and tasks; on failure the collections stay empty and the error is
    /// returned.
    pub async fn set_identity(&self, identity: Option<Identity>) -> SyncResult<()> {
        let Some(identity) = identity else {
            let mut state = self.state.borrow_mut();
            state.identity = None;
            state.session_epoch += 1;
            state.load_epoch += 1;
            state.loading = false;
            state.projects.clear();
            state.tasks.clear();
            state.pending_title.clear();
            state.view.clear_filters();
            info!("event=sync_identity module=store status=ok identity=absent");
            return Ok(());
        };

        let load_epoch = {
            let mut state = self.state.borrow_mut();
            info!(
                "event=sync_identity module=store status=ok identity=present user_id={}",
                identity.id
            );
            state.identity = Some(identity);
            state.session_epoch += 1;
            state.projects.clear();
            state.tasks.clear();
            state.pending_title.clear();
            state.view.clear_filters();
            begin_load(&mut state)
        };
        self.load(load_epoch).await
    }

    /// Pulls projects and tasks again for the current identity.
    ///
    /// Local-only fallback tasks are kept.
    pub async fn reload(&self) -> SyncResult<()> {
        let load_epoch = {
            let mut state = self.state.borrow_mut();
            if state.identity.is_none() {
                return Err(SyncError::NotAuthenticated);
            }
            begin_load(&mut state)
        };
        self.load(load_epoch).await
    }

    /// Drives `set_identity` from an auth session until its sender is gone.
    ///
    /// Load failures are logged; the loop keeps following the session.
    pub async fn follow_session(&self, mut session: IdentityReceiver) {
        let mut identity = session.borrow_and_update().clone();
        loop {
            if identity != self.identity() {
                if let Err(err) = self.set_identity(identity).await {
                    warn!("event=sync_follow module=store status=error error={err}");
                }
            }
            if session.changed().await.is_err() {
                debug!("event=sync_follow module=store status=ok reason=session_closed");
                return;
            }
            identity = session.borrow_and_update().clone();
        }
    }

    async fn load(&self, load_epoch: u64) -> SyncResult<()> {
        let projects = self.remote.list_projects().await;
        let tasks = match &projects {
            Ok(_) => self.remote.list_tasks().await,
            Err(_) => Ok(Vec::new()),
        };

        let mut state = self.state.borrow_mut();
        if state.load_epoch != load_epoch {
            debug!("event=sync_load module=store status=discarded reason=superseded");
            return Ok(());
        }
        state.loading = false;
        state.tasks.retain(|task| !task.is_project_backed());

        let (projects, tasks) = match projects.and_then(|projects| Ok((projects, tasks?))) {
            Ok(loaded) => loaded,
            Err(err) => {
                state.projects.clear();
                warn!("event=sync_load module=store status=error error={err}");
                return Err(err.into());
            }
        };

        state.projects = projects.into_iter().map(Project::from).collect();
        let local_only = std::mem::take(&mut state.tasks);
        state.tasks = tasks.into_iter().map(Task::from).collect();
        state.tasks.extend(local_only);
        info!(
            "event=sync_load module=store status=ok projects={} tasks={}",
            state.projects.len(),
            state.tasks.len()
        );
        Ok(())
    }

    /// Creates a project remotely and appends the confirmed record.
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> SyncResult<Project> {
        let session = self.require_session()?;
        let request = NewProject {
            title: normalize_project_name(name)?,
            description: normalize_description(description),
        };

        let record = self
            .remote
            .create_project(&request)
            .await
            .map_err(|err| remote_failure(RemoteOp::CreateProject, err))?;
        let project = Project::from(record);

        let mut state = self.state.borrow_mut();
        if state.session_epoch == session {
            state.projects.push(project.clone());
            debug!(
                "event=sync_mutation module=store op=create_project status=ok project_id={}",
                project.id
            );
        } else {
            debug_stale_session(RemoteOp::CreateProject);
        }
        Ok(project)
    }

    /// Renames a project (and optionally replaces its description).
    ///
    /// Task categories follow automatically because tasks reference the
    /// project by id.
    pub async fn rename_project(
        &self,
        id: &ProjectId,
        name: &str,
        description: Option<&str>,
    ) -> SyncResult<Project> {
        let _serial = self.locks.acquire(EntityKey::Project(id.clone())).await;
        let session = self.require_session()?;
        self.require_project(id)?;
        let patch = ProjectPatch {
            title: Some(normalize_project_name(name)?),
            description: normalize_description(description),
        };

        let record = self
            .remote
            .update_project(id, &patch)
            .await
            .map_err(|err| remote_failure(RemoteOp::UpdateProject, err))?;
        let project = Project::from(record);

        let mut state = self.state.borrow_mut();
        if state.session_epoch != session {
            debug_stale_session(RemoteOp::UpdateProject);
            return Ok(project);
        }
        match state.projects.iter_mut().find(|local| local.id == project.id) {
            Some(local) => *local = project.clone(),
            None => debug_missing_locally(RemoteOp::UpdateProject, project.id.as_str()),
        }
        Ok(project)
    }

    /// Deletes a project and all of its tasks.
    ///
    /// Tasks are deleted remotely first, then the project. When the second
    /// call fails the local tasks are removed (they are gone remotely), the
    /// project stays, and `SyncError::PartialFailure` is returned.
    pub async fn delete_project(&self, id: &ProjectId) -> SyncResult<()> {
        let _serial = self.locks.acquire(EntityKey::Project(id.clone())).await;
        let session = self.require_session()?;
        self.require_project(id)?;

        let tasks_deleted = self
            .remote
            .delete_tasks_by_project(id)
            .await
            .map_err(|err| remote_failure(RemoteOp::DeleteTasksByProject, err))?;

        let project_result = self.remote.delete_project(id).await;

        let mut state = self.state.borrow_mut();
        if state.session_epoch != session {
            debug_stale_session(RemoteOp::DeleteProject);
        } else {
            state
                .tasks
                .retain(|task| task.project_id.as_ref() != Some(id));
        }

        if let Err(err) = project_result {
            warn!(
                "event=sync_mutation module=store op=delete_project status=partial_failure project_id={} tasks_deleted={} error={}",
                id, tasks_deleted, err
            );
            return Err(SyncError::PartialFailure(CascadeFailure {
                project_id: id.clone(),
                tasks_deleted,
                reason: err.to_string(),
            }));
        }

        if state.session_epoch == session {
            state.projects.retain(|project| &project.id != id);
            if state.view.project_removed(id) {
                debug!("event=sync_view module=store status=ok transition=default_date reason=project_deleted");
            }
        }
        debug!(
            "event=sync_mutation module=store op=delete_project status=ok project_id={id} tasks_deleted={tasks_deleted}"
        );
        Ok(())
    }

    /// Creates a task from the pending title.
    ///
    /// `category` must name a loaded project or the fallback category. The
    /// fallback path creates a local-only task with a client id. The pending
    /// title is cleared only on success.
    pub async fn create_task(
        &self,
        category: &str,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> SyncResult<Task> {
        let session = self.require_session()?;
        let (submitted, title, project_id) = {
            let state = self.state.borrow();
            let submitted = state.pending_title.clone();
            let title = normalize_task_title(&submitted)?;
            let project_id = resolve_category(&state.projects, category)?;
            (submitted, title, project_id)
        };

        let Some(project_id) = project_id else {
            let task = Task::new_local(title, priority, due_date, now_ms());
            let mut state = self.state.borrow_mut();
            state.tasks.push(task.clone());
            clear_pending_if_unchanged(&mut state, &submitted);
            debug!(
                "event=sync_mutation module=store op=create_task status=ok task_id={} scope=local",
                task.id
            );
            return Ok(task);
        };

        let request = NewTask {
            project_id,
            title,
            description: None,
            due_date,
            priority,
        };
        let record = self
            .remote
            .create_task(&request)
            .await
            .map_err(|err| remote_failure(RemoteOp::CreateTask, err))?;
        let task = Task::from(record);

        let mut state = self.state.borrow_mut();
        if state.session_epoch != session {
            debug_stale_session(RemoteOp::CreateTask);
            return Ok(task);
        }
        if state.projects.iter().any(|project| Some(&project.id) == task.project_id.as_ref()) {
            state.tasks.push(task.clone());
        } else {
            debug_missing_locally(RemoteOp::CreateTask, request.project_id.as_str());
        }
        clear_pending_if_unchanged(&mut state, &submitted);
        debug!(
            "event=sync_mutation module=store op=create_task status=ok task_id={} scope=remote",
            task.id
        );
        Ok(task)
    }

    /// Flips a task's completion flag: remotely first for project-backed
    /// tasks, locally only for fallback tasks.
    ///
    /// The new flag is derived from the local task once earlier mutations of
    /// the same id have finished, so two quick toggles cancel out.
    pub async fn toggle_task_completion(&self, id: &TaskId) -> SyncResult<Task> {
        let _serial = self.locks.acquire(EntityKey::Task(id.clone())).await;
        let task = self.require_task(id)?;
        let patch = TaskPatch {
            completed: Some(!task.completed),
            ..TaskPatch::default()
        };
        self.update_task(task, patch).await
    }

    /// Replaces a task's title and, when given, its due date.
    pub async fn edit_task(
        &self,
        id: &TaskId,
        title: &str,
        due_date: Option<NaiveDate>,
    ) -> SyncResult<Task> {
        let title = normalize_task_title(title)?;
        let _serial = self.locks.acquire(EntityKey::Task(id.clone())).await;
        let task = self.require_task(id)?;
        let patch = TaskPatch {
            title: Some(title),
            due_date,
            ..TaskPatch::default()
        };
        self.update_task(task, patch).await
    }

    pub async fn set_task_priority(&self, id: &TaskId, priority: Priority) -> SyncResult<Task> {
        let _serial = self.locks.acquire(EntityKey::Task(id.clone())).await;
        let task = self.require_task(id)?;
        let patch = TaskPatch {
            priority: Some(priority),
            ..TaskPatch::default()
        };
        self.update_task(task, patch).await
    }

    /// Deletes one task; remotely first when it is project-backed.
    pub async fn delete_task(&self, id: &TaskId) -> SyncResult<()> {
        let _serial = self.locks.acquire(EntityKey::Task(id.clone())).await;
        let session = self.require_session()?;
        let task = self.require_task(id)?;

        if task.is_project_backed() {
            self.remote
                .delete_task(id)
                .await
                .map_err(|err| remote_failure(RemoteOp::DeleteTask, err))?;
        }

        let mut state = self.state.borrow_mut();
        if state.session_epoch != session {
            debug_stale_session(RemoteOp::DeleteTask);
            return Ok(());
        }
        state.tasks.retain(|local| &local.id != id);
        debug!("event=sync_mutation module=store op=delete_task status=ok task_id={id}");
        Ok(())
    }

    async fn update_task(&self, task: Task, patch: TaskPatch) -> SyncResult<Task> {
        let session = self.require_session()?;

        if !task.is_project_backed() {
            let updated = apply_patch_locally(task, &patch);
            let mut state = self.state.borrow_mut();
            if let Some(local) = state.tasks.iter_mut().find(|local| local.id == updated.id) {
                *local = updated.clone();
            }
            debug!(
                "event=sync_mutation module=store op=update_task status=ok task_id={} scope=local",
                updated.id
            );
            return Ok(updated);
        }

        let record = self
            .remote
            .update_task(&task.id, &patch)
            .await
            .map_err(|err| remote_failure(RemoteOp::UpdateTask, err))?;
        Ok(self.apply_task_record(session, record))
    }

    fn apply_task_record(&self, session: u64, record: TaskRecord) -> Task {
        let task = Task::from(record);
        let mut state = self.state.borrow_mut();
        if state.session_epoch != session {
            debug_stale_session(RemoteOp::UpdateTask);
            return task;
        }
        match state.tasks.iter_mut().find(|local| local.id == task.id) {
            Some(local) => {
                *local = task.clone();
                debug!(
                    "event=sync_mutation module=store op=update_task status=ok task_id={} scope=remote",
                    task.id
                );
            }
            None => debug_missing_locally(RemoteOp::UpdateTask, task.id.as_str()),
        }
        task
    }

    fn require_session(&self) -> SyncResult<u64> {
        let state = self.state.borrow();
        match state.identity {
            Some(_) => Ok(state.session_epoch),
            None => Err(SyncError::NotAuthenticated),
        }
    }

    fn require_project(&self, id: &ProjectId) -> SyncResult<Project> {
        self.project(id)
            .ok_or_else(|| SyncError::project_not_found(id))
    }

    fn require_task(&self, id: &TaskId) -> SyncResult<Task> {
        self.task(id).ok_or_else(|| SyncError::task_not_found(id))
    }
}

fn begin_load(state: &mut StoreState) -> u64 {
    state.load_epoch += 1;
    state.loading = true;
    state.load_epoch
}

/// Maps a category name to a project id; `None` is the fallback category.
///
/// Project names win over the fallback name, and the first loaded project
/// with a matching name is used.
fn resolve_category(
    projects: &[Project],
    category: &str,
) -> Result<Option<ProjectId>, TaskValidationError> {
    let category = category.trim();
    if let Some(project) = projects.iter().find(|project| project.name == category) {
        return Ok(Some(project.id.clone()));
    }
    if category == FALLBACK_CATEGORY {
        return Ok(None);
    }
    Err(TaskValidationError::UnknownCategory(category.to_string()))
}

fn apply_patch_locally(mut task: Task, patch: &TaskPatch) -> Task {
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
    task
}

fn clear_pending_if_unchanged(state: &mut StoreState, submitted: &str) {
    if state.pending_title == submitted {
        state.pending_title.clear();
    }
}

fn remote_failure(op: RemoteOp, err: RemoteError) -> SyncError {
    warn!(
        "event=sync_mutation module=store op={} status=error error={}",
        op.as_str(),
        err
    );
    err.into()
}

fn debug_stale_session(op: RemoteOp) {
    debug!(
        "event=sync_mutation module=store op={} status=discarded reason=identity_changed",
        op.as_str()
    );
}

fn debug_missing_locally(op: RemoteOp, id: &str) {
    debug!(
        "event=sync_mutation module=store op={} status=discarded reason=missing_locally id={}",
        op.as_str(),
        id
    );
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
