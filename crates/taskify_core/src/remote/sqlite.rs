//! SQLite-backed remote store.
//!
//! # Responsibility
//! - Persist projects and tasks in the `projects` / `tasks` tables.
//! - Scope every statement to the owner published by the auth session.
//!
//! # Invariants
//! - Ids are generated here (UUID v4), never by callers.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Task statements only touch rows whose project belongs to the owner.

use super::{
    require_owner, NewProject, NewTask, ProjectPatch, ProjectRecord, RemoteError, RemoteOp,
    RemoteResult, RemoteStore, TaskPatch, TaskRecord,
};
use crate::auth::{IdentityReceiver, UserId};
use crate::model::project::ProjectId;
use crate::model::task::{Priority, TaskId};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::rc::Rc;
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    description,
    created_at
FROM projects";

const TASK_SELECT_SQL: &str = "SELECT
    tasks.id AS id,
    tasks.project_id AS project_id,
    tasks.title AS title,
    tasks.description AS description,
    tasks.due_date AS due_date,
    tasks.completed AS completed,
    tasks.priority AS priority,
    tasks.created_at AS created_at
FROM tasks
INNER JOIN projects ON projects.id = tasks.project_id";

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Remote store implementation over a migrated SQLite connection.
pub struct SqliteRemoteStore {
    conn: Rc<Connection>,
    session: IdentityReceiver,
}

impl SqliteRemoteStore {
    pub fn new(conn: Rc<Connection>, session: IdentityReceiver) -> Self {
        Self { conn, session }
    }

    fn owner(&self, op: RemoteOp) -> RemoteResult<UserId> {
        let owner = require_owner(&self.session);
        if owner.is_err() {
            debug!(
                "event=remote_call module=remote.sqlite op={} status=error error_code=not_authenticated",
                op.as_str()
            );
        }
        owner
    }

    fn get_project(&self, owner: &UserId, id: &ProjectId) -> RemoteResult<ProjectRecord> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE id = ?1 AND user_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.as_str(), owner.as_str()])?;
        if let Some(row) = rows.next()? {
            return parse_project_row(row);
        }

        Err(RemoteError::NotFound(id.to_string()))
    }

    fn get_task(&self, owner: &UserId, id: &TaskId) -> RemoteResult<TaskRecord> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE tasks.id = ?1 AND projects.user_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.as_str(), owner.as_str()])?;
        if let Some(row) = rows.next()? {
            return parse_task_row(row);
        }

        Err(RemoteError::NotFound(id.to_string()))
    }

    fn ensure_project_owned(&self, owner: &UserId, id: &ProjectId) -> RemoteResult<()> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1 AND user_id = ?2;",
                params![id.as_str(), owner.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(id.to_string())),
        }
    }
}

#[async_trait(?Send)]
impl RemoteStore for SqliteRemoteStore {
    async fn create_project(&self, project: &NewProject) -> RemoteResult<ProjectRecord> {
        let owner = self.owner(RemoteOp::CreateProject)?;
        let id = ProjectId::new(Uuid::new_v4().to_string());

        self.conn.execute(
            "INSERT INTO projects (id, user_id, title, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.as_str(),
                owner.as_str(),
                project.title.as_str(),
                project.description.as_deref(),
            ],
        )?;
        debug!("event=remote_call module=remote.sqlite op=create_project status=ok project_id={id}");

        self.get_project(&owner, &id)
    }

    async fn list_projects(&self) -> RemoteResult<Vec<ProjectRecord>> {
        let owner = self.owner(RemoteOp::ListProjects)?;
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([owner.as_str()])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }

        debug!(
            "event=remote_call module=remote.sqlite op=list_projects status=ok count={}",
            projects.len()
        );
        Ok(projects)
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> RemoteResult<ProjectRecord> {
        let owner = self.owner(RemoteOp::UpdateProject)?;
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                title = COALESCE(?1, title),
                description = COALESCE(?2, description)
             WHERE id = ?3 AND user_id = ?4;",
            params![
                patch.title.as_deref(),
                patch.description.as_deref(),
                id.as_str(),
                owner.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }

        debug!("event=remote_call module=remote.sqlite op=update_project status=ok project_id={id}");
        self.get_project(&owner, id)
    }

    async fn delete_project(&self, id: &ProjectId) -> RemoteResult<()> {
        let owner = self.owner(RemoteOp::DeleteProject)?;
        let changed = self.conn.execute(
            "DELETE FROM projects WHERE id = ?1 AND user_id = ?2;",
            params![id.as_str(), owner.as_str()],
        )?;
        if changed == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }

        debug!("event=remote_call module=remote.sqlite op=delete_project status=ok project_id={id}");
        Ok(())
    }

    async fn create_task(&self, task: &NewTask) -> RemoteResult<TaskRecord> {
        let owner = self.owner(RemoteOp::CreateTask)?;
        self.ensure_project_owned(&owner, &task.project_id)?;

        let id = TaskId::new(Uuid::new_v4().to_string());
        self.conn.execute(
            "INSERT INTO tasks (id, project_id, title, description, due_date, completed, priority)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6);",
            params![
                id.as_str(),
                task.project_id.as_str(),
                task.title.as_str(),
                task.description.as_deref(),
                task.due_date.map(format_due_date),
                task.priority.as_str(),
            ],
        )?;
        debug!(
            "event=remote_call module=remote.sqlite op=create_task status=ok task_id={} project_id={}",
            id, task.project_id
        );

        self.get_task(&owner, &id)
    }

    async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>> {
        let owner = self.owner(RemoteOp::ListTasks)?;
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE projects.user_id = ?1
             ORDER BY tasks.created_at DESC, tasks.rowid DESC;"
        ))?;
        let mut rows = stmt.query([owner.as_str()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        debug!(
            "event=remote_call module=remote.sqlite op=list_tasks status=ok count={}",
            tasks.len()
        );
        Ok(tasks)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RemoteResult<TaskRecord> {
        let owner = self.owner(RemoteOp::UpdateTask)?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = COALESCE(?1, title),
                description = COALESCE(?2, description),
                due_date = COALESCE(?3, due_date),
                completed = COALESCE(?4, completed),
                priority = COALESCE(?5, priority)
             WHERE id = ?6
               AND project_id IN (SELECT id FROM projects WHERE user_id = ?7);",
            params![
                patch.title.as_deref(),
                patch.description.as_deref(),
                patch.due_date.map(format_due_date),
                patch.completed.map(bool_to_int),
                patch.priority.map(Priority::as_str),
                id.as_str(),
                owner.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }

        debug!("event=remote_call module=remote.sqlite op=update_task status=ok task_id={id}");
        self.get_task(&owner, id)
    }

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<()> {
        let owner = self.owner(RemoteOp::DeleteTask)?;
        let changed = self.conn.execute(
            "DELETE FROM tasks
             WHERE id = ?1
               AND project_id IN (SELECT id FROM projects WHERE user_id = ?2);",
            params![id.as_str(), owner.as_str()],
        )?;
        if changed == 0 {
            return Err(RemoteError::NotFound(id.to_string()));
        }

        debug!("event=remote_call module=remote.sqlite op=delete_task status=ok task_id={id}");
        Ok(())
    }

    async fn delete_tasks_by_project(&self, project_id: &ProjectId) -> RemoteResult<u64> {
        let owner = self.owner(RemoteOp::DeleteTasksByProject)?;
        self.ensure_project_owned(&owner, project_id)?;

        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE project_id = ?1;", [project_id.as_str()])?;

        debug!(
            "event=remote_call module=remote.sqlite op=delete_tasks_by_project status=ok project_id={} count={}",
            project_id, deleted
        );
        Ok(deleted as u64)
    }
}

fn parse_project_row(row: &Row<'_>) -> RemoteResult<ProjectRecord> {
    Ok(ProjectRecord {
        id: ProjectId::new(row.get::<_, String>("id")?),
        owner_id: UserId::new(row.get::<_, String>("user_id")?),
        title: row.get("title")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RemoteResult<TaskRecord> {
    let due_date = match row.get::<_, Option<String>>("due_date")? {
        Some(value) => Some(parse_due_date(&value).ok_or_else(|| {
            RemoteError::Failure(format!("invalid due date `{value}` in tasks.due_date"))
        })?),
        None => None,
    };

    let priority_text: String = row.get("priority")?;
    let priority = priority_text.parse::<Priority>().map_err(|_| {
        RemoteError::Failure(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RemoteError::Failure(format!(
                "invalid completed value `{other}` in tasks.completed"
            )));
        }
    };

    Ok(TaskRecord {
        id: TaskId::new(row.get::<_, String>("id")?),
        project_id: ProjectId::new(row.get::<_, String>("project_id")?),
        title: row.get("title")?,
        description: row.get("description")?,
        due_date,
        completed,
        priority,
        created_at: row.get("created_at")?,
    })
}

fn format_due_date(date: NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}

fn parse_due_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DUE_DATE_FORMAT).ok()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
