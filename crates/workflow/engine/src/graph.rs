//! Loading the task → project → users graph approver resolution reads

use crate::resolver::ResolutionContext;
use console_storage::ConsoleStorage;
use console_types::{ConsoleError, ConsoleResult, Project, Task, TaskId, User};

/// An owned snapshot of a task and the rows around it
#[derive(Clone, Debug)]
pub struct TaskGraph {
    pub task: Task,
    pub project: Project,
    pub users: Vec<User>,
}

impl TaskGraph {
    pub async fn load(storage: &dyn ConsoleStorage, task_id: &TaskId) -> ConsoleResult<Self> {
        let task = storage
            .get_task(task_id)
            .await?
            .ok_or_else(|| ConsoleError::not_found(format!("task {} not found", task_id)))?;
        let project = storage.get_project(&task.project_id).await?.ok_or_else(|| {
            ConsoleError::not_found(format!(
                "project {} of task {} not found",
                task.project_id, task_id
            ))
        })?;
        let users = storage.list_users().await?;
        Ok(Self {
            task,
            project,
            users,
        })
    }

    pub fn ctx(&self) -> ResolutionContext<'_> {
        ResolutionContext {
            task: &self.task,
            project: &self.project,
            users: &self.users,
        }
    }
}
