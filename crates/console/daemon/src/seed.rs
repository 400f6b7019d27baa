//! Boot-time fixture loading
//!
//! The console's CRUD screens own users, projects and tasks. A standalone
//! daemon has no such screens, so a JSON fixture can register the rows the
//! approval flows read:
//!
//! ```json
//! {
//!   "users":       [{ "id": "pm-1", "name": "Pat", "role": "PM" }],
//!   "projects":    [{ "id": "p-1", "name": "Portal", "ownerId": "pm-1" }],
//!   "tasks":       [{ "id": "t-1", "projectId": "p-1", "title": "Login" }],
//!   "definitions": [{ "name": "Task review", "steps": [ ... ] }]
//! }
//! ```
//!
//! Rows whose id already exists are skipped, so a file-backed store can be
//! restarted with the same fixture.

use crate::api::rest::handlers::{CreateProjectRequest, CreateTaskRequest, CreateUserRequest};
use crate::error::{DaemonError, DaemonResult};
use console_storage::ConsoleStorage;
use serde::Deserialize;
use std::path::Path;
use workflow_types::DefinitionDraft;

/// Fixture file contents
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<CreateUserRequest>,
    #[serde(default)]
    pub projects: Vec<CreateProjectRequest>,
    #[serde(default)]
    pub tasks: Vec<CreateTaskRequest>,
    #[serde(default)]
    pub definitions: Vec<DefinitionDraft>,
}

/// Counts of rows a seed actually inserted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub projects: usize,
    pub tasks: usize,
    pub definitions: usize,
}

impl Seed {
    /// Read a fixture file
    pub fn load(path: &Path) -> DaemonResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| DaemonError::Seed(format!("{}: {}", path.display(), e)))
    }

    /// Insert the fixture rows; existing ids are left untouched
    pub async fn apply(self, storage: &dyn ConsoleStorage) -> DaemonResult<SeedReport> {
        let mut report = SeedReport::default();

        for request in self.users {
            let user = request.into_user().map_err(seed_error)?;
            if storage.get_user(&user.id).await?.is_none() {
                storage.insert_user(user).await?;
                report.users += 1;
            }
        }

        for request in self.projects {
            let project = request.into_project(None).map_err(seed_error)?;
            if storage.get_project(&project.id).await?.is_none() {
                storage.insert_project(project).await?;
                report.projects += 1;
            }
        }

        for request in self.tasks {
            let task = request.into_task().map_err(seed_error)?;
            if storage.get_task(&task.id).await?.is_some() {
                continue;
            }
            if storage.get_project(&task.project_id).await?.is_none() {
                return Err(DaemonError::Seed(format!(
                    "task {} references unknown project {}",
                    task.id, task.project_id
                )));
            }
            storage.insert_task(task).await?;
            report.tasks += 1;
        }

        // Definitions get fresh ids, so only seed them into an empty catalogue
        if storage.list_definitions(None).await?.is_empty() {
            for draft in self.definitions {
                let definition = draft
                    .build(None)
                    .map_err(|e| DaemonError::Seed(e.to_string()))?;
                storage.insert_definition(definition).await?;
                report.definitions += 1;
            }
        }

        tracing::info!(
            users = report.users,
            projects = report.projects,
            tasks = report.tasks,
            definitions = report.definitions,
            "Seed applied"
        );
        Ok(report)
    }
}

fn seed_error(err: crate::error::ApiError) -> DaemonError {
    DaemonError::Seed(err.to_string())
}
