//! In-memory implementation of the console storage traits.
//!
//! Every collection lives behind a single lock, so a compare-and-set check,
//! the write it guards and the audit record it produces are one critical
//! section. With a snapshot path configured the whole store is written to
//! disk after each mutation and reloaded on open; a mutation whose snapshot
//! cannot be written is not applied.

use crate::traits::{
    ActionRepository, DefinitionRepository, DirectoryRepository, InstanceRepository,
    ProjectRepository,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use console_types::{EntityRef, EntityType, Project, ProjectId, Task, TaskId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use workflow_types::{
    InstanceStatus, WorkflowAction, WorkflowActionAppend, WorkflowDefinition,
    WorkflowDefinitionId, WorkflowInstance, WorkflowInstanceId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    users: HashMap<UserId, User>,
    #[serde(default)]
    tasks: HashMap<TaskId, Task>,
    #[serde(default)]
    projects: HashMap<ProjectId, Project>,
    #[serde(default)]
    definitions: HashMap<WorkflowDefinitionId, WorkflowDefinition>,
    #[serde(default)]
    instances: HashMap<WorkflowInstanceId, WorkflowInstance>,
    #[serde(default)]
    actions: HashMap<WorkflowInstanceId, Vec<WorkflowAction>>,
}

/// In-memory console storage adapter.
#[derive(Debug, Default)]
pub struct InMemoryConsoleStorage {
    data: RwLock<StoreData>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryConsoleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file-snapshotted store, loading `path` if it exists.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.is_empty() {
                StoreData::default()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            StoreData::default()
        };

        tracing::info!(
            path = %path.display(),
            definitions = data.definitions.len(),
            instances = data.instances.len(),
            projects = data.projects.len(),
            "Opened console store snapshot"
        );

        Ok(Self {
            data: RwLock::new(data),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> StorageResult<T> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    /// Apply `f` under the write lock. With a snapshot configured the change
    /// is made on a copy, persisted, and only then swapped in.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreData) -> StorageResult<T>) -> StorageResult<T> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))?;

        match &self.snapshot_path {
            None => f(&mut guard),
            Some(path) => {
                let mut next = guard.clone();
                let value = f(&mut next)?;
                persist(path, &next)?;
                *guard = next;
                Ok(value)
            }
        }
    }
}

fn persist(path: &Path, data: &StoreData) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(data)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl DirectoryRepository for InMemoryConsoleStorage {
    async fn insert_user(&self, user: User) -> StorageResult<()> {
        self.mutate(|data| {
            if data.users.contains_key(&user.id) {
                return Err(StorageError::Conflict(format!(
                    "user {} already exists",
                    user.id
                )));
            }
            data.users.insert(user.id.clone(), user);
            Ok(())
        })
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        self.read(|data| data.users.get(id).cloned())
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        self.read(|data| {
            let mut values = data.users.values().cloned().collect::<Vec<_>>();
            values.sort_by(|a, b| a.id.cmp(&b.id));
            values
        })
    }

    async fn insert_task(&self, task: Task) -> StorageResult<()> {
        self.mutate(|data| {
            if data.tasks.contains_key(&task.id) {
                return Err(StorageError::Conflict(format!(
                    "task {} already exists",
                    task.id
                )));
            }
            data.tasks.insert(task.id.clone(), task);
            Ok(())
        })
    }

    async fn get_task(&self, id: &TaskId) -> StorageResult<Option<Task>> {
        self.read(|data| data.tasks.get(id).cloned())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryConsoleStorage {
    async fn insert_project(&self, mut project: Project) -> StorageResult<Project> {
        self.mutate(|data| {
            if data.projects.contains_key(&project.id) {
                return Err(StorageError::Conflict(format!(
                    "project {} already exists",
                    project.id
                )));
            }
            project.version = 1;
            data.projects.insert(project.id.clone(), project.clone());
            Ok(project)
        })
    }

    async fn get_project(&self, id: &ProjectId) -> StorageResult<Option<Project>> {
        self.read(|data| data.projects.get(id).cloned())
    }

    async fn update_project(
        &self,
        mut project: Project,
        expected_version: u64,
    ) -> StorageResult<Project> {
        self.mutate(|data| {
            let stored = data.projects.get_mut(&project.id).ok_or_else(|| {
                StorageError::NotFound(format!("project {} not found", project.id))
            })?;

            if stored.version != expected_version {
                return Err(StorageError::Conflict(format!(
                    "project {} was modified concurrently: expected version {}, found {}",
                    project.id, expected_version, stored.version
                )));
            }

            project.version = expected_version + 1;
            *stored = project.clone();
            Ok(project)
        })
    }
}

#[async_trait]
impl DefinitionRepository for InMemoryConsoleStorage {
    async fn insert_definition(&self, definition: WorkflowDefinition) -> StorageResult<()> {
        self.mutate(|data| {
            if data.definitions.contains_key(&definition.id) {
                return Err(StorageError::Conflict(format!(
                    "workflow definition {} already exists",
                    definition.id
                )));
            }
            data.definitions.insert(definition.id.clone(), definition);
            Ok(())
        })
    }

    async fn get_definition(
        &self,
        id: &WorkflowDefinitionId,
    ) -> StorageResult<Option<WorkflowDefinition>> {
        self.read(|data| data.definitions.get(id).cloned())
    }

    async fn list_definitions(
        &self,
        entity_type: Option<EntityType>,
    ) -> StorageResult<Vec<WorkflowDefinition>> {
        self.read(|data| {
            let mut values = data
                .definitions
                .values()
                .filter(|d| entity_type.map_or(true, |t| d.entity_type == t))
                .cloned()
                .collect::<Vec<_>>();
            values.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.0.cmp(&b.id.0))
            });
            values
        })
    }

    async fn replace_definition(
        &self,
        definition: WorkflowDefinition,
        expected_version: u32,
    ) -> StorageResult<()> {
        self.mutate(|data| {
            let stored = data.definitions.get_mut(&definition.id).ok_or_else(|| {
                StorageError::NotFound(format!("workflow definition {} not found", definition.id))
            })?;

            if stored.version != expected_version {
                return Err(StorageError::Conflict(format!(
                    "workflow definition {} was modified concurrently: expected version {}, found {}",
                    definition.id, expected_version, stored.version
                )));
            }

            *stored = definition;
            Ok(())
        })
    }

    async fn delete_definition(&self, id: &WorkflowDefinitionId) -> StorageResult<()> {
        self.mutate(|data| {
            if !data.definitions.contains_key(id) {
                return Err(StorageError::NotFound(format!(
                    "workflow definition {} not found",
                    id
                )));
            }

            let referenced = data.instances.values().any(|i| &i.definition_id == id);
            if referenced {
                return Err(StorageError::Conflict(format!(
                    "workflow definition {} is referenced by workflow instances",
                    id
                )));
            }

            data.definitions.remove(id);
            Ok(())
        })
    }
}

#[async_trait]
impl InstanceRepository for InMemoryConsoleStorage {
    async fn insert_instance(
        &self,
        mut instance: WorkflowInstance,
    ) -> StorageResult<WorkflowInstance> {
        self.mutate(|data| {
            if data.instances.contains_key(&instance.id) {
                return Err(StorageError::Conflict(format!(
                    "workflow instance {} already exists",
                    instance.id
                )));
            }

            let running = data.instances.values().find(|i| {
                i.entity == instance.entity && i.status == InstanceStatus::InProgress
            });
            if let Some(running) = running {
                return Err(StorageError::Conflict(format!(
                    "{} already has an in-progress instance {} of workflow {}",
                    instance.entity, running.id, running.definition_id
                )));
            }

            instance.version = 1;
            data.instances.insert(instance.id.clone(), instance.clone());
            Ok(instance)
        })
    }

    async fn get_instance(
        &self,
        id: &WorkflowInstanceId,
    ) -> StorageResult<Option<WorkflowInstance>> {
        self.read(|data| data.instances.get(id).cloned())
    }

    async fn latest_instance_for(
        &self,
        entity: &EntityRef,
    ) -> StorageResult<Option<WorkflowInstance>> {
        self.read(|data| {
            data.instances
                .values()
                .filter(|i| &i.entity == entity)
                .max_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.id.0.cmp(&b.id.0))
                })
                .cloned()
        })
    }

    async fn list_instances_for_definition(
        &self,
        definition_id: &WorkflowDefinitionId,
    ) -> StorageResult<Vec<WorkflowInstance>> {
        self.read(|data| {
            let mut values = data
                .instances
                .values()
                .filter(|i| &i.definition_id == definition_id)
                .cloned()
                .collect::<Vec<_>>();
            values.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            values
        })
    }

    async fn commit_transition(
        &self,
        mut instance: WorkflowInstance,
        expected_version: u64,
        action: WorkflowActionAppend,
    ) -> StorageResult<(WorkflowInstance, WorkflowAction)> {
        if action.instance_id != instance.id {
            return Err(StorageError::InvalidInput(format!(
                "action for instance {} cannot be committed with instance {}",
                action.instance_id, instance.id
            )));
        }

        self.mutate(|data| {
            let stored = data.instances.get_mut(&instance.id).ok_or_else(|| {
                StorageError::NotFound(format!("workflow instance {} not found", instance.id))
            })?;

            if stored.version != expected_version {
                return Err(StorageError::Conflict(format!(
                    "workflow instance {} was modified concurrently: expected version {}, found {}",
                    instance.id, expected_version, stored.version
                )));
            }

            let log = data.actions.entry(instance.id.clone()).or_default();
            let record = WorkflowAction::seal(action, log.last())?;

            instance.version = expected_version + 1;
            *stored = instance.clone();
            log.push(record.clone());
            Ok((instance, record))
        })
    }
}

#[async_trait]
impl ActionRepository for InMemoryConsoleStorage {
    async fn list_actions(
        &self,
        instance_id: &WorkflowInstanceId,
    ) -> StorageResult<Vec<WorkflowAction>> {
        self.read(|data| data.actions.get(instance_id).cloned().unwrap_or_default())
    }
}
