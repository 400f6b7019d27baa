use crate::StorageResult;
use async_trait::async_trait;
use console_types::{EntityRef, EntityType, Project, ProjectId, Task, TaskId, User, UserId};
use workflow_types::{
    WorkflowAction, WorkflowActionAppend, WorkflowDefinition, WorkflowDefinitionId,
    WorkflowInstance, WorkflowInstanceId,
};

/// Storage interface for the directory rows approver resolution reads.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Insert a user; fails with `Conflict` if the id is taken.
    async fn insert_user(&self, user: User) -> StorageResult<()>;
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>>;
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    /// Insert a task; fails with `Conflict` if the id is taken.
    async fn insert_task(&self, task: Task) -> StorageResult<()>;
    async fn get_task(&self, id: &TaskId) -> StorageResult<Option<Task>>;
}

/// Storage interface for projects and their package fields.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a project at version 1 and return the stored record.
    async fn insert_project(&self, project: Project) -> StorageResult<Project>;

    async fn get_project(&self, id: &ProjectId) -> StorageResult<Option<Project>>;

    /// Replace a project if its stored version is still `expected_version`.
    ///
    /// The stored record gets `expected_version + 1`, which is returned.
    async fn update_project(&self, project: Project, expected_version: u64)
        -> StorageResult<Project>;
}

/// Storage interface for workflow definitions.
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    async fn insert_definition(&self, definition: WorkflowDefinition) -> StorageResult<()>;

    async fn get_definition(
        &self,
        id: &WorkflowDefinitionId,
    ) -> StorageResult<Option<WorkflowDefinition>>;

    /// List definitions oldest-first, optionally filtered by entity type.
    async fn list_definitions(
        &self,
        entity_type: Option<EntityType>,
    ) -> StorageResult<Vec<WorkflowDefinition>>;

    /// Replace a definition if its stored version is still `expected_version`.
    async fn replace_definition(
        &self,
        definition: WorkflowDefinition,
        expected_version: u32,
    ) -> StorageResult<()>;

    /// Hard-delete a definition. Fails with `Conflict` while any instance
    /// references it.
    async fn delete_definition(&self, id: &WorkflowDefinitionId) -> StorageResult<()>;
}

/// Storage interface for workflow instances.
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Insert a freshly started instance at version 1.
    ///
    /// Fails with `Conflict` if the entity already has an `IN_PROGRESS`
    /// instance of any definition.
    async fn insert_instance(&self, instance: WorkflowInstance) -> StorageResult<WorkflowInstance>;

    async fn get_instance(&self, id: &WorkflowInstanceId)
        -> StorageResult<Option<WorkflowInstance>>;

    /// The most recently started instance bound to `entity`.
    async fn latest_instance_for(
        &self,
        entity: &EntityRef,
    ) -> StorageResult<Option<WorkflowInstance>>;

    async fn list_instances_for_definition(
        &self,
        definition_id: &WorkflowDefinitionId,
    ) -> StorageResult<Vec<WorkflowInstance>>;

    /// Atomically store a transitioned instance and seal its audit record.
    ///
    /// Fails with `Conflict`, and writes nothing, if the stored instance is
    /// no longer at `expected_version`.
    async fn commit_transition(
        &self,
        instance: WorkflowInstance,
        expected_version: u64,
        action: WorkflowActionAppend,
    ) -> StorageResult<(WorkflowInstance, WorkflowAction)>;
}

/// Storage interface for the append-only action log.
#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// Read an instance's records oldest-first.
    async fn list_actions(&self, instance_id: &WorkflowInstanceId)
        -> StorageResult<Vec<WorkflowAction>>;
}

/// Unified storage bundle used by the engine, the package gate and the daemon.
pub trait ConsoleStorage:
    DirectoryRepository
    + ProjectRepository
    + DefinitionRepository
    + InstanceRepository
    + ActionRepository
    + Send
    + Sync
{
}

impl<T> ConsoleStorage for T where
    T: DirectoryRepository
        + ProjectRepository
        + DefinitionRepository
        + InstanceRepository
        + ActionRepository
        + Send
        + Sync
{
}
