//! Definition store: CRUD for workflow definitions
//!
//! Definitions are edited in place; every accepted update bumps the
//! definition's `version`. Instances never read a definition after they
//! start, so edits and deactivation cannot disturb work in flight.

use console_storage::{ConsoleStorage, StorageError};
use console_types::{ConsoleError, ConsoleResult, EntityType, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use workflow_types::{DefinitionDraft, DefinitionPatch, WorkflowDefinition, WorkflowDefinitionId};

/// What a delete request actually did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: WorkflowDefinitionId,
    /// The definition is gone
    pub deleted: bool,
    /// The definition was kept but can no longer start instances
    pub deactivated: bool,
    /// Instances still IN_PROGRESS against this definition
    pub live_instances: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Workflow definition CRUD over the console store
#[derive(Clone)]
pub struct DefinitionStore {
    storage: Arc<dyn ConsoleStorage>,
}

impl DefinitionStore {
    pub fn new(storage: Arc<dyn ConsoleStorage>) -> Self {
        Self { storage }
    }

    /// Validate and store a new definition
    pub async fn create(
        &self,
        actor: &User,
        draft: DefinitionDraft,
    ) -> ConsoleResult<WorkflowDefinition> {
        ensure_manager(actor)?;
        let definition = draft.build(Some(actor.id.clone()))?;
        self.storage.insert_definition(definition.clone()).await?;

        tracing::info!(
            definition_id = %definition.id,
            name = %definition.name,
            steps = definition.step_count(),
            actor = %actor.id,
            "Workflow definition created"
        );
        Ok(definition)
    }

    /// Get a definition by ID
    pub async fn get(&self, id: &WorkflowDefinitionId) -> ConsoleResult<WorkflowDefinition> {
        self.storage
            .get_definition(id)
            .await?
            .ok_or_else(|| ConsoleError::not_found(format!("workflow definition {} not found", id)))
    }

    /// List definitions oldest-first
    pub async fn list(
        &self,
        entity_type: Option<EntityType>,
    ) -> ConsoleResult<Vec<WorkflowDefinition>> {
        Ok(self.storage.list_definitions(entity_type).await?)
    }

    /// The definition used when a task enters a workflow without naming one
    pub async fn default_for(&self, entity_type: EntityType) -> ConsoleResult<WorkflowDefinition> {
        self.list(Some(entity_type))
            .await?
            .into_iter()
            .find(|d| d.active)
            .ok_or_else(|| {
                ConsoleError::not_found(format!(
                    "no active workflow definition for {}",
                    entity_type
                ))
            })
    }

    /// Apply a partial update, producing the next version
    pub async fn update(
        &self,
        actor: &User,
        id: &WorkflowDefinitionId,
        patch: DefinitionPatch,
    ) -> ConsoleResult<WorkflowDefinition> {
        ensure_manager(actor)?;
        let current = self.get(id).await?;
        let next = current.apply_patch(patch)?;
        self.storage
            .replace_definition(next.clone(), current.version)
            .await?;

        tracing::info!(
            definition_id = %id,
            version = next.version,
            active = next.active,
            actor = %actor.id,
            "Workflow definition updated"
        );
        Ok(next)
    }

    /// Delete a definition, or deactivate it if instances reference it.
    ///
    /// Instances keep the definition id for traceability, so a referenced
    /// definition is retired rather than removed.
    pub async fn delete(
        &self,
        actor: &User,
        id: &WorkflowDefinitionId,
    ) -> ConsoleResult<DeleteOutcome> {
        ensure_manager(actor)?;
        let current = self.get(id).await?;
        let instances = self.storage.list_instances_for_definition(id).await?;

        if instances.is_empty() {
            match self.storage.delete_definition(id).await {
                Ok(()) => {
                    tracing::info!(
                        definition_id = %id,
                        actor = %actor.id,
                        "Workflow definition deleted"
                    );
                    return Ok(DeleteOutcome {
                        id: id.clone(),
                        deleted: true,
                        deactivated: false,
                        live_instances: 0,
                        warning: None,
                    });
                }
                // An instance was started in between; fall through to deactivation
                Err(StorageError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let live_instances = self
            .storage
            .list_instances_for_definition(id)
            .await?
            .iter()
            .filter(|i| i.is_in_progress())
            .count();

        if current.active {
            self.update(
                actor,
                id,
                DefinitionPatch {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        }

        let warning = format!(
            "workflow definition {} is referenced by workflow instances ({} in progress); it was deactivated instead of deleted",
            id, live_instances
        );
        tracing::warn!(
            definition_id = %id,
            live_instances,
            actor = %actor.id,
            "Workflow definition deactivated instead of deleted"
        );

        Ok(DeleteOutcome {
            id: id.clone(),
            deleted: false,
            deactivated: true,
            live_instances,
            warning: Some(warning),
        })
    }
}

fn ensure_manager(actor: &User) -> ConsoleResult<()> {
    if actor.role.can_manage_workflows() {
        Ok(())
    } else {
        Err(ConsoleError::unauthorized(format!(
            "role {} cannot manage workflow definitions",
            actor.role
        )))
    }
}
