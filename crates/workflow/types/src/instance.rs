//! Workflow instances: one definition bound to one entity
//!
//! A WorkflowInstance owns a deep copy of its definition's steps taken at
//! start. The transition rules live in the engine; this module provides
//! the primitive mutations they are built from and keeps the structural
//! invariants (at most one ACTIVE step, `current_step_id` pointing at it).

use crate::{StepId, WorkflowDefinition, WorkflowDefinitionId, WorkflowStepDefinition};
use chrono::{DateTime, Utc};
use console_types::{ActionKind, ConsoleError, ConsoleResult, EntityRef, UserId};
use serde::{Deserialize, Serialize};

// ── Instance Identifier ──────────────────────────────────────────────

/// Unique identifier for a workflow instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowInstanceId(pub String);

impl WorkflowInstanceId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for WorkflowInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Status ───────────────────────────────────────────────────────────

/// Overall state of a workflow instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// No instance bound yet; only appears in status projections
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Rejected,
    ChangesRequested,
}

impl InstanceStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::ChangesRequested => "CHANGES_REQUESTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Rejected | Self::ChangesRequested
        )
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime state of a single step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Approved,
    Rejected,
    ChangesRequested,
    SentBack,
}

impl StepStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::SentBack => "SENT_BACK",
        }
    }

    /// Whether the step has been acted on
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Active)
    }

    /// The step outcome an accepted action produces
    pub fn outcome_of(action: ActionKind) -> Self {
        match action {
            ActionKind::Approve => Self::Approved,
            ActionKind::Reject => Self::Rejected,
            ActionKind::SendBack => Self::SentBack,
            ActionKind::RequestChange => Self::ChangesRequested,
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Step Instance ────────────────────────────────────────────────────

/// A snapshotted step plus its runtime fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepInstance {
    /// Copy of the definition step taken when the instance started
    pub step: WorkflowStepDefinition,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acted_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

impl WorkflowStepInstance {
    fn pending(step: WorkflowStepDefinition) -> Self {
        Self {
            step,
            status: StepStatus::Pending,
            acted_by: None,
            acted_at: None,
            action: None,
            comment: None,
            activated_at: None,
        }
    }

    pub fn id(&self) -> &StepId {
        &self.step.id
    }

    pub fn name(&self) -> &str {
        &self.step.name
    }
}

// ── Workflow Instance ────────────────────────────────────────────────

/// A definition bound to one concrete entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub id: WorkflowInstanceId,
    /// Kept for traceability only; behavior comes from `steps`
    pub definition_id: WorkflowDefinitionId,
    /// Definition version the steps were copied from
    pub definition_version: u32,
    pub entity: EntityRef,
    pub status: InstanceStatus,
    /// The ACTIVE step; `None` once the instance is terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<StepId>,
    pub steps: Vec<WorkflowStepInstance>,
    pub started_by: UserId,
    /// Compare-and-set guard; bumped by the store on every committed transition
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    /// Snapshot `definition` onto `entity` with the first step ACTIVE
    pub fn start(
        definition: &WorkflowDefinition,
        entity: EntityRef,
        started_by: UserId,
    ) -> ConsoleResult<Self> {
        if definition.steps.is_empty() {
            return Err(ConsoleError::validation(format!(
                "workflow definition '{}' has no steps",
                definition.name
            )));
        }
        if definition.entity_type != entity.entity_type {
            return Err(ConsoleError::validation(format!(
                "workflow definition '{}' applies to {} entities, not {}",
                definition.name, definition.entity_type, entity.entity_type
            )));
        }

        let now = Utc::now();
        let mut steps: Vec<WorkflowStepInstance> = definition
            .steps
            .iter()
            .cloned()
            .map(WorkflowStepInstance::pending)
            .collect();
        steps.sort_by_key(|s| s.step.order);

        let mut instance = Self {
            id: WorkflowInstanceId::generate(),
            definition_id: definition.id.clone(),
            definition_version: definition.version,
            entity,
            status: InstanceStatus::InProgress,
            current_step_id: None,
            steps,
            started_by,
            version: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        instance.activate_step(0, now)?;
        Ok(instance)
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == InstanceStatus::InProgress
    }

    /// Index of the ACTIVE step
    pub fn current_index(&self) -> Option<usize> {
        let current = self.current_step_id.as_ref()?;
        self.steps.iter().position(|s| s.id() == current)
    }

    pub fn current_step(&self) -> Option<&WorkflowStepInstance> {
        self.current_index().map(|i| &self.steps[i])
    }

    pub fn step(&self, id: &StepId) -> Option<&WorkflowStepInstance> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn active_step_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Active)
            .count()
    }

    /// Close the step at `index` with the outcome of `action`
    pub fn record_step_outcome(
        &mut self,
        index: usize,
        actor: UserId,
        action: ActionKind,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> ConsoleResult<()> {
        let step = self.steps.get_mut(index).ok_or_else(|| {
            ConsoleError::validation(format!("step index {} out of range", index))
        })?;
        if step.status != StepStatus::Active {
            return Err(ConsoleError::conflict(format!(
                "step '{}' is {}, not ACTIVE",
                step.step.name, step.status
            )));
        }
        step.status = StepStatus::outcome_of(action);
        step.acted_by = Some(actor);
        step.acted_at = Some(at);
        step.action = Some(action);
        step.comment = comment;
        if self.current_step_id.as_ref() == Some(&step.step.id) {
            self.current_step_id = None;
        }
        self.updated_at = at;
        Ok(())
    }

    /// Make the step at `index` the ACTIVE one.
    ///
    /// Re-activating a step that was acted on in an earlier pass clears its
    /// acted fields; the earlier outcome survives in the action log.
    pub fn activate_step(&mut self, index: usize, at: DateTime<Utc>) -> ConsoleResult<()> {
        if self.active_step_count() > 0 {
            return Err(ConsoleError::conflict(
                "another step is already ACTIVE on this instance",
            ));
        }
        let step = self.steps.get_mut(index).ok_or_else(|| {
            ConsoleError::validation(format!("step index {} out of range", index))
        })?;
        step.status = StepStatus::Active;
        step.acted_by = None;
        step.acted_at = None;
        step.action = None;
        step.comment = None;
        step.activated_at = Some(at);
        self.current_step_id = Some(step.step.id.clone());
        self.status = InstanceStatus::InProgress;
        self.updated_at = at;
        Ok(())
    }

    /// Move to a terminal status; no step remains ACTIVE afterwards
    pub fn finish(&mut self, status: InstanceStatus, at: DateTime<Utc>) -> ConsoleResult<()> {
        if !status.is_terminal() {
            return Err(ConsoleError::validation(format!(
                "{} is not a terminal instance status",
                status
            )));
        }
        if self.active_step_count() > 0 {
            return Err(ConsoleError::conflict(
                "cannot finish an instance with an ACTIVE step",
            ));
        }
        self.status = status;
        self.current_step_id = None;
        self.completed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }
}
