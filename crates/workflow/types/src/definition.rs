//! Workflow definitions: reusable, ordered approval chains
//!
//! A WorkflowDefinition is an ordered list of steps. Each step carries an
//! [`ApproverRule`], which is a sum type: a step is a role step or a
//! dynamic step and nothing else.
//!
//! Definitions arrive from the outside world as [`DefinitionDraft`]s whose
//! approver fields are loose strings; [`DefinitionDraft::build`] is the one
//! place where they are checked and turned into a valid definition.

use chrono::{DateTime, Utc};
use console_types::{ActionKind, ConsoleError, ConsoleResult, EntityType, Role, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a workflow definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowDefinitionId(pub String);

impl WorkflowDefinitionId {
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

impl std::fmt::Display for WorkflowDefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a step within a definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn generate() -> Self {
        Self(format!("step-{}", uuid::Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Approver rules ───────────────────────────────────────────────────

/// Named rules that derive approvers from the task's relationships
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynamicRule {
    /// Engineering-capable users on the project's delivery side
    EngineeringTeam,
    /// The project's vendor-side delivery manager
    TaskProjectManager,
    /// The project's owning Product Manager
    TaskPm,
    /// The task's assignee, else the first planned assignee
    TaskAssignedDeveloper,
}

impl DynamicRule {
    pub fn name(self) -> &'static str {
        match self {
            Self::EngineeringTeam => "ENGINEERING_TEAM",
            Self::TaskProjectManager => "TASK_PROJECT_MANAGER",
            Self::TaskPm => "TASK_PM",
            Self::TaskAssignedDeveloper => "TASK_ASSIGNED_DEVELOPER",
        }
    }
}

impl std::fmt::Display for DynamicRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DynamicRule {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENGINEERING_TEAM" => Ok(Self::EngineeringTeam),
            "TASK_PROJECT_MANAGER" => Ok(Self::TaskProjectManager),
            "TASK_PM" => Ok(Self::TaskPm),
            "TASK_ASSIGNED_DEVELOPER" => Ok(Self::TaskAssignedDeveloper),
            other => Err(ConsoleError::validation(format!(
                "unknown dynamic approver rule '{}'",
                other
            ))),
        }
    }
}

/// Who may act at a step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "approverType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverRule {
    /// Anyone holding this role, regardless of relationship to the entity
    Role {
        #[serde(rename = "approverRole")]
        role: Role,
    },
    /// Users derived from the entity graph by a named rule
    Dynamic {
        #[serde(rename = "dynamicRule")]
        rule: DynamicRule,
    },
}

impl ApproverRule {
    pub fn role(role: Role) -> Self {
        Self::Role { role }
    }

    pub fn dynamic(rule: DynamicRule) -> Self {
        Self::Dynamic { rule }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Role { .. } => "ROLE",
            Self::Dynamic { .. } => "DYNAMIC",
        }
    }
}

// ── Step Definition ──────────────────────────────────────────────────

/// One step of an approval chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepDefinition {
    pub id: StepId,
    pub name: String,
    /// Traversal position; unique within a definition
    pub order: u32,
    #[serde(flatten)]
    pub approver: ApproverRule,
    pub requires_comment_on_reject: bool,
    pub requires_comment_on_send_back: bool,
    /// Actions permitted at this step
    pub allowed_actions: BTreeSet<ActionKind>,
}

impl WorkflowStepDefinition {
    /// Create a step permitting every action, with no comment requirements
    pub fn new(name: impl Into<String>, order: u32, approver: ApproverRule) -> Self {
        Self {
            id: StepId::generate(),
            name: name.into(),
            order,
            approver,
            requires_comment_on_reject: false,
            requires_comment_on_send_back: false,
            allowed_actions: ActionKind::ALL.into_iter().collect(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = StepId::new(id);
        self
    }

    pub fn requiring_comment_on_reject(mut self) -> Self {
        self.requires_comment_on_reject = true;
        self
    }

    pub fn requiring_comment_on_send_back(mut self) -> Self {
        self.requires_comment_on_send_back = true;
        self
    }

    pub fn with_allowed_actions(mut self, actions: impl IntoIterator<Item = ActionKind>) -> Self {
        self.allowed_actions = actions.into_iter().collect();
        self
    }

    pub fn permits(&self, action: ActionKind) -> bool {
        self.allowed_actions.contains(&action)
    }

    /// Whether `action` must carry a non-blank comment at this step
    pub fn requires_comment_for(&self, action: ActionKind) -> bool {
        match action {
            ActionKind::Reject => self.requires_comment_on_reject,
            ActionKind::SendBack => self.requires_comment_on_send_back,
            ActionKind::Approve | ActionKind::RequestChange => false,
        }
    }
}

// ── Workflow Definition ──────────────────────────────────────────────

/// A reusable approval chain template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: WorkflowDefinitionId,
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Inactive definitions cannot start new instances
    pub active: bool,
    /// Bumped on every accepted update
    pub version: u32,
    /// Steps sorted by `order`
    pub steps: Vec<WorkflowStepDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Create an empty, active definition
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowDefinitionId::generate(),
            entity_type,
            name: name.into(),
            description: String::new(),
            active: true,
            version: 1,
            steps: Vec::new(),
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: UserId) -> Self {
        self.created_by = Some(author);
        self
    }

    /// Add a step, keeping steps sorted by order
    pub fn add_step(&mut self, step: WorkflowStepDefinition) -> ConsoleResult<()> {
        if self.steps.iter().any(|s| s.order == step.order) {
            return Err(ConsoleError::validation(format!(
                "duplicate step order {}",
                step.order
            )));
        }
        if self.steps.iter().any(|s| s.id == step.id) {
            return Err(ConsoleError::validation(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
        self.steps.push(step);
        self.steps.sort_by_key(|s| s.order);
        Ok(())
    }

    /// Builder form of [`add_step`](Self::add_step)
    pub fn with_step(mut self, step: WorkflowStepDefinition) -> ConsoleResult<Self> {
        self.add_step(step)?;
        Ok(self)
    }

    pub fn first_step(&self) -> Option<&WorkflowStepDefinition> {
        self.steps.first()
    }

    pub fn get_step(&self, id: &StepId) -> Option<&WorkflowStepDefinition> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validate the definition for structural correctness
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::validation(
                "workflow definition name must not be empty",
            ));
        }

        if self.steps.is_empty() {
            return Err(ConsoleError::validation(
                "workflow definition must have at least one step",
            ));
        }

        let mut orders = HashSet::new();
        let mut ids = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(ConsoleError::validation(format!(
                    "step with order {} must have a name",
                    step.order
                )));
            }
            if !orders.insert(step.order) {
                return Err(ConsoleError::validation(format!(
                    "duplicate step order {}",
                    step.order
                )));
            }
            if !ids.insert(&step.id) {
                return Err(ConsoleError::validation(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
            if step.allowed_actions.is_empty() {
                return Err(ConsoleError::validation(format!(
                    "step '{}' must permit at least one action",
                    step.name
                )));
            }
        }

        if self.steps.windows(2).any(|w| w[0].order >= w[1].order) {
            return Err(ConsoleError::validation(
                "steps must be sorted by ascending order",
            ));
        }

        Ok(())
    }

    /// Produce the next version of this definition with `patch` applied.
    ///
    /// The receiver is left untouched; instances already started keep
    /// their own step snapshot regardless.
    pub fn apply_patch(&self, patch: DefinitionPatch) -> ConsoleResult<WorkflowDefinition> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(active) = patch.active {
            next.active = active;
        }
        if let Some(drafts) = patch.steps {
            next.steps = build_steps(drafts)?;
        }
        next.validate()?;
        next.version = self.version + 1;
        next.updated_at = Utc::now();
        Ok(next)
    }
}

// ── Drafts (write-time shape) ────────────────────────────────────────

/// A step as submitted by an administrator.
///
/// `approverRole` and `dynamicRule` are mutually exclusive and must match
/// `approverType`; [`StepDraft::into_step`] enforces that.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StepId>,
    pub name: String,
    pub order: u32,
    pub approver_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_rule: Option<String>,
    #[serde(default)]
    pub requires_comment_on_reject: bool,
    #[serde(default)]
    pub requires_comment_on_send_back: bool,
    /// Defaults to every action when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_actions: Option<Vec<String>>,
}

impl StepDraft {
    pub fn into_step(self) -> ConsoleResult<WorkflowStepDefinition> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::validation(format!(
                "step with order {} must have a name",
                self.order
            )));
        }

        let approver = match self.approver_type.trim().to_ascii_uppercase().as_str() {
            "ROLE" => match (self.approver_role, self.dynamic_rule) {
                (Some(role), None) => ApproverRule::role(
                    role.parse::<Role>().map_err(ConsoleError::Validation)?,
                ),
                (None, _) => {
                    return Err(ConsoleError::validation(format!(
                        "ROLE step '{}' must carry an approver role",
                        self.name
                    )))
                }
                (Some(_), Some(_)) => {
                    return Err(ConsoleError::validation(format!(
                        "ROLE step '{}' must not carry a dynamic rule",
                        self.name
                    )))
                }
            },
            "DYNAMIC" => match (self.dynamic_rule, self.approver_role) {
                (Some(rule), None) => ApproverRule::dynamic(rule.parse::<DynamicRule>()?),
                (None, _) => {
                    return Err(ConsoleError::validation(format!(
                        "DYNAMIC step '{}' must carry a dynamic rule",
                        self.name
                    )))
                }
                (Some(_), Some(_)) => {
                    return Err(ConsoleError::validation(format!(
                        "DYNAMIC step '{}' must not carry an approver role",
                        self.name
                    )))
                }
            },
            other => {
                return Err(ConsoleError::validation(format!(
                    "unknown approver type '{}' on step '{}'; expected ROLE or DYNAMIC",
                    other, self.name
                )))
            }
        };

        let allowed_actions = match self.allowed_actions {
            Some(names) => names
                .iter()
                .map(|n| n.parse::<ActionKind>())
                .collect::<ConsoleResult<BTreeSet<_>>>()?,
            None => ActionKind::ALL.into_iter().collect(),
        };

        Ok(WorkflowStepDefinition {
            id: self.id.unwrap_or_else(StepId::generate),
            name: self.name,
            order: self.order,
            approver,
            requires_comment_on_reject: self.requires_comment_on_reject,
            requires_comment_on_send_back: self.requires_comment_on_send_back,
            allowed_actions,
        })
    }
}

/// A definition as submitted for creation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionDraft {
    #[serde(default)]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub steps: Vec<StepDraft>,
}

impl DefinitionDraft {
    /// Validate the draft and produce a fresh definition
    pub fn build(self, author: Option<UserId>) -> ConsoleResult<WorkflowDefinition> {
        let mut definition = WorkflowDefinition::new(self.name, self.entity_type)
            .with_description(self.description);
        definition.active = self.active;
        definition.created_by = author;
        definition.steps = build_steps(self.steps)?;
        definition.validate()?;
        Ok(definition)
    }
}

/// A partial update; omitted fields are left as they are
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepDraft>>,
}

fn build_steps(drafts: Vec<StepDraft>) -> ConsoleResult<Vec<WorkflowStepDefinition>> {
    let mut steps = drafts
        .into_iter()
        .map(StepDraft::into_step)
        .collect::<ConsoleResult<Vec<_>>>()?;
    steps.sort_by_key(|s| s.order);
    Ok(steps)
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_draft(name: &str, order: u32, role: &str) -> StepDraft {
        StepDraft {
            name: name.to_string(),
            order,
            approver_type: "ROLE".to_string(),
            approver_role: Some(role.to_string()),
            ..Default::default()
        }
    }

    fn dynamic_draft(name: &str, order: u32, rule: &str) -> StepDraft {
        StepDraft {
            name: name.to_string(),
            order,
            approver_type: "DYNAMIC".to_string(),
            dynamic_rule: Some(rule.to_string()),
            ..Default::default()
        }
    }

    fn make_review_definition() -> WorkflowDefinition {
        WorkflowDefinition::new("Task Review", EntityType::Task)
            .with_step(WorkflowStepDefinition::new(
                "PM_REVIEW",
                1,
                ApproverRule::role(Role::Pm),
            ))
            .unwrap()
            .with_step(
                WorkflowStepDefinition::new(
                    "VENDOR_REVIEW",
                    2,
                    ApproverRule::dynamic(DynamicRule::TaskProjectManager),
                )
                .requiring_comment_on_reject(),
            )
            .unwrap()
    }

    #[test]
    fn test_create_definition() {
        let def = make_review_definition();
        assert_eq!(def.step_count(), 2);
        assert_eq!(def.first_step().unwrap().name, "PM_REVIEW");
        assert!(def.active);
        assert_eq!(def.version, 1);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_steps_are_kept_in_order() {
        let def = WorkflowDefinition::new("Out of order", EntityType::Task)
            .with_step(WorkflowStepDefinition::new("second", 20, ApproverRule::role(Role::Pm)))
            .unwrap()
            .with_step(WorkflowStepDefinition::new("first", 10, ApproverRule::role(Role::Pm)))
            .unwrap();
        let names: Vec<_> = def.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut def = WorkflowDefinition::new("Dup", EntityType::Task);
        def.add_step(WorkflowStepDefinition::new("a", 1, ApproverRule::role(Role::Pm)))
            .unwrap();
        let result =
            def.add_step(WorkflowStepDefinition::new("b", 1, ApproverRule::role(Role::Pm)));
        assert!(matches!(result, Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn test_validate_requires_a_step() {
        let def = WorkflowDefinition::new("Empty", EntityType::Task);
        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("at least one step"));
    }

    #[test]
    fn test_draft_builds_tagged_approvers() {
        let def = DefinitionDraft {
            name: "Task Review".to_string(),
            steps: vec![
                role_draft("PM_REVIEW", 1, "PM"),
                dynamic_draft("VENDOR_REVIEW", 2, "TASK_PROJECT_MANAGER"),
            ],
            active: true,
            ..Default::default()
        }
        .build(Some(UserId::new("admin")))
        .unwrap();

        assert_eq!(def.steps[0].approver, ApproverRule::role(Role::Pm));
        assert_eq!(
            def.steps[1].approver,
            ApproverRule::dynamic(DynamicRule::TaskProjectManager)
        );
        assert_eq!(def.created_by, Some(UserId::new("admin")));
    }

    #[test]
    fn test_draft_rejects_role_step_without_role() {
        let mut draft = role_draft("PM_REVIEW", 1, "PM");
        draft.approver_role = None;
        let err = draft.into_step().unwrap_err();
        assert!(err.to_string().contains("must carry an approver role"));
    }

    #[test]
    fn test_draft_rejects_both_role_and_rule() {
        let mut draft = role_draft("PM_REVIEW", 1, "PM");
        draft.dynamic_rule = Some("TASK_PM".to_string());
        assert!(matches!(draft.into_step(), Err(ConsoleError::Validation(_))));

        let mut draft = dynamic_draft("DEV", 1, "TASK_PM");
        draft.approver_role = Some("PM".to_string());
        assert!(matches!(draft.into_step(), Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn test_draft_rejects_unknown_names() {
        assert!(dynamic_draft("x", 1, "TASK_OWNER_COUSIN").into_step().is_err());
        assert!(role_draft("x", 1, "JANITOR").into_step().is_err());

        let mut draft = role_draft("x", 1, "PM");
        draft.approver_type = "COMMITTEE".to_string();
        assert!(draft.into_step().is_err());
    }

    #[test]
    fn test_draft_rejects_blank_step_name() {
        let draft = role_draft("   ", 1, "PM");
        assert!(matches!(draft.into_step(), Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn test_draft_restricts_allowed_actions() {
        let mut draft = role_draft("PM_REVIEW", 1, "PM");
        draft.allowed_actions = Some(vec!["APPROVE".to_string(), "REJECT".to_string()]);
        let step = draft.into_step().unwrap();
        assert!(step.permits(ActionKind::Approve));
        assert!(!step.permits(ActionKind::SendBack));
    }

    #[test]
    fn test_apply_patch_bumps_version_and_keeps_original() {
        let def = make_review_definition();
        let next = def
            .apply_patch(DefinitionPatch {
                name: Some("Task Review v2".to_string()),
                steps: Some(vec![role_draft("ONLY", 1, "ADMIN")]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(next.version, 2);
        assert_eq!(next.step_count(), 1);
        assert_eq!(next.id, def.id);
        assert_eq!(def.step_count(), 2);
    }

    #[test]
    fn test_apply_patch_rejects_empty_steps() {
        let def = make_review_definition();
        let result = def.apply_patch(DefinitionPatch {
            steps: Some(vec![]),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConsoleError::Validation(_))));
    }

    #[test]
    fn test_step_serializes_as_tagged_union() {
        let step = WorkflowStepDefinition::new(
            "VENDOR_REVIEW",
            2,
            ApproverRule::dynamic(DynamicRule::TaskProjectManager),
        )
        .with_id("s-2");
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["approverType"], "DYNAMIC");
        assert_eq!(json["dynamicRule"], "TASK_PROJECT_MANAGER");
        assert!(json.get("approverRole").is_none());

        let back: WorkflowStepDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_comment_requirements() {
        let step = WorkflowStepDefinition::new("s", 1, ApproverRule::role(Role::Pm))
            .requiring_comment_on_reject();
        assert!(step.requires_comment_for(ActionKind::Reject));
        assert!(!step.requires_comment_for(ActionKind::SendBack));
        assert!(!step.requires_comment_for(ActionKind::Approve));
    }
}
