//! Approver resolution: who may act at a step
//!
//! Resolution is a pure function of the step's approver rule and a
//! borrowed view of the entity graph. It has no side effects and can be
//! called for authorization previews as freely as for real actions.

use console_types::{ConsoleError, ConsoleResult, Project, Role, Task, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use workflow_types::{ApproverRule, DynamicRule, WorkflowStepDefinition};

/// The slice of the entity graph a step is resolved against
#[derive(Clone, Copy, Debug)]
pub struct ResolutionContext<'a> {
    pub task: &'a Task,
    pub project: &'a Project,
    /// Directory users; only consulted by `ENGINEERING_TEAM`
    pub users: &'a [User],
}

/// The identities allowed to act at a step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverSet {
    /// Anyone holding the role
    AnyWithRole { role: Role },
    /// Exactly these users
    Users { users: BTreeSet<UserId> },
}

impl ApproverSet {
    pub fn admits(&self, actor: &User) -> bool {
        match self {
            Self::AnyWithRole { role } => actor.role == *role,
            Self::Users { users } => users.contains(&actor.id),
        }
    }
}

/// Users a dynamic rule derives from the task and its project.
///
/// May be empty; [`resolve`] turns that into a resolution error.
pub fn resolve_dynamic(rule: DynamicRule, ctx: ResolutionContext<'_>) -> BTreeSet<UserId> {
    match rule {
        DynamicRule::EngineeringTeam => ctx
            .users
            .iter()
            .filter(|u| u.role.is_engineering())
            .filter(|u| {
                ctx.project.is_member(&u.id)
                    || u
                        .company_id
                        .as_ref()
                        .is_some_and(|c| ctx.project.has_vendor_company(c))
            })
            .map(|u| u.id.clone())
            .collect(),
        DynamicRule::TaskProjectManager => {
            ctx.project.delivery_manager_user_id.iter().cloned().collect()
        }
        DynamicRule::TaskPm => std::iter::once(ctx.project.owner_id.clone()).collect(),
        DynamicRule::TaskAssignedDeveloper => {
            ctx.task.assigned_developer().into_iter().cloned().collect()
        }
    }
}

/// Resolve a step's approver rule to the set of identities allowed to act
pub fn resolve(rule: &ApproverRule, ctx: ResolutionContext<'_>) -> ConsoleResult<ApproverSet> {
    match rule {
        ApproverRule::Role { role } => Ok(ApproverSet::AnyWithRole { role: *role }),
        ApproverRule::Dynamic { rule } => {
            let users = resolve_dynamic(*rule, ctx);
            if users.is_empty() {
                return Err(ConsoleError::resolution(format!(
                    "{} resolved to no approvers for task {} in project {}",
                    rule, ctx.task.id, ctx.project.id
                )));
            }
            Ok(ApproverSet::Users { users })
        }
    }
}

/// Check that `actor` may act at `step`.
///
/// SUPER_ADMIN may act at any step, including one whose dynamic rule
/// currently resolves to nobody.
pub fn authorize(
    actor: &User,
    step: &WorkflowStepDefinition,
    ctx: ResolutionContext<'_>,
) -> ConsoleResult<()> {
    if actor.is_super_admin() {
        return Ok(());
    }

    let approvers = resolve(&step.approver, ctx)?;
    if approvers.admits(actor) {
        return Ok(());
    }

    Err(match &step.approver {
        ApproverRule::Role { role } => ConsoleError::unauthorized(format!(
            "step '{}' requires role {}; {} has role {}",
            step.name, role, actor.id, actor.role
        )),
        ApproverRule::Dynamic { rule } => ConsoleError::unauthorized(format!(
            "{} is not among the {} approvers for step '{}'",
            actor.id, rule, step.name
        )),
    })
}
