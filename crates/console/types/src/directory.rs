//! Users and tasks: the parts of the directory approver resolution reads

use crate::{CompanyId, ProjectId, Role, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── User ─────────────────────────────────────────────────────────────

/// A console user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// Vendor company the user belongs to (vendor-side staff only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            role,
            company_id: None,
        }
    }

    pub fn with_company(mut self, company: CompanyId) -> Self {
        self.company_id = Some(company);
        self
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.is_super_admin()
    }
}

// ── Task ─────────────────────────────────────────────────────────────

/// One entry of a task's assignment plan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub user_id: UserId,
    #[serde(default)]
    pub planned_hours: f64,
}

/// A work item. Tasks are the entities gated by approval workflows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignment_plan: Vec<Assignment>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(id),
            project_id,
            title: title.into(),
            assignee_user_id: None,
            assignment_plan: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_assignee(mut self, user: UserId) -> Self {
        self.assignee_user_id = Some(user);
        self
    }

    pub fn with_planned_assignment(mut self, user: UserId, planned_hours: f64) -> Self {
        self.assignment_plan.push(Assignment {
            user_id: user,
            planned_hours,
        });
        self
    }

    /// The developer currently responsible for the task: the task-level
    /// assignee, else the first entry of the assignment plan.
    pub fn assigned_developer(&self) -> Option<&UserId> {
        self.assignee_user_id
            .as_ref()
            .or_else(|| self.assignment_plan.first().map(|a| &a.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_developer_prefers_task_assignee() {
        let task = Task::new("t-1", ProjectId::new("p-1"), "Build login")
            .with_planned_assignment(UserId::new("planned"), 8.0)
            .with_assignee(UserId::new("assignee"));
        assert_eq!(task.assigned_developer(), Some(&UserId::new("assignee")));
    }

    #[test]
    fn test_assigned_developer_falls_back_to_plan() {
        let task = Task::new("t-1", ProjectId::new("p-1"), "Build login")
            .with_planned_assignment(UserId::new("first"), 8.0)
            .with_planned_assignment(UserId::new("second"), 4.0);
        assert_eq!(task.assigned_developer(), Some(&UserId::new("first")));

        let bare = Task::new("t-2", ProjectId::new("p-1"), "Unassigned");
        assert!(bare.assigned_developer().is_none());
    }

    #[test]
    fn test_user_deserializes_from_camel_case() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "name": "Vera",
            "role": "PJM",
            "companyId": "acme"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Pjm);
        assert_eq!(user.company_id, Some(CompanyId::new("acme")));
    }
}
