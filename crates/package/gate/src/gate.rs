//! Package gate service: stage checks, actor checks and the project CAS

use crate::stage::{self, effective_stage, PackageAction, PackageStage};
use chrono::Utc;
use console_storage::ConsoleStorage;
use console_types::{
    ConsoleError, ConsoleResult, PackageStatus, Project, ProjectId, SentBackTarget, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tunables for the package gate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Minimum length of a trimmed send-back reason, in characters
    pub min_reason_length: usize,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            min_reason_length: 10,
        }
    }
}

/// Package status as seen by one actor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageView {
    pub project_id: ProjectId,
    pub status: PackageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_back_to: Option<SentBackTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_back_reason: Option<String>,
    /// `None` once the package is ACTIVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_stage: Option<PackageStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<PackageAction>,
    pub can_act: bool,
    pub can_edit: bool,
    pub version: u64,
}

/// Whether `actor` may edit package-gated project fields right now.
///
/// ACTIVE projects are editable by their owner and delivery manager;
/// otherwise only the actors of the current effective stage may edit.
/// A SENT_BACK package is frozen until it is resubmitted.
pub fn can_edit_package_fields(actor: &User, project: &Project) -> bool {
    if actor.is_super_admin() {
        return true;
    }
    if project.package.is_sent_back() {
        return false;
    }
    match effective_stage(&project.package) {
        None => project.is_owner(&actor.id) || project.is_delivery_manager(&actor.id),
        Some(stage) => stage.admits(actor, project),
    }
}

/// Drives the package flow against stored projects
#[derive(Clone)]
pub struct PackageGate {
    storage: Arc<dyn ConsoleStorage>,
    policy: GatePolicy,
}

impl PackageGate {
    pub fn new(storage: Arc<dyn ConsoleStorage>, policy: GatePolicy) -> Self {
        Self { storage, policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    async fn load(&self, project_id: &ProjectId) -> ConsoleResult<Project> {
        self.storage
            .get_project(project_id)
            .await?
            .ok_or_else(|| ConsoleError::not_found(format!("project {} not found", project_id)))
    }

    /// PM stage → PJM_REVIEW
    pub async fn submit(&self, actor: &User, project_id: &ProjectId) -> ConsoleResult<Project> {
        self.forward(actor, project_id, PackageAction::Submit).await
    }

    /// PJM stage → PM_ACTIVATE
    pub async fn accept(&self, actor: &User, project_id: &ProjectId) -> ConsoleResult<Project> {
        self.forward(actor, project_id, PackageAction::Accept).await
    }

    /// PM_FINAL stage → ACTIVE
    pub async fn activate(&self, actor: &User, project_id: &ProjectId) -> ConsoleResult<Project> {
        self.forward(actor, project_id, PackageAction::Activate).await
    }

    async fn forward(
        &self,
        actor: &User,
        project_id: &ProjectId,
        action: PackageAction,
    ) -> ConsoleResult<Project> {
        let project = self.load(project_id).await?;
        let from = project.package.status();

        let mut next = project.clone();
        stage::advance(&mut next.package, action)?;
        ensure_actor(actor, &project, action.stage())?;

        let stored = self.commit(next, project.version).await?;
        tracing::info!(
            project_id = %project_id,
            actor = %actor.id,
            action = %action,
            from = %from,
            to = %stored.package.status(),
            "Package advanced"
        );
        Ok(stored)
    }

    /// Return the package to `target` with a reason
    pub async fn send_back(
        &self,
        actor: &User,
        project_id: &ProjectId,
        target: SentBackTarget,
        reason: &str,
    ) -> ConsoleResult<Project> {
        let reason = reason.trim();
        if reason.chars().count() < self.policy.min_reason_length {
            return Err(ConsoleError::validation(format!(
                "send-back reason must be at least {} characters",
                self.policy.min_reason_length
            )));
        }

        let project = self.load(project_id).await?;
        let from = project.package.status();
        let current = effective_stage(&project.package).ok_or_else(|| {
            ConsoleError::conflict("package is ACTIVE; the package flow has ended")
        })?;

        let mut next = project.clone();
        stage::send_back(&mut next.package, target, reason)?;
        ensure_actor(actor, &project, current)?;

        let stored = self.commit(next, project.version).await?;
        tracing::info!(
            project_id = %project_id,
            actor = %actor.id,
            from = %from,
            target = %target,
            "Package sent back"
        );
        Ok(stored)
    }

    /// Current package state and what `actor` may do with it
    pub async fn view(&self, actor: &User, project_id: &ProjectId) -> ConsoleResult<PackageView> {
        let project = self.load(project_id).await?;
        let stage = effective_stage(&project.package);
        Ok(PackageView {
            project_id: project.id.clone(),
            status: project.package.status(),
            sent_back_to: project.package.package_sent_back_to,
            sent_back_reason: project.package.package_sent_back_reason.clone(),
            effective_stage: stage,
            next_action: stage.map(PackageStage::forward_action),
            can_act: stage.is_some_and(|s| s.admits(actor, &project)),
            can_edit: can_edit_package_fields(actor, &project),
            version: project.version,
        })
    }

    async fn commit(&self, mut project: Project, expected_version: u64) -> ConsoleResult<Project> {
        project.updated_at = Utc::now();
        Ok(self.storage.update_project(project, expected_version).await?)
    }
}

fn ensure_actor(actor: &User, project: &Project, stage: PackageStage) -> ConsoleResult<()> {
    if stage.admits(actor, project) {
        return Ok(());
    }
    let requirement = match stage {
        PackageStage::Pm | PackageStage::PmFinal => "the project's owning PM",
        PackageStage::Pjm => {
            "the project's delivery manager or a PJM/VENDOR user of a linked vendor company"
        }
    };
    Err(ConsoleError::unauthorized(format!(
        "{} cannot act at package stage {}; requires {}",
        actor.id, stage, requirement
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_storage::{InMemoryConsoleStorage, ProjectRepository};
    use console_types::{CompanyId, Role, UserId};

    fn owner() -> User {
        User::new("pm-1", "Pat", Role::Pm)
    }

    fn manager() -> User {
        User::new("pjm-1", "Jo", Role::Pjm)
    }

    async fn make_gate() -> (PackageGate, ProjectId) {
        let storage = Arc::new(InMemoryConsoleStorage::new());
        let project = storage
            .insert_project(
                Project::new("p-1", "Portal", UserId::new("pm-1"))
                    .with_delivery_manager(UserId::new("pjm-1"))
                    .with_vendor_company(CompanyId::new("acme")),
            )
            .await
            .unwrap();
        (
            PackageGate::new(storage, GatePolicy::default()),
            project.id,
        )
    }

    #[tokio::test]
    async fn test_send_back_round_trip() {
        let (gate, id) = make_gate().await;

        let p = gate.submit(&owner(), &id).await.unwrap();
        assert_eq!(p.package.status(), PackageStatus::PjmReview);

        let p = gate
            .send_back(&manager(), &id, SentBackTarget::Pm, "scope unclear")
            .await
            .unwrap();
        assert_eq!(p.package.status(), PackageStatus::SentBack);
        assert_eq!(p.package.package_sent_back_to, Some(SentBackTarget::Pm));
        assert_eq!(
            p.package.package_sent_back_reason.as_deref(),
            Some("scope unclear")
        );

        let p = gate.submit(&owner(), &id).await.unwrap();
        assert_eq!(p.package.status(), PackageStatus::PjmReview);
        assert!(p.package.package_sent_back_to.is_none());
        assert_eq!(p.version, 4);
    }

    #[tokio::test]
    async fn test_full_flow_to_active() {
        let (gate, id) = make_gate().await;
        gate.submit(&owner(), &id).await.unwrap();
        let vendor = User::new("v-1", "Vic", Role::Vendor).with_company(CompanyId::new("acme"));
        gate.accept(&vendor, &id).await.unwrap();
        let p = gate.activate(&owner(), &id).await.unwrap();
        assert_eq!(p.package.status(), PackageStatus::Active);

        let err = gate.submit(&owner(), &id).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_stage_is_conflict_before_actor_check() {
        let (gate, id) = make_gate().await;
        let err = gate.accept(&owner(), &id).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_actor_is_refused_without_change() {
        let (gate, id) = make_gate().await;
        let err = gate.submit(&manager(), &id).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Authorization(_)));

        let view = gate.view(&owner(), &id).await.unwrap();
        assert_eq!(view.status, PackageStatus::PmDraft);
        assert_eq!(view.version, 1);
    }

    #[tokio::test]
    async fn test_short_reason_is_validation_error() {
        let (gate, id) = make_gate().await;
        gate.submit(&owner(), &id).await.unwrap();
        let err = gate
            .send_back(&manager(), &id, SentBackTarget::Pm, "   no   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let (gate, _) = make_gate().await;
        let err = gate
            .submit(&owner(), &ProjectId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_view_reports_actor_capabilities() {
        let (gate, id) = make_gate().await;
        let view = gate.view(&owner(), &id).await.unwrap();
        assert_eq!(view.effective_stage, Some(PackageStage::Pm));
        assert_eq!(view.next_action, Some(PackageAction::Submit));
        assert!(view.can_act);
        assert!(view.can_edit);

        let view = gate.view(&manager(), &id).await.unwrap();
        assert!(!view.can_act);
        assert!(!view.can_edit);
    }

    #[tokio::test]
    async fn test_active_project_editable_by_owner_and_manager() {
        let (gate, id) = make_gate().await;
        gate.submit(&owner(), &id).await.unwrap();
        gate.accept(&manager(), &id).await.unwrap();
        gate.activate(&owner(), &id).await.unwrap();

        assert!(gate.view(&owner(), &id).await.unwrap().can_edit);
        assert!(gate.view(&manager(), &id).await.unwrap().can_edit);
        let dev = User::new("dev-1", "Dana", Role::Developer);
        let view = gate.view(&dev, &id).await.unwrap();
        assert!(!view.can_edit);
        assert!(!view.can_act);
        assert!(view.next_action.is_none());
    }

    #[tokio::test]
    async fn test_sent_back_package_not_editable() {
        let (gate, id) = make_gate().await;
        gate.submit(&owner(), &id).await.unwrap();
        gate.send_back(&manager(), &id, SentBackTarget::Pm, "scope unclear")
            .await
            .unwrap();

        let view = gate.view(&owner(), &id).await.unwrap();
        assert_eq!(view.status, PackageStatus::SentBack);
        assert!(view.can_act);
        assert!(!view.can_edit);
        assert!(!gate.view(&manager(), &id).await.unwrap().can_edit);

        let root = User::new("root", "Root", Role::SuperAdmin);
        assert!(gate.view(&root, &id).await.unwrap().can_edit);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submits_accept_exactly_one() {
        let (gate, id) = make_gate().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { gate.submit(&owner(), &id).await }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => assert!(matches!(err, ConsoleError::Conflict(_))),
            }
        }
        assert_eq!(accepted, 1);

        let view = gate.view(&owner(), &id).await.unwrap();
        assert_eq!(view.status, PackageStatus::PjmReview);
        assert_eq!(view.version, 2);
    }
}
