//! The fixed three-stage package handoff
//!
//! ```text
//! PM (PM_DRAFT) ──submit──▶ PJM (PJM_REVIEW) ──accept──▶ PM_FINAL (PM_ACTIVATE) ──activate──▶ ACTIVE
//!        ▲                        ▲                              │
//!        └──────── send-back ─────┴──────────────────────────────┘
//! ```
//!
//! The machine is explicit so a skipped or repeated stage is reported as a
//! stage violation instead of happening silently.

use console_types::{
    ConsoleError, ConsoleResult, PackageState, PackageStatus, Project, Role, SentBackTarget, User,
};
use serde::{Deserialize, Serialize};

// ── Stages and actions ───────────────────────────────────────────────

/// A package stage; each has one set of actors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStage {
    Pm,
    Pjm,
    PmFinal,
}

impl PackageStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pm => "PM",
            Self::Pjm => "PJM",
            Self::PmFinal => "PM_FINAL",
        }
    }

    /// The status a project sits in while this stage is active
    pub fn status(self) -> PackageStatus {
        match self {
            Self::Pm => PackageStatus::PmDraft,
            Self::Pjm => PackageStatus::PjmReview,
            Self::PmFinal => PackageStatus::PmActivate,
        }
    }

    /// The forward action that completes this stage
    pub fn forward_action(self) -> PackageAction {
        match self {
            Self::Pm => PackageAction::Submit,
            Self::Pjm => PackageAction::Accept,
            Self::PmFinal => PackageAction::Activate,
        }
    }

    /// Where the forward action leads
    pub fn next_status(self) -> PackageStatus {
        match self {
            Self::Pm => PackageStatus::PjmReview,
            Self::Pjm => PackageStatus::PmActivate,
            Self::PmFinal => PackageStatus::Active,
        }
    }

    /// Roles permitted to act here, before the relationship check
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::Pm | Self::PmFinal => &[Role::Pm],
            Self::Pjm => &[Role::Pjm, Role::Vendor],
        }
    }

    /// Whether `actor` may act at this stage of `project`
    pub fn admits(self, actor: &User, project: &Project) -> bool {
        if actor.is_super_admin() {
            return true;
        }
        if !self.roles().contains(&actor.role) {
            return false;
        }
        match self {
            Self::Pm | Self::PmFinal => project.is_owner(&actor.id),
            Self::Pjm => {
                project.is_delivery_manager(&actor.id)
                    || actor
                        .company_id
                        .as_ref()
                        .is_some_and(|c| project.has_vendor_company(c))
            }
        }
    }
}

impl std::fmt::Display for PackageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<SentBackTarget> for PackageStage {
    /// ENG belongs to the PJM stage
    fn from(target: SentBackTarget) -> Self {
        match target {
            SentBackTarget::Pm => Self::Pm,
            SentBackTarget::Pjm | SentBackTarget::Eng => Self::Pjm,
        }
    }
}

/// The forward actions of the package flow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageAction {
    Submit,
    Accept,
    Activate,
}

impl PackageAction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Accept => "accept",
            Self::Activate => "activate",
        }
    }

    /// The stage this action must be performed from
    pub fn stage(self) -> PackageStage {
        match self {
            Self::Submit => PackageStage::Pm,
            Self::Accept => PackageStage::Pjm,
            Self::Activate => PackageStage::PmFinal,
        }
    }
}

impl std::fmt::Display for PackageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Transitions ──────────────────────────────────────────────────────

/// The stage currently responsible for the package; `None` once ACTIVE.
///
/// While SENT_BACK the target decides. A SENT_BACK record without a target
/// falls back to the PM stage.
pub fn effective_stage(state: &PackageState) -> Option<PackageStage> {
    match state.status() {
        PackageStatus::PmDraft => Some(PackageStage::Pm),
        PackageStatus::PjmReview | PackageStatus::EngReview => Some(PackageStage::Pjm),
        PackageStatus::PmActivate => Some(PackageStage::PmFinal),
        PackageStatus::SentBack => Some(
            state
                .package_sent_back_to
                .map(PackageStage::from)
                .unwrap_or(PackageStage::Pm),
        ),
        PackageStatus::Active => None,
    }
}

fn stage_violation(action: PackageAction, state: &PackageState) -> ConsoleError {
    let current = match state.package_sent_back_to {
        Some(target) if state.is_sent_back() => format!("{} ({})", state.status(), target),
        _ => state.status().to_string(),
    };
    ConsoleError::conflict(format!(
        "cannot {} package: expected stage '{}', got '{}'",
        action,
        action.stage(),
        current
    ))
}

/// Perform a forward action. Leaving SENT_BACK clears target and reason.
pub fn advance(state: &mut PackageState, action: PackageAction) -> ConsoleResult<PackageStatus> {
    let expected = action.stage();
    if effective_stage(state) != Some(expected) {
        return Err(stage_violation(action, state));
    }
    let next = expected.next_status();
    state.advance_to(next);
    Ok(next)
}

/// Return the package to an earlier (or the current) stage
pub fn send_back(
    state: &mut PackageState,
    target: SentBackTarget,
    reason: impl Into<String>,
) -> ConsoleResult<()> {
    let current = effective_stage(state).ok_or_else(|| {
        ConsoleError::conflict("package is ACTIVE; the package flow has ended")
    })?;
    let target_stage = PackageStage::from(target);
    if target_stage > current {
        return Err(ConsoleError::conflict(format!(
            "cannot send package back to {} from stage {}",
            target, current
        )));
    }
    state.send_back(target, reason);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_types::{CompanyId, UserId};

    fn at(status: PackageStatus) -> PackageState {
        PackageState {
            package_status: status,
            ..Default::default()
        }
    }

    #[test]
    fn test_forward_flow() {
        let mut state = PackageState::default();
        assert_eq!(
            advance(&mut state, PackageAction::Submit).unwrap(),
            PackageStatus::PjmReview
        );
        assert_eq!(
            advance(&mut state, PackageAction::Accept).unwrap(),
            PackageStatus::PmActivate
        );
        assert_eq!(
            advance(&mut state, PackageAction::Activate).unwrap(),
            PackageStatus::Active
        );
        assert!(effective_stage(&state).is_none());
    }

    #[test]
    fn test_every_other_stage_action_pair_conflicts() {
        let statuses = [
            PackageStatus::PmDraft,
            PackageStatus::PjmReview,
            PackageStatus::PmActivate,
            PackageStatus::Active,
        ];
        let actions = [
            PackageAction::Submit,
            PackageAction::Accept,
            PackageAction::Activate,
        ];
        for status in statuses {
            for action in actions {
                let mut state = at(status);
                let result = advance(&mut state, action);
                if status == action.stage().status() {
                    assert!(result.is_ok(), "{} from {}", action, status);
                } else {
                    assert!(
                        matches!(result, Err(ConsoleError::Conflict(_))),
                        "{} from {}",
                        action,
                        status
                    );
                    assert_eq!(state.status(), status);
                }
            }
        }
    }

    #[test]
    fn test_skip_reports_expected_stage() {
        let mut state = PackageState::default();
        let err = advance(&mut state, PackageAction::Activate).unwrap_err();
        assert!(err
            .to_string()
            .contains("expected stage 'PM_FINAL', got 'PM_DRAFT'"));
    }

    #[test]
    fn test_eng_review_belongs_to_pjm_stage() {
        let mut state = at(PackageStatus::EngReview);
        assert_eq!(effective_stage(&state), Some(PackageStage::Pjm));
        advance(&mut state, PackageAction::Accept).unwrap();
        assert_eq!(state.status(), PackageStatus::PmActivate);
    }

    #[test]
    fn test_send_back_and_resubmit() {
        let mut state = at(PackageStatus::PjmReview);
        send_back(&mut state, SentBackTarget::Pm, "scope unclear").unwrap();
        assert_eq!(state.status(), PackageStatus::SentBack);
        assert_eq!(state.package_sent_back_to, Some(SentBackTarget::Pm));
        assert_eq!(effective_stage(&state), Some(PackageStage::Pm));

        let err = advance(&mut state, PackageAction::Accept).unwrap_err();
        assert!(matches!(err, ConsoleError::Conflict(_)));

        advance(&mut state, PackageAction::Submit).unwrap();
        assert_eq!(state.status(), PackageStatus::PjmReview);
        assert!(state.package_sent_back_to.is_none());
        assert!(state.package_sent_back_reason.is_none());
    }

    #[test]
    fn test_send_back_to_eng_resumes_at_pjm() {
        let mut state = at(PackageStatus::PmActivate);
        send_back(&mut state, SentBackTarget::Eng, "needs estimate").unwrap();
        assert_eq!(effective_stage(&state), Some(PackageStage::Pjm));
        advance(&mut state, PackageAction::Accept).unwrap();
        assert_eq!(state.status(), PackageStatus::PmActivate);
    }

    #[test]
    fn test_send_back_cannot_go_forward_or_leave_active() {
        let mut state = at(PackageStatus::PmDraft);
        let err = send_back(&mut state, SentBackTarget::Pjm, "too early").unwrap_err();
        assert!(matches!(err, ConsoleError::Conflict(_)));
        assert_eq!(state.status(), PackageStatus::PmDraft);

        let mut active = at(PackageStatus::Active);
        assert!(send_back(&mut active, SentBackTarget::Pm, "reopen").is_err());
    }

    #[test]
    fn test_stage_actors() {
        let project = Project::new("p-1", "Portal", UserId::new("pm-1"))
            .with_delivery_manager(UserId::new("pjm-1"))
            .with_vendor_company(CompanyId::new("acme"));

        let owner = User::new("pm-1", "Pat", Role::Pm);
        let other_pm = User::new("pm-2", "Sam", Role::Pm);
        let manager = User::new("pjm-1", "Jo", Role::Pjm);
        let vendor = User::new("v-1", "Vic", Role::Vendor).with_company(CompanyId::new("acme"));
        let stranger =
            User::new("v-2", "Vee", Role::Vendor).with_company(CompanyId::new("globex"));
        let root = User::new("root", "Root", Role::SuperAdmin);

        assert!(PackageStage::Pm.admits(&owner, &project));
        assert!(!PackageStage::Pm.admits(&other_pm, &project));
        assert!(!PackageStage::Pm.admits(&manager, &project));
        assert!(PackageStage::Pjm.admits(&manager, &project));
        assert!(PackageStage::Pjm.admits(&vendor, &project));
        assert!(!PackageStage::Pjm.admits(&stranger, &project));
        assert!(!PackageStage::Pjm.admits(&owner, &project));
        assert!(PackageStage::PmFinal.admits(&root, &project));
    }
}
