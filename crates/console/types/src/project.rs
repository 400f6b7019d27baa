//! Projects and their package staging fields

use crate::{CompanyId, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Package status ───────────────────────────────────────────────────

/// Where a project is in the package handoff
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    /// Product Manager is drafting the package
    #[default]
    PmDraft,
    /// Vendor-side project manager is reviewing
    PjmReview,
    /// Engineering review; belongs to the PJM stage
    EngReview,
    /// Back with the owner for final activation
    PmActivate,
    /// Returned to an earlier stage; see `package_sent_back_to`
    SentBack,
    /// Live; the package flow has ended
    Active,
}

impl PackageStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::PmDraft => "PM_DRAFT",
            Self::PjmReview => "PJM_REVIEW",
            Self::EngReview => "ENG_REVIEW",
            Self::PmActivate => "PM_ACTIVATE",
            Self::SentBack => "SENT_BACK",
            Self::Active => "ACTIVE",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Active
    }
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Who a package was sent back to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentBackTarget {
    Pm,
    Pjm,
    Eng,
}

impl SentBackTarget {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pm => "PM",
            Self::Pjm => "PJM",
            Self::Eng => "ENG",
        }
    }
}

impl std::fmt::Display for SentBackTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SentBackTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PM" => Ok(Self::Pm),
            "PJM" => Ok(Self::Pjm),
            "ENG" => Ok(Self::Eng),
            other => Err(format!(
                "unknown send-back target '{}'; expected PM, PJM or ENG",
                other
            )),
        }
    }
}

/// The package fields stored on the project record itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackageState {
    pub package_status: PackageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_sent_back_to: Option<SentBackTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_sent_back_reason: Option<String>,
}

impl PackageState {
    pub fn status(&self) -> PackageStatus {
        self.package_status
    }

    pub fn is_sent_back(&self) -> bool {
        self.package_status == PackageStatus::SentBack
    }

    /// Move to a forward status. Leaving `SENT_BACK` clears the target and reason.
    pub fn advance_to(&mut self, next: PackageStatus) {
        self.package_status = next;
        if next != PackageStatus::SentBack {
            self.package_sent_back_to = None;
            self.package_sent_back_reason = None;
        }
    }

    pub fn send_back(&mut self, target: SentBackTarget, reason: impl Into<String>) {
        self.package_status = PackageStatus::SentBack;
        self.package_sent_back_to = Some(target);
        self.package_sent_back_reason = Some(reason.into());
    }
}

// ── Project ──────────────────────────────────────────────────────────

/// A delivery project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// The owning Product Manager
    pub owner_id: UserId,
    /// Vendor-side delivery manager, once assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_manager_user_id: Option<UserId>,
    /// Vendor companies linked to the project
    #[serde(default)]
    pub vendor_company_ids: Vec<CompanyId>,
    /// Users explicitly staffed on the project
    #[serde(default)]
    pub member_user_ids: Vec<UserId>,
    #[serde(flatten)]
    pub package: PackageState,
    /// Optimistic concurrency guard; bumped by the store on every update
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(id),
            name: name.into(),
            owner_id,
            delivery_manager_user_id: None,
            vendor_company_ids: Vec::new(),
            member_user_ids: Vec::new(),
            package: PackageState::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_delivery_manager(mut self, user: UserId) -> Self {
        self.delivery_manager_user_id = Some(user);
        self
    }

    pub fn with_vendor_company(mut self, company: CompanyId) -> Self {
        self.vendor_company_ids.push(company);
        self
    }

    pub fn with_member(mut self, user: UserId) -> Self {
        self.member_user_ids.push(user);
        self
    }

    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }

    pub fn is_delivery_manager(&self, user: &UserId) -> bool {
        self.delivery_manager_user_id.as_ref() == Some(user)
    }

    pub fn has_vendor_company(&self, company: &CompanyId) -> bool {
        self.vendor_company_ids.contains(company)
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.member_user_ids.contains(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_starts_in_draft() {
        let project = Project::new("p-1", "Portal", UserId::new("pm-1"));
        assert_eq!(project.package.status(), PackageStatus::PmDraft);
        assert!(project.package.package_sent_back_to.is_none());
        assert_eq!(project.version, 0);
    }

    #[test]
    fn test_leaving_sent_back_clears_target() {
        let mut state = PackageState::default();
        state.send_back(SentBackTarget::Pm, "scope unclear");
        assert!(state.is_sent_back());
        assert_eq!(state.package_sent_back_to, Some(SentBackTarget::Pm));

        state.advance_to(PackageStatus::PjmReview);
        assert_eq!(state.status(), PackageStatus::PjmReview);
        assert!(state.package_sent_back_to.is_none());
        assert!(state.package_sent_back_reason.is_none());
    }

    #[test]
    fn test_project_serializes_package_fields_flat() {
        let mut project = Project::new("p-1", "Portal", UserId::new("pm-1"));
        project.package.send_back(SentBackTarget::Eng, "needs estimate");
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["packageStatus"], "SENT_BACK");
        assert_eq!(json["packageSentBackTo"], "ENG");
        assert_eq!(json["ownerId"], "pm-1");
    }

    #[test]
    fn test_parse_sent_back_target() {
        assert_eq!("pjm".parse::<SentBackTarget>().unwrap(), SentBackTarget::Pjm);
        assert!("QA".parse::<SentBackTarget>().is_err());
    }
}
