//! User roles

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A user's role in the console.
///
/// Workflow `ROLE` steps authorize purely by this value; package stages
/// combine it with the actor's relationship to the project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Blanket override: may act at any step and any package stage
    SuperAdmin,
    /// Console administrator (authors workflow definitions)
    Admin,
    /// Product Manager on the client side; owns projects
    Pm,
    /// Vendor-side project/delivery manager
    Pjm,
    Engineer,
    Developer,
    /// Vendor company staff without a delivery role
    Vendor,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Admin => "ADMIN",
            Self::Pm => "PM",
            Self::Pjm => "PJM",
            Self::Engineer => "ENGINEER",
            Self::Developer => "DEVELOPER",
            Self::Vendor => "VENDOR",
        }
    }

    pub fn is_super_admin(self) -> bool {
        self == Self::SuperAdmin
    }

    /// ENGINEER and DEVELOPER count as engineering-capable
    pub fn is_engineering(self) -> bool {
        matches!(self, Self::Engineer | Self::Developer)
    }

    /// Roles allowed to author workflow definitions
    pub fn can_manage_workflows(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin | Self::Pm)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "ADMIN" => Ok(Self::Admin),
            "PM" => Ok(Self::Pm),
            "PJM" => Ok(Self::Pjm),
            "ENGINEER" => Ok(Self::Engineer),
            "DEVELOPER" => Ok(Self::Developer),
            "VENDOR" => Ok(Self::Vendor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_name() {
        for role in [
            Role::SuperAdmin,
            Role::Admin,
            Role::Pm,
            Role::Pjm,
            Role::Engineer,
            Role::Developer,
            Role::Vendor,
        ] {
            assert_eq!(role.name().parse::<Role>().unwrap(), role);
            assert_eq!(
                serde_json::to_string(&role).unwrap(),
                format!("\"{}\"", role.name())
            );
        }
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Engineer.is_engineering());
        assert!(Role::Developer.is_engineering());
        assert!(!Role::Pjm.is_engineering());
        assert!(Role::Pm.can_manage_workflows());
        assert!(!Role::Developer.can_manage_workflows());
        assert!("nope".parse::<Role>().is_err());
    }
}
