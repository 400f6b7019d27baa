//! The action vocabulary shared by task workflows and the package gate

use crate::ConsoleError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An action an approver can take against the current step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Approve,
    Reject,
    SendBack,
    RequestChange,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Approve,
        ActionKind::Reject,
        ActionKind::SendBack,
        ActionKind::RequestChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::SendBack => "SEND_BACK",
            Self::RequestChange => "REQUEST_CHANGE",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "SEND_BACK" => Ok(Self::SendBack),
            "REQUEST_CHANGE" => Ok(Self::RequestChange),
            other => Err(ConsoleError::validation(format!(
                "unknown action '{}'; expected one of APPROVE, REJECT, SEND_BACK, REQUEST_CHANGE",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!("approve".parse::<ActionKind>().unwrap(), ActionKind::Approve);
        assert_eq!(
            " SEND_BACK ".parse::<ActionKind>().unwrap(),
            ActionKind::SendBack
        );
        let err = "ESCALATE".parse::<ActionKind>().unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }
}
