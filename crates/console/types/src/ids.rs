//! String-backed identifiers for console entities

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn short(&self) -> &str {
                &self.0[..8.min(self.0.len())]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a console user
    UserId
);
string_id!(
    /// Identifier of a project
    ProjectId
);
string_id!(
    /// Identifier of a task (the work item gated by approval workflows)
    TaskId
);
string_id!(
    /// Identifier of a vendor company
    CompanyId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert!(a.short().len() <= 8);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ProjectId::new("proj-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"proj-1\"");
        assert_eq!(format!("{}", UserId::from("u-1")), "u-1");
    }
}
