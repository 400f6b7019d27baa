//! References to entities a workflow can be bound to

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The kind of entity a workflow definition applies to.
///
/// Only tasks are gated today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    #[default]
    Task,
}

impl EntityType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Task => "TASK",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TASK" => Ok(Self::Task),
            other => Err(format!("unknown entity type '{}'", other)),
        }
    }
}

/// Id + type of the entity a workflow instance is bound to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn task(id: &crate::TaskId) -> Self {
        Self {
            entity_type: EntityType::Task,
            entity_id: id.0.clone(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
