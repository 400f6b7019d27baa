//! Append-only audit records for accepted workflow actions
//!
//! One [`WorkflowAction`] is written per accepted action call and never
//! updated. Records are hash-linked per instance: each record's hash
//! covers its content, its sequence number and the previous record's hash,
//! so a rewritten or dropped entry breaks the chain.

use crate::{StepId, WorkflowInstanceId};
use chrono::{DateTime, Utc};
use console_types::{ActionKind, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audit append payload. Ids, sequencing and hashes are assigned on seal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowActionAppend {
    pub instance_id: WorkflowInstanceId,
    pub step_id: StepId,
    pub actor_id: UserId,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// Persistent, tamper-evident audit record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAction {
    pub id: String,
    pub instance_id: WorkflowInstanceId,
    pub step_id: StepId,
    pub actor_id: UserId,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
    /// 1-based position within the instance's log
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl WorkflowAction {
    /// Seal `event` as the record following `previous` in its instance's log
    pub fn seal(
        event: WorkflowActionAppend,
        previous: Option<&WorkflowAction>,
    ) -> Result<Self, serde_json::Error> {
        let previous_hash = previous.map(|p| p.hash.clone());
        let sequence = previous.map_or(1, |p| p.sequence + 1);
        let hash = compute_action_hash(&event, previous_hash.as_deref(), sequence)?;

        Ok(Self {
            id: format!("action-{}", uuid::Uuid::new_v4()),
            instance_id: event.instance_id,
            step_id: event.step_id,
            actor_id: event.actor_id,
            action: event.action,
            comment: event.comment,
            metadata: event.metadata,
            timestamp: event.timestamp,
            sequence,
            previous_hash,
            hash,
        })
    }

    fn content(&self) -> WorkflowActionAppend {
        WorkflowActionAppend {
            instance_id: self.instance_id.clone(),
            step_id: self.step_id.clone(),
            actor_id: self.actor_id.clone(),
            action: self.action,
            comment: self.comment.clone(),
            metadata: self.metadata.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Check that `records`, in sequence order, form one unbroken hash chain
pub fn verify_chain(records: &[WorkflowAction]) -> bool {
    let mut previous: Option<&WorkflowAction> = None;
    for record in records {
        let expected_sequence = previous.map_or(1, |p| p.sequence + 1);
        let expected_previous = previous.map(|p| p.hash.as_str());
        if record.sequence != expected_sequence
            || record.previous_hash.as_deref() != expected_previous
        {
            return false;
        }
        match compute_action_hash(&record.content(), expected_previous, record.sequence) {
            Ok(hash) if hash == record.hash => {}
            _ => return false,
        }
        previous = Some(record);
    }
    true
}

fn compute_action_hash(
    event: &WorkflowActionAppend,
    previous_hash: Option<&str>,
    sequence: u64,
) -> Result<String, serde_json::Error> {
    let serializable = serde_json::json!({
        "previous_hash": previous_hash,
        "sequence": sequence,
        "instance_id": event.instance_id,
        "step_id": event.step_id,
        "actor_id": event.actor_id,
        "action": event.action,
        "comment": event.comment,
        "metadata": event.metadata,
        "timestamp": event.timestamp,
    });
    let serialized = serde_json::to_vec(&serializable)?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append(action: ActionKind, comment: Option<&str>) -> WorkflowActionAppend {
        WorkflowActionAppend {
            instance_id: WorkflowInstanceId::new("wi-1"),
            step_id: StepId::new("s-1"),
            actor_id: UserId::new("pm-1"),
            action,
            comment: comment.map(str::to_string),
            metadata: serde_json::json!({"stepName": "PM_REVIEW"}),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_seal_links_records() {
        let first = WorkflowAction::seal(append(ActionKind::Approve, None), None).unwrap();
        let second =
            WorkflowAction::seal(append(ActionKind::Reject, Some("missing")), Some(&first))
                .unwrap();

        assert_eq!(first.sequence, 1);
        assert!(first.previous_hash.is_none());
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_hash, Some(first.hash.clone()));
        assert!(verify_chain(&[first, second]));
    }

    #[test]
    fn test_tampered_record_breaks_chain() {
        let first = WorkflowAction::seal(append(ActionKind::Approve, None), None).unwrap();
        let mut second =
            WorkflowAction::seal(append(ActionKind::Reject, Some("missing")), Some(&first))
                .unwrap();
        second.comment = Some("rewritten".to_string());
        assert!(!verify_chain(&[first, second]));
    }

    #[test]
    fn test_dropped_record_breaks_chain() {
        let first = WorkflowAction::seal(append(ActionKind::Approve, None), None).unwrap();
        let second = WorkflowAction::seal(append(ActionKind::Approve, None), Some(&first)).unwrap();
        let third = WorkflowAction::seal(append(ActionKind::Approve, None), Some(&second)).unwrap();
        assert!(!verify_chain(&[first, third]));
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(verify_chain(&[]));
    }
}
