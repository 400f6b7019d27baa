//! Application state for REST handlers

use chrono::{DateTime, Utc};
use console_storage::ConsoleStorage;
use package_gate::{GatePolicy, PackageGate};
use std::sync::Arc;
use workflow_engine::WorkflowEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Backing store, used directly by the directory endpoints
    pub storage: Arc<dyn ConsoleStorage>,

    /// Workflow definitions, instances and actions
    pub engine: WorkflowEngine,

    /// Project package staging
    pub gate: PackageGate,

    /// Daemon version
    pub version: String,

    /// Start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(storage: Arc<dyn ConsoleStorage>, policy: GatePolicy) -> Self {
        Self {
            engine: WorkflowEngine::new(storage.clone()),
            gate: PackageGate::new(storage.clone(), policy),
            storage,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let secs = duration.num_seconds().max(0);

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
