//! The engine facade the REST surface talks to

use crate::action_processor::ActionProcessor;
use crate::definition_store::DefinitionStore;
use crate::instance_engine::InstanceEngine;
use console_storage::ConsoleStorage;
use std::sync::Arc;

/// Definition store, instance engine and action processor over one store
#[derive(Clone)]
pub struct WorkflowEngine {
    pub definitions: DefinitionStore,
    pub instances: InstanceEngine,
    pub actions: ActionProcessor,
}

impl WorkflowEngine {
    pub fn new(storage: Arc<dyn ConsoleStorage>) -> Self {
        let definitions = DefinitionStore::new(storage.clone());
        Self {
            instances: InstanceEngine::new(storage.clone(), definitions.clone()),
            actions: ActionProcessor::new(storage),
            definitions,
        }
    }
}
