//! Error taxonomy for the approval subsystem

/// Errors reported by workflow and package operations.
///
/// None of these are fatal: the REST boundary turns each into a
/// client-facing response. A failed operation never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// Malformed action, missing required comment, unknown step/action
    #[error("Validation error: {0}")]
    Validation(String),

    /// No workflow instance for the entity, unknown definition/project/task
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor is not in the resolved approver set, or lacks the role for a stage
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// The target is not in the status the requested transition expects
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A dynamic approver rule resolved to nobody
    #[error("Approver resolution failed: {0}")]
    Resolution(String),

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ConsoleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Authorization(_) => "AUTHORIZATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Resolution(_) => "RESOLUTION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Result type alias for console operations
pub type ConsoleResult<T> = Result<T, ConsoleError>;
