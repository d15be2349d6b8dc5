use thiserror::Error;

/// Errors that can arise while managing NPC records, templates and live instances.
#[derive(Debug, Error)]
pub enum NpcError {
    /// Returned when a record id, name token or template key is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected input (empty command identifier, unknown property, bad vector).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator (engine, kit provider) refused or failed an operation.
    #[error("external failure: {0}")]
    External(String),

    /// Wrapper around IO errors (data file read/write, directory creation).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON serialization errors of the persisted document.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Acting user lacks the required permission grant.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl NpcError {
    /// True for errors that are surfaced to users as plain messages rather than escalated.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            NpcError::NotFound(_) | NpcError::InvalidInput(_) | NpcError::PermissionDenied(_)
        )
    }
}
