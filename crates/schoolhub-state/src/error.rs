//! Error types for the view-state layer.

/// Errors that can occur while reconciling local view state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A mutation on this entity is still waiting for the server.
    #[error("a change to {0} is already in progress")]
    MutationInFlight(String),

    /// The entity is not in the local view.
    #[error("{0} not found")]
    NotFound(String),

    /// Commit or rollback was called with no pending mutation.
    #[error("no pending change to {0}")]
    NothingPending(String),
}
