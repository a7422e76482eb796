//! Error types for system operations

use crate::actors::messages::NodeKind;

/// Result type alias for system operations
pub type SystemResult<T> = Result<T, SystemError>;

/// Errors surfaced by [`crate::system::System`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SystemError {
    /// Another `start` is draining or rewiring the system
    #[error("system {0} reset in progress")]
    ResetInProgress(String),

    /// Settings the actors cannot run with
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    /// No node with this id exists in the system
    #[error("node {0} not found")]
    NodeNotFound(String),

    /// No edge with this id exists in the system
    #[error("edge {0} not found")]
    EdgeNotFound(String),

    /// The endpoints cannot be connected in this direction
    #[error("cannot connect {source_kind} {source_id} to {target_kind} {target_id}")]
    InvalidEdge {
        source_id: String,
        source_kind: NodeKind,
        target_id: String,
        target_kind: NodeKind,
    },
}
