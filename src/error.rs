//! Error types for the IEC 61850 model and reporting services.

use thiserror::Error;

use crate::types::ValueKind;

/// Result type alias for IEC 61850 operations.
pub type Result<T> = std::result::Result<T, Iec61850Error>;

/// IEC 61850 model and reporting error types.
///
/// Every variant describes a local, synchronous condition. A failed call
/// leaves the model and all report control blocks unchanged.
#[derive(Debug, Error)]
pub enum Iec61850Error {
    /// Unknown object reference, dataset or report control block
    #[error("Not found: {0}")]
    NotFound(String),

    /// Name already used by a sibling node, dataset or RCB
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Malformed object reference or illegal node name
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Dataset construction violation
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Written value kind differs from the attribute's declared kind
    #[error("Type mismatch on {reference}: expected {expected}, got {actual}")]
    TypeMismatch {
        reference: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// RCB is owned by another sink
    #[error("Report control block busy: {0}")]
    Busy(String),

    /// Dataset is bound to an enabled RCB
    #[error("Dataset frozen: {0}")]
    FrozenDataset(String),

    /// Illegal RCB state transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Disconnect attempted while owning an enabled RCB
    #[error("Owned report control block still enabled: {0}")]
    OwnedEnabledRcb(String),

    /// Client is not connected to a server
    #[error("Not connected")]
    NotConnected,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model description could not be parsed
    #[error("Model description error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Iec61850Error {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a duplicate-name error.
    pub fn duplicate(what: impl Into<String>) -> Self {
        Self::DuplicateName(what.into())
    }

    /// Create an invalid-reference error.
    pub fn invalid_reference(what: impl Into<String>) -> Self {
        Self::InvalidReference(what.into())
    }

    /// Create an invalid-dataset error.
    pub fn invalid_dataset(msg: impl Into<String>) -> Self {
        Self::InvalidDataset(msg.into())
    }

    /// Create an invalid-state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Check if this error comes from RCB ownership rules.
    pub fn is_ownership_error(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::OwnedEnabledRcb(_))
    }

    /// Check if this error comes from model assembly or dataset construction.
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName(_)
                | Self::InvalidReference(_)
                | Self::InvalidDataset(_)
                | Self::Json(_)
        )
    }
}
