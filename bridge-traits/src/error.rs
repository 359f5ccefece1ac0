use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Unsupported media type: {0}")]
    Unsupported(String),

    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the host runtime rejected the operation because the
    /// underlying object was busy or already torn down.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, BridgeError::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
