//! Error types for bw-extra

use thiserror::Error;

/// Provisioning error
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Bandwidth error: {0}")]
    Remote(#[from] bw_core::Error),

    #[error("No phone numbers available to order")]
    NoNumbersAvailable,
}

impl ProvisionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProvisionError::Remote(e) if e.is_cancelled())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProvisionError>;
