//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// Damaged or missing message files are not errors: they surface as
/// [`EnrichmentIssue`](crate::EnrichmentIssue) on an otherwise successful result.
#[derive(Debug, Error)]
pub enum Error {
    /// No store file exists for the requested account.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// The archive root contains no accounts.
    #[error("No accounts available")]
    NoAccountsAvailable,

    /// A required parameter is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request was valid but nothing matched it.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A write against the archive store was attempted and blocked.
    #[error("Store integrity violation: {0}")]
    StoreIntegrityViolation(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors a caller caused by asking for something absent or malformed.
    ///
    /// These map to client-side failures at a request boundary; everything else is a
    /// server-side fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_) | Self::InvalidInput(_) | Self::RecordNotFound(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::AccountNotFound("nope".into()).is_client_error());
        assert!(Error::InvalidInput("page".into()).is_client_error());
        assert!(Error::RecordNotFound("uid".into()).is_client_error());
        assert!(!Error::NoAccountsAvailable.is_client_error());
        assert!(!Error::StoreIntegrityViolation("insert".into()).is_client_error());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::AccountNotFound("bob".into()).to_string(),
            "Account not found: bob"
        );
        assert_eq!(Error::NoAccountsAvailable.to_string(), "No accounts available");
    }
}
