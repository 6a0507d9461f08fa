//! Error types for the GigPass client core.

use crate::models::TicketStatus;

/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, GigPassError>;

/// All errors that can occur when using the GigPass client core.
///
/// The first five variants form the domain taxonomy the presentation
/// layer distinguishes between when rendering a failure; the remaining
/// variants cover infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum GigPassError {
    /// No valid session exists, or the session has expired.
    #[error("not authenticated: no valid session")]
    NotAuthenticated,

    /// The session user is not the owner of the ticket being mutated.
    #[error("forbidden: only the seller may modify this ticket")]
    Forbidden,

    /// Malformed input (empty title, bad price, non-positive quantity).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The operation is not permitted in the ticket's current status.
    #[error("operation not permitted while ticket is {0}")]
    InvalidState(TicketStatus),

    /// The requested ticket does not exist.
    ///
    /// Normalized to success inside [`crate::service::TicketService::delete`];
    /// surfaced as an error everywhere else.
    #[error("ticket not found")]
    NotFound,

    /// The backend rejected a request with a non-success status.
    #[error("backend error {status}: {message}")]
    Api {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Human-readable message from the backend error body.
        message: String,
    },

    /// The HTTP transport failed before a response was received.
    #[cfg(feature = "rest")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A local shared-state or backend-internal failure (poisoned lock,
    /// storage fault).
    #[error("store error: {0}")]
    Store(Box<dyn core::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = GigPassError::from(serde_err);
        assert!(matches!(err, GigPassError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn error_store_display() {
        let inner = std::io::Error::other("lock poisoned");
        let err = GigPassError::Store(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("store error"));
        assert!(msg.contains("lock poisoned"));
    }

    #[test]
    fn error_not_authenticated_display() {
        let err = GigPassError::NotAuthenticated;
        assert!(err.to_string().contains("not authenticated"));
    }

    #[test]
    fn error_invalid_state_names_status() {
        let err = GigPassError::InvalidState(TicketStatus::Sold);
        assert!(err.to_string().contains("sold"));
    }

    #[test]
    fn error_api_display() {
        let err = GigPassError::Api {
            status: 500,
            message: "internal error".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("internal error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GigPassError>();
    }
}
