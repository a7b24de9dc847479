//! Tournament error types.

use thiserror::Error;

use super::models::{TournamentId, Version};

/// Fixed error messages surfaced verbatim to API callers.
pub mod messages {
    pub const NAME_REQUIRED: &str =
        "Tournament name is required and must have at least 3 characters.";
    pub const DESCRIPTION_REQUIRED: &str =
        "Tournament description is required and must have at least 10 characters.";
    pub const NAME_TOO_SHORT: &str = "Tournament name must have at least 3 characters.";
    pub const DESCRIPTION_TOO_SHORT: &str =
        "Tournament description must have at least 10 characters.";
    pub const REGISTRATION_END_NOT_AFTER_START: &str =
        "Registration end date cannot be before or equal to the start date.";
    pub const START_BEFORE_REGISTRATION_END: &str =
        "Tournament start date cannot be before registration end date.";

    pub const UPDATE_WITH_REGISTRATIONS: &str =
        "Cannot update a tournament that already has registrations.";
    pub const UPDATE_DELETED: &str = "Cannot update a deleted tournament.";
    pub const DELETE_WITH_REGISTRATIONS: &str =
        "Cannot delete a tournament that already has registrations.";
    pub const ALREADY_DELETED: &str = "Tournament is already deleted.";
    pub const OPERATION_ON_DELETED: &str = "Cannot perform operations on a deleted tournament.";
    pub const INDIVIDUAL_TYPE_REQUIRED: &str =
        "Cannot register for this tournament type. Tournament must be of type INDIVIDUAL.";
    pub const DUO_TYPE_REQUIRED: &str =
        "Cannot register for this tournament type. Tournament must be of type DUO.";
    pub const REGISTRATION_CLOSED: &str = "Registration period is not open for this tournament.";
    pub const SAME_PERSON: &str = "Competitor and partner cannot be the same person.";
    pub const NOT_PENDING_APPROVAL: &str = "Registration is not pending approval.";

    pub const COMPETITOR_ALREADY_REGISTERED: &str =
        "Competitor is already registered for this tournament.";
    pub const DUO_ALREADY_REGISTERED: &str =
        "Competitor or partner is already registered for this tournament.";
    pub const DUPLICATE_REGISTRATION: &str =
        "A registration for this competitor already exists in this tournament.";
}

/// Coarse classification callers use to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidOperation,
    NotFound,
    Conflict,
    Internal,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Invalid name, description or dates
    #[error("{0}")]
    Validation(String),

    /// Operation not allowed in the current state
    #[error("{0}")]
    InvalidOperation(String),

    /// Tournament or registration absent
    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration
    #[error("{0}")]
    Conflict(String),

    /// Stored version differs from the version the caller loaded
    #[error("Tournament was modified by another request. Please refresh and try again.")]
    OptimisticLock {
        tournament_id: TournamentId,
        expected_version: Version,
        actual_version: Version,
    },

    /// A persisted value could not be mapped back into the domain
    #[error("Invalid stored value: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    pub(crate) fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }

    pub(crate) fn invalid_operation(message: &str) -> Self {
        Self::InvalidOperation(message.to_string())
    }

    pub(crate) fn conflict(message: &str) -> Self {
        Self::Conflict(message.to_string())
    }

    pub(crate) fn tournament_not_found(id: &str) -> Self {
        Self::NotFound(format!("Tournament with ID {id} not found."))
    }

    pub(crate) fn registration_not_in_tournament(id: &str) -> Self {
        Self::NotFound(format!(
            "Registration with ID {id} not found in this tournament."
        ))
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) | Self::OptimisticLock { .. } => ErrorKind::Conflict,
            Self::InvalidRecord(_) | Self::Database(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether reloading the aggregate and re-attempting may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize storage errors - don't expose SQL details
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::InvalidRecord(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_display_fixed_message() {
        let err = TournamentError::validation(messages::NAME_REQUIRED);
        assert_eq!(
            err.to_string(),
            "Tournament name is required and must have at least 3 characters."
        );

        let err = TournamentError::registration_not_in_tournament("reg-42");
        assert_eq!(
            err.to_string(),
            "Registration with ID reg-42 not found in this tournament."
        );
    }

    #[test]
    fn test_optimistic_lock_is_retryable_conflict() {
        let err = TournamentError::OptimisticLock {
            tournament_id: "t-1".to_string(),
            expected_version: 3,
            actual_version: 4,
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_retryable());

        let err = TournamentError::conflict(messages::COMPETITOR_ALREADY_REGISTERED);
        assert!(err.is_retryable());
        assert!(!TournamentError::validation(messages::NAME_TOO_SHORT).is_retryable());
    }

    #[test]
    fn test_client_message_sanitizes_storage_errors() {
        let err = TournamentError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = TournamentError::invalid_operation(messages::SAME_PERSON);
        assert_eq!(err.client_message(), messages::SAME_PERSON);
    }
}
