use thiserror::Error;

use crate::domain::DomainError;

/// Failures of the login / registration workflow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No account matches username or email '{0}'")]
    NotFound(String),

    #[error("This account is currently locked")]
    AccountLocked,

    #[error("The email address of this account has not been confirmed")]
    UnconfirmedAccount,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Registration could not be completed, please try again")]
    RegistrationFailed,

    /// A half-registered account could not be removed.
    #[error("Account {user_id} was created without a role and could not be rolled back")]
    InconsistentState { user_id: String },

    #[error("Token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Directory(#[from] DomainError),
}

/// Result type for auth workflow operations
pub type AuthResult<T> = Result<T, AuthError>;
