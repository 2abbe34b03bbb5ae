//! Identity module: login, registration, email confirmation
//!
//! Contains the `AuthService` which orchestrates the auth workflow over
//! the user directory and the mail port.

pub mod confirmation;
pub mod errors;
pub mod service;

pub use errors::{AuthError, AuthResult};
pub use service::{AuthService, LoginResult, RegisterOutcome};
