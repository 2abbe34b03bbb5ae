//! Application layer: use-case orchestration

pub mod identity;

pub use identity::{AuthError, AuthResult, AuthService, LoginResult, RegisterOutcome};
