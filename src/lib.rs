//! # Warehouse Auth
//!
//! Identity service for the warehouse bridge: login by username or email,
//! self-registration with the `Customer` role, email confirmation and
//! HS512 bearer tokens valid for 24 hours.
//!
//! ## Architecture
//!
//! - **domain**: user records, the `UserDirectory` and `EmailSender` ports,
//!   registration and lockout rules
//! - **application**: the `AuthService` workflow
//! - **infrastructure**: SeaORM directory, in-memory directory, JWT,
//!   password hashing, mail transport
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime lifecycle shared by the CLI

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use application::{AuthError, AuthService, LoginResult, RegisterOutcome};
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, InMemoryUserDirectory, UserRepository};
pub use interfaces::http::create_api_router;
