//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod mail;
pub mod storage;

pub use database::{init_database, DatabaseConfig, UserRepository};
pub use mail::LogMailer;
pub use storage::InMemoryUserDirectory;
