pub mod ports;
pub mod user;

pub use ports::{EmailMessage, EmailSender};
pub use user::{
    normalize_key, CreateUserDto, LockoutPolicy, PasswordPolicy, UserDirectory, UserRecord,
    ADMIN_ROLE, CUSTOMER_ROLE,
};

pub use crate::shared::types::errors::{DomainError, DomainResult};
