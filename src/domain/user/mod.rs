//! User aggregate
//!
//! Contains the user record, registration DTO, validation rules, lockout
//! policy and the directory interface.

pub mod lockout;
pub mod model;
pub mod repository;
pub mod validation;

mod dto_create;

pub use model::{normalize_key, UserRecord, ADMIN_ROLE, CUSTOMER_ROLE};

pub use dto_create::CreateUserDto;

pub use lockout::{LockoutPolicy, LockoutUpdate};
pub use validation::{validate_registration, PasswordPolicy, Taken};

pub use repository::UserDirectory;
