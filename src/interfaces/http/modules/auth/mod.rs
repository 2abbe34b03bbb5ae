//! Authentication module: login, register, token, email confirmation

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
