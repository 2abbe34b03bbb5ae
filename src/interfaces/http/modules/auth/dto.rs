//! Authentication DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::LoginResult;
use crate::domain::{CreateUserDto, UserRecord};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email
    #[validate(length(min = 1, max = 256, message = "identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// Link placed in the confirmation email if the account is unconfirmed
    #[validate(length(min = 1, message = "callback_url is required"))]
    pub callback_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub username: String,
    pub avatar: Option<String>,
    pub roles: Vec<String>,
    pub token: String,
}

impl From<LoginResult> for LoginResponse {
    fn from(r: LoginResult) -> Self {
        Self {
            id: r.id,
            email: r.email,
            full_name: r.full_name,
            username: r.username,
            avatar: r.avatar,
            roles: r.roles,
            token: r.token,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(max = 256, message = "username is too long"))]
    pub username: String,
    #[validate(length(max = 256, message = "email is too long"))]
    pub email: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_number: Option<String>,
    #[validate(length(max = 128, message = "password is too long"))]
    pub password: String,
}

impl From<RegisterRequest> for CreateUserDto {
    fn from(r: RegisterRequest) -> Self {
        Self {
            username: r.username,
            email: r.email,
            full_name: r.full_name,
            avatar: r.avatar,
            address: r.address,
            birthday: r.birthday,
            phone_number: r.phone_number,
            password: r.password,
        }
    }
}

/// Public view of a freshly registered account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub email_confirmed: bool,
}

impl From<UserRecord> for RegisteredUser {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            email_confirmed: u.email_confirmed,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 256, message = "identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfirmationRequest {
    #[validate(length(min = 1, max = 256, message = "identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "callback_url is required"))]
    pub callback_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationResponse {
    /// Whether the mail transport accepted the message
    pub sent: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: String,
    /// Unix timestamp
    pub expires_at: i64,
}

impl From<AuthenticatedUser> for CurrentUser {
    fn from(u: AuthenticatedUser) -> Self {
        Self {
            username: u.username,
            email: u.email,
            roles: u.roles,
            token_id: u.token_id,
            expires_at: u.expires_at,
        }
    }
}
