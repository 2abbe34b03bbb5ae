use async_trait::async_trait;

use super::{CreateUserDto, UserRecord};
use crate::domain::DomainResult;

/// Store of user accounts consumed by the auth workflow.
///
/// Lookups by username and email are case-insensitive. `create` reports
/// rejected fields as [`DomainError::Validation`](crate::domain::DomainError::Validation).
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<UserRecord>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<UserRecord>>;

    async fn create(&self, dto: CreateUserDto) -> DomainResult<UserRecord>;
    async fn delete(&self, user: &UserRecord) -> DomainResult<()>;

    async fn assign_role(&self, user: &UserRecord, role: &str) -> DomainResult<()>;
    async fn roles_of(&self, user: &UserRecord) -> DomainResult<Vec<String>>;

    /// Checks `password` against the stored hash. May update failure
    /// counters and lock the account according to the directory's policy.
    async fn verify_password(&self, user: &UserRecord, password: &str) -> DomainResult<bool>;
}
