use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};
use sea_orm::sea_query::JoinType;
use tracing::{debug, info, warn};

use crate::domain::user::{validate_registration, Taken};
use crate::domain::{
    normalize_key, CreateUserDto, DomainError, DomainResult, LockoutPolicy, PasswordPolicy,
    UserDirectory, UserRecord,
};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::infrastructure::database::entities::{role, user, user_role};
use crate::shared::InfraError;

/// SeaORM-backed user directory.
pub struct UserRepository {
    db: DatabaseConnection,
    password_policy: PasswordPolicy,
    lockout_policy: LockoutPolicy,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            password_policy: PasswordPolicy::default(),
            lockout_policy: LockoutPolicy::default(),
        }
    }

    pub fn with_policies(mut self, password_policy: PasswordPolicy, lockout_policy: LockoutPolicy) -> Self {
        self.password_policy = password_policy;
        self.lockout_policy = lockout_policy;
        self
    }

    /// Mark the account's email as confirmed.
    pub async fn confirm_email(&self, user_id: &str) -> DomainResult<()> {
        let existing = self.find_model_by_id(user_id).await?.ok_or(DomainError::NotFound {
            entity: "User",
            field: "id",
            value: user_id.to_string(),
        })?;

        let mut active: user::ActiveModel = existing.into();
        active.email_confirmed = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    pub async fn count(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn find_model_by_id(&self, id: &str) -> DomainResult<Option<user::Model>> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn user_model_to_domain(model: user::Model) -> UserRecord {
    UserRecord {
        id: model.id,
        username: model.username,
        email: model.email,
        full_name: model.full_name,
        avatar: model.avatar,
        address: model.address,
        birthday: model.birthday,
        phone_number: model.phone_number,
        email_confirmed: model.email_confirmed,
        lockout_enabled: model.lockout_enabled,
        lockout_end: model.lockout_end,
        access_failed_count: model.access_failed_count,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    InfraError::Database(e).into()
}

fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── Directory implementation ────────────────────────────────────

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<UserRecord>> {
        let model = user::Entity::find()
            .filter(user::Column::NormalizedUsername.eq(normalize_key(username)))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>> {
        let model = user::Entity::find()
            .filter(user::Column::NormalizedEmail.eq(normalize_key(email)))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<UserRecord>> {
        Ok(self.find_model_by_id(id).await?.map(user_model_to_domain))
    }

    async fn create(&self, dto: CreateUserDto) -> DomainResult<UserRecord> {
        let taken = Taken {
            username: self.find_by_username(&dto.username).await?.is_some(),
            email: self.find_by_email(&dto.email).await?.is_some(),
        };
        let errors = validate_registration(&dto, taken, &self.password_policy);
        if !errors.is_empty() {
            debug!(username = %dto.username, count = errors.len(), "Registration rejected");
            return Err(DomainError::Validation(errors));
        }

        let password_hash =
            hash_password(&dto.password).map_err(|e| InfraError::Crypto(e.to_string()))?;

        let now = Utc::now();
        let username = dto.username.trim().to_string();
        let email = dto.email.trim().to_string();

        let new_user = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            normalized_username: Set(normalize_key(&username)),
            username: Set(username),
            normalized_email: Set(normalize_key(&email)),
            email: Set(email),
            full_name: Set(dto.full_name),
            avatar: Set(dto.avatar),
            address: Set(dto.address),
            birthday: Set(dto.birthday),
            phone_number: Set(dto.phone_number),
            password_hash: Set(password_hash),
            email_confirmed: Set(false),
            lockout_enabled: Set(true),
            lockout_end: Set(None),
            access_failed_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = new_user.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::validation("Username or email is already taken.")
            } else {
                db_err(e)
            }
        })?;

        info!(user_id = %model.id, username = %model.username, "User created");
        Ok(user_model_to_domain(model))
    }

    async fn delete(&self, user: &UserRecord) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(&user.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = user::Entity::delete_by_id(user.id.as_str())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: user.id.clone(),
            });
        }

        txn.commit().await.map_err(db_err)?;
        info!(user_id = %user.id, "User deleted");
        Ok(())
    }

    async fn assign_role(&self, user: &UserRecord, role_name: &str) -> DomainResult<()> {
        let role = role::Entity::find()
            .filter(role::Column::NormalizedName.eq(normalize_key(role_name)))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "name",
                value: role_name.to_string(),
            })?;

        let assignment = user_role::ActiveModel {
            user_id: Set(user.id.clone()),
            role_id: Set(role.id),
        };

        assignment.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::Conflict(format!("User already in role '{}'.", role.name))
            } else {
                db_err(e)
            }
        })?;

        debug!(user_id = %user.id, role = %role.name, "Role assigned");
        Ok(())
    }

    async fn roles_of(&self, user: &UserRecord) -> DomainResult<Vec<String>> {
        let roles = role::Entity::find()
            .join(JoinType::InnerJoin, role::Relation::UserRoles.def())
            .filter(user_role::Column::UserId.eq(&user.id))
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    async fn verify_password(&self, user: &UserRecord, password: &str) -> DomainResult<bool> {
        let model = self.find_model_by_id(&user.id).await?.ok_or(DomainError::NotFound {
            entity: "User",
            field: "id",
            value: user.id.clone(),
        })?;

        let valid = verify_password(password, &model.password_hash).unwrap_or(false);
        let now = Utc::now();

        if valid {
            if model.access_failed_count != 0 {
                let mut active: user::ActiveModel = model.into();
                active.access_failed_count = Set(0);
                active.updated_at = Set(now);
                active.update(&self.db).await.map_err(db_err)?;
            }
            return Ok(true);
        }

        let Some(update) =
            self.lockout_policy
                .record_failure(model.lockout_enabled, model.access_failed_count, now)
        else {
            return Ok(false);
        };

        let mut active: user::ActiveModel = model.into();
        active.access_failed_count = Set(update.access_failed_count);
        if let Some(end) = update.lockout_end {
            warn!(user_id = %user.id, lockout_end = %end, "Account locked after repeated failures");
            active.lockout_end = Set(Some(end));
        }
        active.updated_at = Set(now);
        active.update(&self.db).await.map_err(db_err)?;

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{init_database, migrator::Migrator, DatabaseConfig};
    use sea_orm_migration::MigratorTrait;

    async fn repo() -> UserRepository {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        UserRepository::new(db)
    }

    fn dto(username: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.into(),
            email: email.into(),
            full_name: Some("Alice Doe".into()),
            avatar: None,
            address: None,
            birthday: chrono::NaiveDate::from_ymd_opt(1990, 5, 17),
            phone_number: Some("+1-555-0100".into()),
            password: "Secret1!".into(),
        }
    }

    #[tokio::test]
    async fn create_then_lookup_is_case_insensitive() {
        let repo = repo().await;
        let created = repo.create(dto("alice", "a@x.com")).await.unwrap();

        assert!(!created.email_confirmed);
        let by_name = repo.find_by_username("ALICE").await.unwrap().unwrap();
        let by_email = repo.find_by_email("A@X.COM").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.birthday, chrono::NaiveDate::from_ymd_opt(1990, 5, 17));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let repo = repo().await;
        repo.create(dto("alice", "a@x.com")).await.unwrap();

        let err = repo.create(dto("alice2", "a@x.com")).await.unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors, vec!["Email 'a@x.com' is already taken.".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn roles_are_seeded_and_assignable() {
        let repo = repo().await;
        let user = repo.create(dto("alice", "a@x.com")).await.unwrap();

        repo.assign_role(&user, "Customer").await.unwrap();
        repo.assign_role(&user, "admin").await.unwrap();
        assert_eq!(repo.roles_of(&user).await.unwrap(), vec!["Admin", "Customer"]);

        let err = repo.assign_role(&user, "Auditor").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Role", .. }));
    }

    #[tokio::test]
    async fn delete_removes_user_and_assignments() {
        let repo = repo().await;
        let user = repo.create(dto("alice", "a@x.com")).await.unwrap();
        repo.assign_role(&user, "Customer").await.unwrap();

        repo.delete(&user).await.unwrap();
        assert!(repo.find_by_email("a@x.com").await.unwrap().is_none());
        assert!(repo.roles_of(&user).await.unwrap().is_empty());
        assert!(repo.delete(&user).await.is_err());
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let repo = repo().await.with_policies(
            PasswordPolicy::default(),
            LockoutPolicy {
                enabled: true,
                max_failed_attempts: 2,
                lockout_minutes: 10,
            },
        );
        let user = repo.create(dto("alice", "a@x.com")).await.unwrap();

        assert!(!repo.verify_password(&user, "wrong").await.unwrap());
        let after_one = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(after_one.access_failed_count, 1);
        assert!(!after_one.is_locked_out(Utc::now()));

        assert!(!repo.verify_password(&user, "wrong").await.unwrap());
        let locked = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(locked.is_locked_out(Utc::now()));
        assert_eq!(locked.access_failed_count, 0);
    }

    #[tokio::test]
    async fn confirm_email_flips_the_flag() {
        let repo = repo().await;
        let user = repo.create(dto("alice", "a@x.com")).await.unwrap();

        assert!(repo.verify_password(&user, "Secret1!").await.unwrap());
        repo.confirm_email(&user.id).await.unwrap();
        assert!(repo.find_by_id(&user.id).await.unwrap().unwrap().email_confirmed);
    }
}
