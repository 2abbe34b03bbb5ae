//! In-memory user directory

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::domain::user::{validate_registration, Taken};
use crate::domain::{
    normalize_key, CreateUserDto, DomainError, DomainResult, LockoutPolicy, PasswordPolicy,
    UserDirectory, UserRecord, ADMIN_ROLE, CUSTOMER_ROLE,
};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::InfraError;

struct StoredUser {
    record: UserRecord,
    password_hash: String,
    /// Normalized role keys
    roles: BTreeSet<String>,
}

/// In-memory directory for development and testing
pub struct InMemoryUserDirectory {
    users: DashMap<String, StoredUser>,
    /// normalized name -> display name
    roles: DashMap<String, String>,
    /// Serializes registrations so uniqueness checks and inserts stay atomic.
    create_lock: Mutex<()>,
    password_policy: PasswordPolicy,
    lockout_policy: LockoutPolicy,
}

impl InMemoryUserDirectory {
    /// Directory knowing the built-in `Admin` and `Customer` roles.
    pub fn new() -> Self {
        Self::with_roles(&[ADMIN_ROLE, CUSTOMER_ROLE])
    }

    pub fn with_roles(roles: &[&str]) -> Self {
        let directory = Self {
            users: DashMap::new(),
            roles: DashMap::new(),
            create_lock: Mutex::new(()),
            password_policy: PasswordPolicy::default(),
            lockout_policy: LockoutPolicy::default(),
        };
        for role in roles {
            directory.roles.insert(normalize_key(role), role.to_string());
        }
        directory
    }

    /// Store a ready-made record, bypassing registration rules.
    pub fn insert_user(&self, record: UserRecord, password: &str, roles: &[&str]) -> DomainResult<()> {
        let password_hash =
            hash_password(password).map_err(|e| InfraError::Crypto(e.to_string()))?;
        let roles = roles.iter().map(|r| normalize_key(r)).collect();
        self.users.insert(
            record.id.clone(),
            StoredUser {
                record,
                password_hash,
                roles,
            },
        );
        Ok(())
    }

    pub fn set_lockout_end(&self, user_id: &str, lockout_end: Option<DateTime<Utc>>) -> DomainResult<()> {
        self.update_record(user_id, |record| record.lockout_end = lockout_end)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn update_record(&self, user_id: &str, apply: impl FnOnce(&mut UserRecord)) -> DomainResult<()> {
        let mut entry = self.users.get_mut(user_id).ok_or_else(|| user_not_found(user_id))?;
        apply(&mut entry.record);
        entry.record.updated_at = Utc::now();
        Ok(())
    }

    fn find_where(&self, matches: impl Fn(&UserRecord) -> bool) -> Option<UserRecord> {
        self.users
            .iter()
            .find(|entry| matches(&entry.record))
            .map(|entry| entry.record.clone())
    }

    fn username_taken(&self, username: &str) -> bool {
        let key = normalize_key(username);
        self.find_where(|r| normalize_key(&r.username) == key).is_some()
    }

    fn email_taken(&self, email: &str) -> bool {
        let key = normalize_key(email);
        self.find_where(|r| normalize_key(&r.email) == key).is_some()
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn user_not_found(id: &str) -> DomainError {
    DomainError::NotFound {
        entity: "User",
        field: "id",
        value: id.to_string(),
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<UserRecord>> {
        let key = normalize_key(username);
        Ok(self.find_where(|r| normalize_key(&r.username) == key))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>> {
        let key = normalize_key(email);
        Ok(self.find_where(|r| normalize_key(&r.email) == key))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<UserRecord>> {
        Ok(self.users.get(id).map(|entry| entry.record.clone()))
    }

    async fn create(&self, dto: CreateUserDto) -> DomainResult<UserRecord> {
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| DomainError::Storage("user directory lock poisoned".into()))?;

        let taken = Taken {
            username: self.username_taken(&dto.username),
            email: self.email_taken(&dto.email),
        };
        let errors = validate_registration(&dto, taken, &self.password_policy);
        if !errors.is_empty() {
            debug!(username = %dto.username, count = errors.len(), "Registration rejected");
            return Err(DomainError::Validation(errors));
        }

        let password_hash =
            hash_password(&dto.password).map_err(|e| InfraError::Crypto(e.to_string()))?;

        let now = Utc::now();
        let record = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            username: dto.username.trim().to_string(),
            email: dto.email.trim().to_string(),
            full_name: dto.full_name,
            avatar: dto.avatar,
            address: dto.address,
            birthday: dto.birthday,
            phone_number: dto.phone_number,
            email_confirmed: false,
            lockout_enabled: true,
            lockout_end: None,
            access_failed_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.users.insert(
            record.id.clone(),
            StoredUser {
                record: record.clone(),
                password_hash,
                roles: BTreeSet::new(),
            },
        );

        Ok(record)
    }

    async fn delete(&self, user: &UserRecord) -> DomainResult<()> {
        self.users
            .remove(&user.id)
            .map(|_| ())
            .ok_or_else(|| user_not_found(&user.id))
    }

    async fn assign_role(&self, user: &UserRecord, role: &str) -> DomainResult<()> {
        let key = normalize_key(role);
        let display = self
            .roles
            .get(&key)
            .map(|name| name.value().clone())
            .ok_or_else(|| DomainError::NotFound {
                entity: "Role",
                field: "name",
                value: role.to_string(),
            })?;

        let mut entry = self.users.get_mut(&user.id).ok_or_else(|| user_not_found(&user.id))?;
        if !entry.roles.insert(key) {
            return Err(DomainError::Conflict(format!("User already in role '{}'.", display)));
        }
        Ok(())
    }

    async fn roles_of(&self, user: &UserRecord) -> DomainResult<Vec<String>> {
        let Some(entry) = self.users.get(&user.id) else {
            return Ok(Vec::new());
        };

        let mut names: Vec<String> = entry
            .roles
            .iter()
            .map(|key| self.roles.get(key).map(|n| n.value().clone()).unwrap_or_else(|| key.clone()))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn verify_password(&self, user: &UserRecord, password: &str) -> DomainResult<bool> {
        // bcrypt runs with the shard guard released
        let password_hash = self
            .users
            .get(&user.id)
            .map(|entry| entry.password_hash.clone())
            .ok_or_else(|| user_not_found(&user.id))?;

        let valid = verify_password(password, &password_hash).unwrap_or(false);
        let now = Utc::now();

        let mut entry = self.users.get_mut(&user.id).ok_or_else(|| user_not_found(&user.id))?;

        if valid {
            entry.record.access_failed_count = 0;
            return Ok(true);
        }

        let record = &mut entry.record;
        if let Some(update) =
            self.lockout_policy
                .record_failure(record.lockout_enabled, record.access_failed_count, now)
        {
            record.access_failed_count = update.access_failed_count;
            if let Some(end) = update.lockout_end {
                warn!(user_id = %record.id, lockout_end = %end, "Account locked after repeated failures");
                record.lockout_end = Some(end);
            }
            record.updated_at = now;
        }

        Ok(false)
    }
}
