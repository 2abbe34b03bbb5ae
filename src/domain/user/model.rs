//! User record as seen by the auth workflow

use chrono::{DateTime, NaiveDate, Utc};

/// Role assigned to every self-registered account.
pub const CUSTOMER_ROLE: &str = "Customer";

/// Role of the seeded administrator account.
pub const ADMIN_ROLE: &str = "Admin";

/// A stored user account.
///
/// The credential hash stays inside the directory implementation; this type
/// never carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub email_confirmed: bool,
    pub lockout_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub access_failed_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// `true` while a lockout timestamp lies strictly after `now`.
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_end.is_some_and(|end| end > now)
    }
}

/// Case-insensitive lookup key for usernames, emails and role names.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_uppercase()
}
