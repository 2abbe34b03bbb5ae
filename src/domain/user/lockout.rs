//! Failed-login accounting shared by directory backends

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// When repeated password failures lock an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    pub enabled: bool,
    pub max_failed_attempts: i32,
    pub lockout_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            lockout_minutes: 5,
        }
    }
}

/// Counter and lockout values to persist after a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutUpdate {
    pub access_failed_count: i32,
    pub lockout_end: Option<DateTime<Utc>>,
}

impl LockoutPolicy {
    /// Account state after one more failed attempt. Returns `None` when
    /// lockout does not apply to this account.
    pub fn record_failure(
        &self,
        lockout_enabled: bool,
        failed_so_far: i32,
        now: DateTime<Utc>,
    ) -> Option<LockoutUpdate> {
        if !self.enabled || !lockout_enabled {
            return None;
        }

        let count = failed_so_far + 1;
        if count >= self.max_failed_attempts {
            Some(LockoutUpdate {
                access_failed_count: 0,
                lockout_end: Some(now + Duration::minutes(self.lockout_minutes)),
            })
        } else {
            Some(LockoutUpdate {
                access_failed_count: count,
                lockout_end: None,
            })
        }
    }
}
