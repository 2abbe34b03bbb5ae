//! Registration rules shared by every directory backend
//!

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use super::CreateUserDto;

const ALLOWED_USERNAME_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+";

/// Password strength requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Vec<String> {
        let mut errors = Vec::new();

        if password.chars().count() < self.required_length {
            errors.push(format!(
                "Passwords must be at least {} characters.",
                self.required_length
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push("Passwords must have at least one non alphanumeric character.".into());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Passwords must have at least one digit ('0'-'9').".into());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push("Passwords must have at least one lowercase ('a'-'z').".into());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push("Passwords must have at least one uppercase ('A'-'Z').".into());
        }

        errors
    }
}

/// Uniqueness facts the caller looked up in its store before validating.
#[derive(Debug, Clone, Copy, Default)]
pub struct Taken {
    pub username: bool,
    pub email: bool,
}

/// Validate registration fields. Errors are ordered username, email, password.
pub fn validate_registration(dto: &CreateUserDto, taken: Taken, policy: &PasswordPolicy) -> Vec<String> {
    let mut errors = Vec::new();

    let username = dto.username.trim();
    if username.is_empty() || !username.chars().all(|c| ALLOWED_USERNAME_CHARS.contains(c)) {
        errors.push(format!(
            "Username '{}' is invalid, can only contain letters or digits.",
            dto.username
        ));
    } else if taken.username {
        errors.push(format!("Username '{}' is already taken.", username));
    }

    let email = dto.email.trim().to_string();
    if !email.validate_email() {
        errors.push(format!("Email '{}' is invalid.", dto.email));
    } else if taken.email {
        errors.push(format!("Email '{}' is already taken.", email));
    }

    errors.extend(policy.check(&dto.password));
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(username: &str, email: &str, password: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.into(),
            email: email.into(),
            full_name: None,
            avatar: None,
            address: None,
            birthday: None,
            phone_number: None,
            password: password.into(),
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        let errors = validate_registration(
            &dto("alice", "a@x.com", "Secret1!"),
            Taken::default(),
            &PasswordPolicy::default(),
        );
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn reports_duplicates_in_field_order() {
        let errors = validate_registration(
            &dto("alice", "a@x.com", "Secret1!"),
            Taken {
                username: true,
                email: true,
            },
            &PasswordPolicy::default(),
        );
        assert_eq!(
            errors,
            vec![
                "Username 'alice' is already taken.".to_string(),
                "Email 'a@x.com' is already taken.".to_string(),
            ]
        );
    }

    #[test]
    fn rejects_bad_username_and_email() {
        let errors = validate_registration(
            &dto("al ice", "not-an-email", "Secret1!"),
            Taken::default(),
            &PasswordPolicy::default(),
        );
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Username 'al ice' is invalid"));
        assert_eq!(errors[1], "Email 'not-an-email' is invalid.");
    }

    #[test]
    fn weak_password_lists_every_missing_class() {
        let errors = PasswordPolicy::default().check("abc");
        assert_eq!(
            errors,
            vec![
                "Passwords must be at least 6 characters.".to_string(),
                "Passwords must have at least one non alphanumeric character.".to_string(),
                "Passwords must have at least one digit ('0'-'9').".to_string(),
                "Passwords must have at least one uppercase ('A'-'Z').".to_string(),
            ]
        );
    }

    #[test]
    fn relaxed_policy_only_checks_length() {
        let policy = PasswordPolicy {
            required_length: 4,
            require_digit: false,
            require_lowercase: false,
            require_uppercase: false,
            require_non_alphanumeric: false,
        };
        assert!(policy.check("abcd").is_empty());
        assert_eq!(policy.check("abc").len(), 1);
    }
}
