//! Auth workflow: application-layer orchestration
//!
//! Login, registration, token issuance and confirmation-mail dispatch.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::confirmation::{confirmation_body, CONFIRMATION_SUBJECT};
use super::errors::{AuthError, AuthResult};
use crate::domain::{
    CreateUserDto, DomainError, EmailMessage, EmailSender, UserDirectory, UserRecord,
    CUSTOMER_ROLE,
};
use crate::infrastructure::crypto::jwt::{create_token, AuthClaims, JwtConfig};

/// Returned after a successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub username: String,
    pub avatar: Option<String>,
    pub roles: Vec<String>,
    pub token: String,
}

/// Outcome of a registration attempt that did not fail outright
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Registered(UserRecord),
    /// Field-level rejections from the directory, in order
    Rejected(Vec<String>),
}

/// Auth service: orchestrates identity use-cases over an injected
/// [`UserDirectory`] and [`EmailSender`].
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    mailer: Arc<dyn EmailSender>,
    jwt_config: JwtConfig,
    confirmation_subject: String,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        mailer: Arc<dyn EmailSender>,
        jwt_config: JwtConfig,
    ) -> Self {
        Self {
            directory,
            mailer,
            jwt_config,
            confirmation_subject: CONFIRMATION_SUBJECT.to_string(),
        }
    }

    pub fn with_confirmation_subject(mut self, subject: impl Into<String>) -> Self {
        self.confirmation_subject = subject.into();
        self
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Authentication ──────────────────────────────────────────

    /// Log in by username or email.
    ///
    /// An unconfirmed account gets a fresh confirmation email and the call
    /// then fails with [`AuthError::UnconfirmedAccount`], whatever the password.
    /// A locked unconfirmed account fails with [`AuthError::AccountLocked`].
    /// Identifier and password are both trimmed.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        callback_url: &str,
    ) -> AuthResult<LoginResult> {
        let user = self.resolve(identifier).await?;

        if !user.email_confirmed {
            let sent = self.dispatch_confirmation(&user, callback_url).await?;
            if sent {
                info!(user_id = %user.id, "Confirmation email resent on login");
            } else {
                warn!(user_id = %user.id, "Confirmation email rejected by mail transport");
            }
            return Err(AuthError::UnconfirmedAccount);
        }

        let (token, roles) = self.issue_token(&user, password.trim()).await?;

        Ok(LoginResult {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            username: user.username,
            avatar: user.avatar,
            roles,
            token,
        })
    }

    /// Verify credentials and return a signed bearer token.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> AuthResult<String> {
        let user = self.resolve(identifier).await?;
        let (token, _) = self.issue_token(&user, password).await?;
        Ok(token)
    }

    // ── Registration ────────────────────────────────────────────

    /// Create an account with the `Customer` role.
    ///
    /// Rejected fields come back as [`RegisterOutcome::Rejected`]. If the
    /// role cannot be assigned the account is deleted again.
    pub async fn register(&self, dto: CreateUserDto) -> AuthResult<RegisterOutcome> {
        let user = match self.directory.create(dto).await {
            Ok(user) => user,
            Err(DomainError::Validation(errors)) => return Ok(RegisterOutcome::Rejected(errors)),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.directory.assign_role(&user, CUSTOMER_ROLE).await {
            error!(user_id = %user.id, error = %e, "Role assignment failed, rolling back registration");

            if let Err(delete_err) = self.directory.delete(&user).await {
                error!(user_id = %user.id, error = %delete_err, "Rollback failed, account left without role");
                return Err(AuthError::InconsistentState { user_id: user.id });
            }
            return Err(AuthError::RegistrationFailed);
        }

        info!(user_id = %user.id, username = %user.username, "New user registered");
        Ok(RegisterOutcome::Registered(user))
    }

    // ── Email confirmation ──────────────────────────────────────

    /// Send the confirmation link. Returns whether the mailer accepted it.
    pub async fn send_email_confirmation(
        &self,
        identifier: &str,
        callback_url: &str,
    ) -> AuthResult<bool> {
        let user = self.resolve(identifier).await?;
        self.dispatch_confirmation(&user, callback_url).await
    }

    // ── Queries ─────────────────────────────────────────────────

    /// `false` for unknown users.
    pub async fn is_in_role(&self, user_id: &str, role: &str) -> AuthResult<bool> {
        let Some(user) = self.directory.find_by_id(user_id).await? else {
            return Ok(false);
        };
        let roles = self.directory.roles_of(&user).await?;
        Ok(roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
    }

    // ── Helpers ─────────────────────────────────────────────────

    /// Username first, then email.
    async fn resolve(&self, identifier: &str) -> AuthResult<UserRecord> {
        let identifier = identifier.trim();

        if let Some(user) = self.directory.find_by_username(identifier).await? {
            return Ok(user);
        }

        self.directory
            .find_by_email(identifier)
            .await?
            .ok_or_else(|| AuthError::NotFound(identifier.to_string()))
    }

    async fn issue_token(&self, user: &UserRecord, password: &str) -> AuthResult<(String, Vec<String>)> {
        if user.is_locked_out(Utc::now()) {
            warn!(user_id = %user.id, "Authentication refused, account locked");
            return Err(AuthError::AccountLocked);
        }
        if !user.email_confirmed {
            return Err(AuthError::UnconfirmedAccount);
        }
        if !self.directory.verify_password(user, password).await? {
            info!(user_id = %user.id, "Authentication failed, wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let roles = self.directory.roles_of(user).await?;
        let claims = AuthClaims::new(&user.email, &user.username, &roles, &self.jwt_config);
        let token = create_token(&claims, &self.jwt_config)?;

        info!(user_id = %user.id, username = %user.username, jti = %claims.jti, "Token issued");
        Ok((token, roles))
    }

    async fn dispatch_confirmation(&self, user: &UserRecord, callback_url: &str) -> AuthResult<bool> {
        if user.is_locked_out(Utc::now()) {
            return Err(AuthError::AccountLocked);
        }

        let message = EmailMessage {
            to: user.email.clone(),
            subject: self.confirmation_subject.clone(),
            html_body: confirmation_body(callback_url),
        };
        Ok(self.mailer.send(message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;

    use crate::domain::DomainResult;
    use crate::infrastructure::crypto::jwt::verify_token;
    use crate::infrastructure::mail::testing::RecordingMailer;
    use crate::infrastructure::storage::InMemoryUserDirectory;

    const CALLBACK: &str = "https://warehouse.example/confirm?token=abc&user=1";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret-for-hs512-signing".into(),
            issuer: "warehouse-auth".into(),
            audience: "warehouse-bridge".into(),
        }
    }

    fn record(username: &str, email: &str, confirmed: bool) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            full_name: Some("Alice Doe".into()),
            avatar: Some("avatars/alice.png".into()),
            address: None,
            birthday: None,
            phone_number: None,
            email_confirmed: confirmed,
            lockout_enabled: true,
            lockout_end: None,
            access_failed_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(username: &str, email: &str, password: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.into(),
            email: email.into(),
            full_name: Some("New Customer".into()),
            avatar: None,
            address: Some("1 Dock Road".into()),
            birthday: None,
            phone_number: Some("+1-555-0101".into()),
            password: password.into(),
        }
    }

    struct Fixture {
        directory: Arc<InMemoryUserDirectory>,
        mailer: Arc<RecordingMailer>,
        service: AuthService,
    }

    fn fixture_with(directory: InMemoryUserDirectory, mailer: RecordingMailer) -> Fixture {
        let directory = Arc::new(directory);
        let mailer = Arc::new(mailer);
        let service = AuthService::new(directory.clone(), mailer.clone(), jwt_config());
        Fixture {
            directory,
            mailer,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(InMemoryUserDirectory::new(), RecordingMailer::accepting())
    }

    /// alice / a@x.com, confirmed, unlocked, role Customer, password "Pw1!"
    fn with_alice(f: &Fixture) -> UserRecord {
        let alice = record("alice", "a@x.com", true);
        f.directory.insert_user(alice.clone(), "Pw1!", &["Customer"]).unwrap();
        alice
    }

    #[tokio::test]
    async fn login_returns_profile_roles_and_token() {
        let f = fixture();
        let alice = with_alice(&f);

        let result = f.service.login("alice", "Pw1!", CALLBACK).await.unwrap();

        assert_eq!(result.id, alice.id);
        assert_eq!(result.username, "alice");
        assert_eq!(result.email, "a@x.com");
        assert_eq!(result.full_name.as_deref(), Some("Alice Doe"));
        assert_eq!(result.avatar.as_deref(), Some("avatars/alice.png"));
        assert_eq!(result.roles, vec!["Customer"]);
        assert!(!result.token.is_empty());
        assert!(f.mailer.messages().is_empty());
    }

    #[tokio::test]
    async fn login_accepts_email_as_identifier() {
        let f = fixture();
        with_alice(&f);

        let result = f.service.login(" A@X.com ", "Pw1!", CALLBACK).await.unwrap();
        assert_eq!(result.username, "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let f = fixture();
        with_alice(&f);

        let err = f.service.authenticate("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = f.service.login("alice", "wrong", CALLBACK).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let f = fixture();
        with_alice(&f);

        let err = f.service.authenticate("nobody", "Pw1!").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(ref id) if id == "nobody"));

        let err = f.service.login("nobody@x.com", "Pw1!", CALLBACK).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));

        let err = f.service.send_email_confirmation("nobody", CALLBACK).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn unconfirmed_login_sends_confirmation_then_fails() {
        let f = fixture();
        let bob = record("bob", "b@x.com", false);
        f.directory.insert_user(bob, "Secret1!", &["Customer"]).unwrap();

        for password in ["Secret1!", "wrong"] {
            let err = f.service.login("bob", password, CALLBACK).await.unwrap_err();
            assert!(matches!(err, AuthError::UnconfirmedAccount));
        }

        let messages = f.mailer.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].to, "b@x.com");
        assert_eq!(messages[0].subject, CONFIRMATION_SUBJECT);
        assert!(messages[0]
            .html_body
            .contains("https://warehouse.example/confirm?token=abc&amp;user=1"));
    }

    #[tokio::test]
    async fn unconfirmed_login_fails_even_when_mail_is_rejected() {
        let f = fixture_with(InMemoryUserDirectory::new(), RecordingMailer::rejecting());
        f.directory
            .insert_user(record("bob", "b@x.com", false), "Secret1!", &[])
            .unwrap();

        let err = f.service.login("bob", "Secret1!", CALLBACK).await.unwrap_err();
        assert!(matches!(err, AuthError::UnconfirmedAccount));
        assert_eq!(f.mailer.messages().len(), 1);
    }

    #[tokio::test]
    async fn locked_unconfirmed_login_reports_lockout() {
        let f = fixture();
        let bob = record("bob", "b@x.com", false);
        f.directory.insert_user(bob.clone(), "Pw1!", &["Customer"]).unwrap();
        f.directory
            .set_lockout_end(&bob.id, Some(Utc::now() + Duration::hours(1)))
            .unwrap();

        let err = f.service.login("bob", "Pw1!", CALLBACK).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
        assert!(f.mailer.messages().is_empty());
    }

    #[tokio::test]
    async fn login_trims_password_but_authenticate_does_not() {
        let f = fixture();
        with_alice(&f);

        let result = f.service.login(" alice ", "  Pw1! ", CALLBACK).await.unwrap();
        assert_eq!(result.username, "alice");

        let err = f.service.authenticate("alice", "  Pw1! ").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn authenticate_rejects_unconfirmed_account() {
        let f = fixture();
        f.directory
            .insert_user(record("bob", "b@x.com", false), "Secret1!", &[])
            .unwrap();

        let err = f.service.authenticate("bob", "Secret1!").await.unwrap_err();
        assert!(matches!(err, AuthError::UnconfirmedAccount));
        assert!(f.mailer.messages().is_empty());
    }

    #[tokio::test]
    async fn future_lockout_blocks_correct_password() {
        let f = fixture();
        let alice = with_alice(&f);
        f.directory
            .set_lockout_end(&alice.id, Some(Utc::now() + Duration::hours(1)))
            .unwrap();

        let err = f.service.authenticate("alice", "Pw1!").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        let err = f.service.send_email_confirmation("alice", CALLBACK).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
        assert!(f.mailer.messages().is_empty());
    }

    #[tokio::test]
    async fn expired_lockout_no_longer_blocks() {
        let f = fixture();
        let alice = with_alice(&f);
        f.directory
            .set_lockout_end(&alice.id, Some(Utc::now() - Duration::minutes(1)))
            .unwrap();

        assert!(f.service.authenticate("alice", "Pw1!").await.is_ok());
    }

    #[tokio::test]
    async fn repeated_wrong_passwords_lock_the_account() {
        let f = fixture();
        with_alice(&f);

        for _ in 0..5 {
            let err = f.service.authenticate("alice", "wrong").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = f.service.authenticate("alice", "Pw1!").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
    }

    #[tokio::test]
    async fn token_carries_exactly_the_assigned_roles() {
        let f = fixture();
        let carol = record("carol", "c@x.com", true);
        f.directory
            .insert_user(carol.clone(), "Pw1!", &["Customer", "Admin"])
            .unwrap();

        let token = f.service.authenticate("carol", "Pw1!").await.unwrap();
        let claims = verify_token(&token, &jwt_config()).unwrap();

        assert_eq!(claims.role, vec!["Admin", "Customer"]);
        assert_eq!(claims.unique_name, "carol");
        assert_eq!(claims.email, "c@x.com");
        assert_eq!(claims.iss, "warehouse-auth");
        assert_eq!(claims.aud, "warehouse-bridge");
        assert!(!claims.jti.is_empty());
    }

    #[tokio::test]
    async fn token_without_roles_has_no_role_claims() {
        let f = fixture();
        f.directory
            .insert_user(record("dave", "d@x.com", true), "Pw1!", &[])
            .unwrap();

        let token = f.service.authenticate("dave", "Pw1!").await.unwrap();
        assert!(verify_token(&token, &jwt_config()).unwrap().role.is_empty());
    }

    #[tokio::test]
    async fn registered_account_is_customer_and_unconfirmed() {
        let f = fixture();

        let outcome = f
            .service
            .register(registration("erin", "e@x.com", "Secret1!"))
            .await
            .unwrap();
        let RegisterOutcome::Registered(user) = outcome else {
            panic!("registration should succeed");
        };

        assert!(f.service.is_in_role(&user.id, "Customer").await.unwrap());
        let err = f.service.authenticate("erin", "Secret1!").await.unwrap_err();
        assert!(matches!(err, AuthError::UnconfirmedAccount));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_as_data() {
        let f = fixture();
        with_alice(&f);

        let outcome = f
            .service
            .register(registration("alice2", "a@x.com", "Secret1!"))
            .await
            .unwrap();

        match outcome {
            RegisterOutcome::Rejected(errors) => {
                assert!(errors.contains(&"Email 'a@x.com' is already taken.".to_string()));
            }
            RegisterOutcome::Registered(_) => panic!("duplicate email must be rejected"),
        }
        assert_eq!(f.directory.len(), 1);
        assert!(f.directory.find_by_username("alice2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_role_assignment_rolls_back_the_account() {
        let f = fixture_with(InMemoryUserDirectory::with_roles(&[]), RecordingMailer::accepting());

        let err = f
            .service
            .register(registration("frank", "f@x.com", "Secret1!"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::RegistrationFailed));
        assert!(f.directory.find_by_email("f@x.com").await.unwrap().is_none());
        assert!(f.directory.is_empty());
    }

    /// Directory whose deletes always fail.
    struct UndeletableDirectory(InMemoryUserDirectory);

    #[async_trait]
    impl UserDirectory for UndeletableDirectory {
        async fn find_by_username(&self, username: &str) -> DomainResult<Option<UserRecord>> {
            self.0.find_by_username(username).await
        }
        async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>> {
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: &str) -> DomainResult<Option<UserRecord>> {
            self.0.find_by_id(id).await
        }
        async fn create(&self, dto: CreateUserDto) -> DomainResult<UserRecord> {
            self.0.create(dto).await
        }
        async fn delete(&self, _user: &UserRecord) -> DomainResult<()> {
            Err(DomainError::Storage("disk full".into()))
        }
        async fn assign_role(&self, user: &UserRecord, role: &str) -> DomainResult<()> {
            self.0.assign_role(user, role).await
        }
        async fn roles_of(&self, user: &UserRecord) -> DomainResult<Vec<String>> {
            self.0.roles_of(user).await
        }
        async fn verify_password(&self, user: &UserRecord, password: &str) -> DomainResult<bool> {
            self.0.verify_password(user, password).await
        }
    }

    #[tokio::test]
    async fn failed_rollback_reports_inconsistent_state() {
        let directory = Arc::new(UndeletableDirectory(InMemoryUserDirectory::with_roles(&[])));
        let service = AuthService::new(
            directory.clone(),
            Arc::new(RecordingMailer::accepting()),
            jwt_config(),
        );

        let err = service
            .register(registration("gina", "g@x.com", "Secret1!"))
            .await
            .unwrap_err();

        let user_id = match err {
            AuthError::InconsistentState { user_id } => user_id,
            other => panic!("expected inconsistent state, got {other:?}"),
        };
        let left_over = directory.find_by_email("g@x.com").await.unwrap().unwrap();
        assert_eq!(left_over.id, user_id);
    }

    #[tokio::test]
    async fn send_confirmation_reports_mailer_result() {
        let f = fixture_with(InMemoryUserDirectory::new(), RecordingMailer::rejecting());
        with_alice(&f);
        assert!(!f.service.send_email_confirmation("alice", CALLBACK).await.unwrap());

        let f = fixture();
        with_alice(&f);
        assert!(f.service.send_email_confirmation("a@x.com", CALLBACK).await.unwrap());
        assert_eq!(f.mailer.messages()[0].to, "a@x.com");
    }

    #[tokio::test]
    async fn confirmation_subject_is_configurable() {
        let f = fixture();
        with_alice(&f);
        let service = AuthService::new(f.directory.clone(), f.mailer.clone(), jwt_config())
            .with_confirmation_subject("Welcome to the warehouse");

        service.send_email_confirmation("alice", CALLBACK).await.unwrap();
        assert_eq!(f.mailer.messages()[0].subject, "Welcome to the warehouse");
    }

    #[tokio::test]
    async fn is_in_role_is_false_for_unknown_user_or_role() {
        let f = fixture();
        let alice = with_alice(&f);

        assert!(f.service.is_in_role(&alice.id, "customer").await.unwrap());
        assert!(!f.service.is_in_role(&alice.id, "Admin").await.unwrap());
        assert!(!f.service.is_in_role("missing-id", "Customer").await.unwrap());
    }
}
