//! JWT Token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issued tokens are valid for one day and are never renewed.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Signing algorithm for every issued token.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS512;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Issuer claim
    pub issuer: String,
    /// Audience claim
    pub audience: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthClaims {
    pub email: String,
    /// Username
    pub unique_name: String,
    /// Unique token id
    pub jti: String,
    /// One entry per assigned role
    #[serde(default)]
    pub role: Vec<String>,
    pub iss: String,
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AuthClaims {
    /// Build claims for a user with a fresh token id.
    pub fn new(email: &str, username: &str, roles: &[String], config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(TOKEN_LIFETIME_HOURS);

        Self {
            email: email.to_string(),
            unique_name: username.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            role: roles.to_vec(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Sign claims into a compact token.
pub fn create_token(
    claims: &AuthClaims,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(TOKEN_ALGORITHM),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature, issuer, audience and expiry, then decode the claims.
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<AuthClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);

    let token_data = decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-with-enough-entropy-for-hs512".into(),
            issuer: "warehouse-auth".into(),
            audience: "warehouse-bridge".into(),
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let config = config();
        let roles = vec!["Customer".to_string(), "Admin".to_string()];
        let claims = AuthClaims::new("a@x.com", "alice", &roles, &config);
        let token = create_token(&claims, &config).unwrap();

        assert_eq!(token.split('.').count(), 3);

        let decoded = verify_token(&token, &config).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, TOKEN_LIFETIME_HOURS * 3600);
        assert_eq!(decoded.role, roles);
        assert!(!decoded.is_expired());
    }

    #[test]
    fn header_uses_hs512() {
        let config = config();
        let claims = AuthClaims::new("a@x.com", "alice", &[], &config);
        let token = create_token(&claims, &config).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn every_token_gets_its_own_id() {
        let config = config();
        let a = AuthClaims::new("a@x.com", "alice", &[], &config);
        let b = AuthClaims::new("a@x.com", "alice", &[], &config);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn rejects_foreign_audience_and_secret() {
        let config = config();
        let claims = AuthClaims::new("a@x.com", "alice", &[], &config);
        let token = create_token(&claims, &config).unwrap();

        let other_audience = JwtConfig {
            audience: "someone-else".into(),
            ..config.clone()
        };
        assert!(verify_token(&token, &other_audience).is_err());

        let other_secret = JwtConfig {
            secret: "another-secret".into(),
            ..config
        };
        assert!(verify_token(&token, &other_secret).is_err());
    }

    #[test]
    fn test_invalid_token() {
        assert!(verify_token("invalid-token", &config()).is_err());
    }
}
