//! Bearer token authentication middleware for Axum

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::domain::ADMIN_ROLE;
use crate::infrastructure::crypto::jwt::{verify_token, AuthClaims, JwtConfig};
use crate::interfaces::http::common::ApiResponse;

/// Why a request was turned away before reaching its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    InsufficientPermissions,
}

impl IntoResponse for TokenRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authentication token"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid authentication token"),
            Self::ExpiredToken => (StatusCode::UNAUTHORIZED, "Token has expired"),
            Self::InsufficientPermissions => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Caller identity taken from a verified token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: AuthClaims) -> Self {
        Self {
            username: claims.unique_name,
            email: claims.email,
            roles: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects requests without a valid bearer token and stores the caller as
/// an [`AuthenticatedUser`] extension.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return TokenRejection::MissingToken.into_response();
    };

    let Some(token) = extract_token(auth_header) else {
        return TokenRejection::InvalidToken.into_response();
    };

    match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) if claims.is_expired() => TokenRejection::ExpiredToken.into_response(),
        Ok(claims) => {
            request
                .extensions_mut()
                .insert(AuthenticatedUser::from_claims(claims));
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Bearer token rejected");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    TokenRejection::ExpiredToken.into_response()
                }
                _ => TokenRejection::InvalidToken.into_response(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(extract_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_token("Bearer "), None);
    }

    #[test]
    fn admin_check_ignores_case() {
        let user = AuthenticatedUser {
            username: "root".into(),
            email: "root@x.com".into(),
            roles: vec!["admin".into()],
            token_id: "t".into(),
            expires_at: 0,
        };
        assert!(user.is_admin());
        assert!(!user.has_role("Customer"));
    }
}
