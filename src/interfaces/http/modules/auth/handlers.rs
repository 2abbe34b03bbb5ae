//! Authentication API handlers
//!
//! Thin wrappers over [`AuthService`]; all workflow rules live there.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::error;

use super::dto::{
    ConfirmationRequest, ConfirmationResponse, CurrentUser, LoginRequest, LoginResponse,
    RegisterRequest, RegisteredUser, TokenRequest, TokenResponse,
};
use crate::application::{AuthError, AuthService, RegisterOutcome};
use crate::infrastructure::crypto::jwt::TOKEN_LIFETIME_HOURS;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::metrics::record_auth_outcome;

#[derive(Clone)]
pub struct AuthHandlerState {
    pub auth_service: Arc<AuthService>,
}

type HandlerError<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::AccountLocked => StatusCode::LOCKED,
        AuthError::UnconfirmedAccount => StatusCode::FORBIDDEN,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::RegistrationFailed
        | AuthError::InconsistentState { .. }
        | AuthError::Token(_)
        | AuthError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn outcome_label(err: &AuthError) -> &'static str {
    match err {
        AuthError::NotFound(_) => "not_found",
        AuthError::AccountLocked => "locked",
        AuthError::UnconfirmedAccount => "unconfirmed",
        AuthError::InvalidCredentials => "invalid_credentials",
        _ => "error",
    }
}

/// Map a workflow failure to its HTTP response.
pub fn auth_failure<T>(operation: &'static str, err: AuthError) -> HandlerError<T> {
    let status = auth_error_status(&err);
    record_auth_outcome(operation, outcome_label(&err));
    if status.is_server_error() {
        error!(operation, error = %err, "Auth request failed");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Wrong password"),
        (status = 403, description = "Email not confirmed, confirmation mail resent"),
        (status = 404, description = "Unknown username or email"),
        (status = 423, description = "Account locked")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, HandlerError<LoginResponse>> {
    let result = state
        .auth_service
        .login(&request.identifier, &request.password, &request.callback_url)
        .await
        .map_err(|e| auth_failure("login", e))?;

    record_auth_outcome("login", "success");
    Ok(Json(ApiResponse::success(result.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<RegisteredUser>),
        (status = 400, description = "Rejected fields listed in `errors`"),
        (status = 500, description = "Account could not be completed")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUser>>), HandlerError<RegisteredUser>> {
    let outcome = state
        .auth_service
        .register(request.into())
        .await
        .map_err(|e| auth_failure("register", e))?;

    match outcome {
        RegisterOutcome::Registered(user) => {
            record_auth_outcome("register", "success");
            Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
        }
        RegisterOutcome::Rejected(errors) => {
            record_auth_outcome("register", "rejected");
            Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::rejected("Registration rejected", errors)),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    tag = "Authentication",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Signed bearer token", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Wrong password"),
        (status = 403, description = "Email not confirmed"),
        (status = 404, description = "Unknown username or email"),
        (status = 423, description = "Account locked")
    )
)]
pub async fn issue_token(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<TokenRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, HandlerError<TokenResponse>> {
    let token = state
        .auth_service
        .authenticate(&request.identifier, &request.password)
        .await
        .map_err(|e| auth_failure("token", e))?;

    record_auth_outcome("token", "success");
    Ok(Json(ApiResponse::success(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: TOKEN_LIFETIME_HOURS * 3600,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/confirmation",
    tag = "Authentication",
    request_body = ConfirmationRequest,
    responses(
        (status = 200, description = "Dispatch attempted", body = ApiResponse<ConfirmationResponse>),
        (status = 404, description = "Unknown username or email"),
        (status = 423, description = "Account locked")
    )
)]
pub async fn send_confirmation(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<ConfirmationRequest>,
) -> Result<Json<ApiResponse<ConfirmationResponse>>, HandlerError<ConfirmationResponse>> {
    let sent = state
        .auth_service
        .send_email_confirmation(&request.identifier, &request.callback_url)
        .await
        .map_err(|e| auth_failure("confirmation", e))?;

    record_auth_outcome("confirmation", if sent { "success" } else { "not_sent" });
    Ok(Json(ApiResponse::success(ConfirmationResponse { sent })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Identity carried by the bearer token", body = ApiResponse<CurrentUser>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<CurrentUser>> {
    Json(ApiResponse::success(user.into()))
}
