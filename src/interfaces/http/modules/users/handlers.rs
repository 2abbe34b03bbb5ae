//! User API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::warn;

use super::dto::RoleCheckResponse;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::auth::{auth_failure, AuthHandlerState};

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/roles/{role}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "User ID"),
        ("role" = String, Path, description = "Role name, case-insensitive")
    ),
    responses(
        (status = 200, description = "Membership result, false for unknown users", body = ApiResponse<RoleCheckResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn check_role(
    State(state): State<AuthHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<Json<ApiResponse<RoleCheckResponse>>, (StatusCode, Json<ApiResponse<RoleCheckResponse>>)> {
    if !caller.is_admin() {
        warn!(caller = %caller.username, "Role lookup refused for non-admin");
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Insufficient permissions")),
        ));
    }

    let in_role = state
        .auth_service
        .is_in_role(&user_id, &role)
        .await
        .map_err(|e| auth_failure("role_check", e))?;

    Ok(Json(ApiResponse::success(RoleCheckResponse {
        user_id,
        role,
        in_role,
    })))
}
