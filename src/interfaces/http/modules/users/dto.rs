//! User DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleCheckResponse {
    pub user_id: String,
    pub role: String,
    pub in_role: bool,
}
