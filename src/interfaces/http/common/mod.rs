//! Shared HTTP types

mod validated_json;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

/// Standard API response wrapper
///
/// On success: `{"success": true, "data": {...}}`,
/// on failure: `{"success": false, "error": "...", "errors": [...]}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Individual problems, e.g. every rejected registration field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            errors: Vec::new(),
        }
    }

    pub fn rejected(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::error(message)
        }
    }
}
