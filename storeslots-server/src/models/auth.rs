use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// Admin API key configured on the server
    pub api_key: String,
    /// Store the token will be scoped to
    pub store_id: String,
    /// Editor name recorded as `updatedBy` on writes
    pub editor: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// JWT token
    pub token: String,
    pub store_id: String,
    /// Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Editor name
    pub sub: String,
    pub store_id: String,
    /// Per-token session id; change events are not echoed back to it.
    pub sid: Uuid,
    pub exp: usize,
    pub iat: usize,
}
