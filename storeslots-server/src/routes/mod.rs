pub mod auth;
pub mod configurations;
pub mod storefront;
pub mod ws;

use axum::{http::StatusCode, Json, Router};
use storeslots::persistence::{is_valid_store_id, PageType};

use crate::db::StoreError;
use crate::middleware::auth::AuthEditor;
use crate::AppState;

#[derive(serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiError {
    error: String,
    /// Set on 409: the version currently stored
    #[serde(skip_serializing_if = "Option::is_none")]
    current_version: Option<i64>,
}

pub(crate) type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub(crate) fn err(status: StatusCode, msg: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: msg.to_string(),
            current_version: None,
        }),
    )
}

pub(crate) fn store_err(e: StoreError) -> (StatusCode, Json<ApiError>) {
    match e {
        StoreError::NotFound => err(StatusCode::NOT_FOUND, "No draft to publish"),
        StoreError::Conflict { expected, actual } => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: format!(
                    "Draft changed since version {} (now {})",
                    expected,
                    actual.map_or_else(|| "absent".to_string(), |v| v.to_string())
                ),
                current_version: actual,
            }),
        ),
        StoreError::Database(msg) => {
            tracing::error!("Configuration store error: {}", msg);
            err(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

/// Validate the `{storeId}/{pageType}` path segments.
pub(crate) fn page_path(store_id: &str, page_type: &str) -> ApiResult<PageType> {
    if !is_valid_store_id(store_id) {
        return Err(err(StatusCode::BAD_REQUEST, "Invalid store id"));
    }
    page_type
        .parse()
        .map_err(|_| err(StatusCode::NOT_FOUND, "Unknown page type"))
}

pub(crate) fn authorize(auth: &AuthEditor, store_id: &str) -> ApiResult<()> {
    if auth.can_edit(store_id) {
        Ok(())
    } else {
        Err(err(StatusCode::FORBIDDEN, "Token not valid for this store"))
    }
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/configurations", configurations::router())
        .merge(ws::router())
        .merge(storefront::router())
        .with_state(state)
}
