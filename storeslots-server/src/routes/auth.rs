use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use storeslots::persistence::is_valid_store_id;

use super::{err, ApiError, ApiResult};
use crate::middleware::auth::create_token;
use crate::models::auth::{TokenRequest, TokenResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/token", post(issue_token))
}

#[utoipa::path(
    post,
    path = "/api/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Editor token issued", body = TokenResponse),
        (status = 400, description = "Invalid store id or editor", body = ApiError),
        (status = 401, description = "Wrong API key", body = ApiError),
    ),
    tag = "Auth"
)]
pub(crate) async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if req.api_key != state.admin_api_key {
        tracing::warn!("Token request for store {} with a wrong API key", req.store_id);
        return Err(err(StatusCode::UNAUTHORIZED, "Invalid API key"));
    }
    if !is_valid_store_id(&req.store_id) {
        return Err(err(StatusCode::BAD_REQUEST, "Invalid store id"));
    }
    let editor = req.editor.trim();
    if editor.is_empty() || editor.len() > 128 {
        return Err(err(StatusCode::BAD_REQUEST, "Editor name must be 1-128 characters"));
    }

    let (token, expires_at) = create_token(editor, &req.store_id, &state.jwt_secret)
        .map_err(|_| err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token"))?;

    tracing::info!("Issued editor token: store={}, editor={}", req.store_id, editor);
    Ok(Json(TokenResponse {
        token,
        store_id: req.store_id,
        expires_at: expires_at as i64,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::middleware::auth::validate_token;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn issues_store_scoped_tokens() {
        let state = state();
        let resp = send(
            &state,
            "POST",
            "/api/auth/token",
            None,
            Some(json!({ "apiKey": API_KEY, "storeId": "store-1", "editor": "ana" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["storeId"], "store-1");
        let claims = validate_token(body["token"].as_str().unwrap(), SECRET).unwrap();
        assert_eq!(claims.store_id, "store-1");
        assert_eq!(claims.sub, "ana");
    }

    #[tokio::test]
    async fn rejects_bad_key_and_bad_input() {
        let state = state();
        let resp = send(
            &state,
            "POST",
            "/api/auth/token",
            None,
            Some(json!({ "apiKey": "nope", "storeId": "store-1", "editor": "ana" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(
            &state,
            "POST",
            "/api/auth/token",
            None,
            Some(json!({ "apiKey": API_KEY, "storeId": "../etc", "editor": "ana" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &state,
            "POST",
            "/api/auth/token",
            None,
            Some(json!({ "apiKey": API_KEY, "storeId": "store-1", "editor": "  " })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
