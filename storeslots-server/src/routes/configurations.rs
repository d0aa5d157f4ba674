use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use storeslots::persistence::{ConfigEvent, ConfigKey};

use super::{authorize, err, page_path, store_err, ApiError, ApiResult};
use crate::middleware::auth::AuthEditor;
use crate::models::configuration::{ConfigurationResponse, SaveDraftBody};
use crate::routes::ws::notify;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/published/{store_id}/{page_type}", get(get_published))
        .route(
            "/draft/{store_id}/{page_type}",
            get(get_draft).put(save_draft).delete(discard_draft),
        )
        .route("/publish/{store_id}/{page_type}", post(publish))
}

#[utoipa::path(
    get,
    path = "/api/configurations/published/{store_id}/{page_type}",
    params(
        ("store_id" = String, Path, description = "Store id"),
        ("page_type" = String, Path, description = "Page type"),
    ),
    responses(
        (status = 200, description = "Published configuration", body = ConfigurationResponse),
        (status = 404, description = "Nothing published", body = ApiError),
    ),
    tag = "Configurations"
)]
pub(crate) async fn get_published(
    State(state): State<AppState>,
    Path((store_id, page_type)): Path<(String, String)>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let page_type = page_path(&store_id, &page_type)?;
    let stored = state
        .store
        .fetch(&ConfigKey::published(&store_id, page_type))
        .await
        .map_err(store_err)?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "No published configuration"))?;
    Ok(Json(stored.into()))
}

#[utoipa::path(
    get,
    path = "/api/configurations/draft/{store_id}/{page_type}",
    params(
        ("store_id" = String, Path, description = "Store id"),
        ("page_type" = String, Path, description = "Page type"),
    ),
    responses(
        (status = 200, description = "Draft configuration", body = ConfigurationResponse),
        (status = 403, description = "Token is for another store", body = ApiError),
        (status = 404, description = "No draft", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Configurations"
)]
pub(crate) async fn get_draft(
    State(state): State<AppState>,
    auth: AuthEditor,
    Path((store_id, page_type)): Path<(String, String)>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let page_type = page_path(&store_id, &page_type)?;
    authorize(&auth, &store_id)?;
    let stored = state
        .store
        .fetch(&ConfigKey::draft(&store_id, page_type))
        .await
        .map_err(store_err)?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "No draft"))?;
    Ok(Json(stored.into()))
}

#[utoipa::path(
    put,
    path = "/api/configurations/draft/{store_id}/{page_type}",
    params(
        ("store_id" = String, Path, description = "Store id"),
        ("page_type" = String, Path, description = "Page type"),
    ),
    request_body = SaveDraftBody,
    responses(
        (status = 200, description = "Draft saved", body = ConfigurationResponse),
        (status = 403, description = "Token is for another store", body = ApiError),
        (status = 409, description = "Draft changed since expectedVersion", body = ApiError),
        (status = 422, description = "Not a valid slot tree", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Configurations"
)]
pub(crate) async fn save_draft(
    State(state): State<AppState>,
    auth: AuthEditor,
    Path((store_id, page_type)): Path<(String, String)>,
    Json(req): Json<SaveDraftBody>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let page_type = page_path(&store_id, &page_type)?;
    authorize(&auth, &store_id)?;
    req.configuration
        .validate()
        .map_err(|e| err(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()))?;

    let stored = state
        .store
        .save_draft(
            &store_id,
            page_type,
            &req.configuration,
            req.expected_version,
            &auth.editor,
        )
        .await
        .map_err(store_err)?;

    tracing::info!(
        "Draft saved: store={}, page={}, version={}, editor={}",
        store_id,
        page_type,
        stored.version,
        auth.editor
    );
    notify(
        &state,
        &store_id,
        auth.session_id,
        &ConfigEvent::DraftSaved {
            page_type,
            version: stored.version,
            updated_by: stored.updated_by.clone(),
        },
    );
    Ok(Json(stored.into()))
}

#[utoipa::path(
    delete,
    path = "/api/configurations/draft/{store_id}/{page_type}",
    params(
        ("store_id" = String, Path, description = "Store id"),
        ("page_type" = String, Path, description = "Page type"),
    ),
    responses(
        (status = 204, description = "Draft discarded"),
        (status = 404, description = "No draft", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Configurations"
)]
pub(crate) async fn discard_draft(
    State(state): State<AppState>,
    auth: AuthEditor,
    Path((store_id, page_type)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let page_type = page_path(&store_id, &page_type)?;
    authorize(&auth, &store_id)?;
    let removed = state
        .store
        .discard_draft(&store_id, page_type)
        .await
        .map_err(store_err)?;
    if !removed {
        return Err(err(StatusCode::NOT_FOUND, "No draft"));
    }

    notify(
        &state,
        &store_id,
        auth.session_id,
        &ConfigEvent::DraftDiscarded {
            page_type,
            updated_by: Some(auth.editor),
        },
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/configurations/publish/{store_id}/{page_type}",
    params(
        ("store_id" = String, Path, description = "Store id"),
        ("page_type" = String, Path, description = "Page type"),
    ),
    responses(
        (status = 200, description = "Draft published", body = ConfigurationResponse),
        (status = 404, description = "No draft to publish", body = ApiError),
    ),
    security(("bearer" = [])),
    tag = "Configurations"
)]
pub(crate) async fn publish(
    State(state): State<AppState>,
    auth: AuthEditor,
    Path((store_id, page_type)): Path<(String, String)>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let page_type = page_path(&store_id, &page_type)?;
    authorize(&auth, &store_id)?;
    let stored = state
        .store
        .publish(&store_id, page_type, &auth.editor)
        .await
        .map_err(store_err)?;

    tracing::info!(
        "Published: store={}, page={}, version={}, editor={}",
        store_id,
        page_type,
        stored.version,
        auth.editor
    );
    notify(
        &state,
        &store_id,
        auth.session_id,
        &ConfigEvent::Published {
            page_type,
            version: stored.version,
            updated_by: stored.updated_by.clone(),
        },
    );
    Ok(Json(stored.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use storeslots::persistence::{Baseline, PageType};

    use crate::routes::test_support::*;

    fn cart_document() -> Value {
        serde_json::to_value(Baseline::BuiltIn.resolve(PageType::Cart).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn editor_routes_need_a_token_for_the_store() {
        let state = state();
        let uri = "/api/configurations/draft/store-1/cart";

        let resp = send(&state, "GET", uri, None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&state, "GET", uri, Some("not-a-jwt"), None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let other = token("store-2");
        let resp = send(&state, "GET", uri, Some(&other), None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let own = token("store-1");
        let resp = send(&state, "GET", uri, Some(&own), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_validates_and_versions_drafts() {
        let state = state();
        let token = token("store-1");
        let uri = "/api/configurations/draft/store-1/cart";

        let resp = send(
            &state,
            "PUT",
            uri,
            Some(&token),
            Some(json!({ "configuration": cart_document(), "expectedVersion": 0 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["version"], 1);
        assert_eq!(body["updatedBy"], "ana");
        assert_eq!(body["variant"], "draft");

        let resp = send(
            &state,
            "PUT",
            uri,
            Some(&token),
            Some(json!({ "configuration": cart_document(), "expectedVersion": 1 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            &state,
            "PUT",
            uri,
            Some(&token),
            Some(json!({ "configuration": cart_document(), "expectedVersion": 1 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["currentVersion"], 2);

        let dangling = json!({
            "slots": {
                "a": { "id": "a", "type": "container", "children": ["ghost"] }
            },
            "rootSlots": ["a"]
        });
        let resp = send(
            &state,
            "PUT",
            uri,
            Some(&token),
            Some(json!({ "configuration": dangling })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = send(&state, "GET", uri, Some(&token), None).await;
        assert_eq!(body_json(resp).await["version"], 2);
    }

    #[tokio::test]
    async fn publish_then_public_read() {
        let state = state();
        let token = token("store-1");

        let resp = send(
            &state,
            "POST",
            "/api/configurations/publish/store-1/cart",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(
            &state,
            "GET",
            "/api/configurations/published/store-1/cart",
            None,
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        send(
            &state,
            "PUT",
            "/api/configurations/draft/store-1/cart",
            Some(&token),
            Some(json!({ "configuration": cart_document() })),
        )
        .await;
        let resp = send(
            &state,
            "POST",
            "/api/configurations/publish/store-1/cart",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            &state,
            "GET",
            "/api/configurations/published/store-1/cart",
            None,
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["variant"], "published");
        assert_eq!(body["configuration"], cart_document());
    }

    #[tokio::test]
    async fn discard_removes_only_the_draft() {
        let state = state();
        let token = token("store-1");
        let uri = "/api/configurations/draft/store-1/home";

        let resp = send(&state, "DELETE", uri, Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        send(
            &state,
            "PUT",
            uri,
            Some(&token),
            Some(json!({ "configuration": cart_document() })),
        )
        .await;
        let resp = send(&state, "DELETE", uri, Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = send(&state, "GET", uri, Some(&token), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn recreated_draft_does_not_reuse_old_versions() {
        let state = state();
        let token = token("store-1");
        let uri = "/api/configurations/draft/store-1/home";
        let create = json!({ "configuration": cart_document(), "expectedVersion": 0 });

        let resp = send(&state, "PUT", uri, Some(&token), Some(create.clone())).await;
        assert_eq!(body_json(resp).await["version"], 1);
        send(&state, "DELETE", uri, Some(&token), None).await;

        let resp = send(&state, "PUT", uri, Some(&token), Some(create)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["version"], 2);

        let resp = send(
            &state,
            "PUT",
            uri,
            Some(&token),
            Some(json!({ "configuration": cart_document(), "expectedVersion": 1 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["currentVersion"], 2);
    }

    #[tokio::test]
    async fn bad_path_segments_are_rejected() {
        let state = state();
        let resp = send(
            &state,
            "GET",
            "/api/configurations/published/store-1/basket",
            None,
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(
            &state,
            "GET",
            "/api/configurations/published/store.1/cart",
            None,
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
