use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use storeslots::persistence::ConfigKey;
use storeslots::render::{self, html::escape_html, RenderMode};

use super::{err, page_path, store_err, ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/storefront/{store_id}/{page_type}", get(storefront_page))
}

#[utoipa::path(
    get,
    path = "/storefront/{store_id}/{page_type}",
    params(
        ("store_id" = String, Path, description = "Store id"),
        ("page_type" = String, Path, description = "Page type"),
    ),
    responses(
        (status = 200, description = "Published page rendered as HTML", body = String, content_type = "text/html"),
        (status = 404, description = "Nothing published", body = ApiError),
    ),
    tag = "Storefront"
)]
pub(crate) async fn storefront_page(
    State(state): State<AppState>,
    Path((store_id, page_type)): Path<(String, String)>,
) -> ApiResult<Html<String>> {
    let page_type = page_path(&store_id, &page_type)?;
    let stored = state
        .store
        .fetch(&ConfigKey::published(&store_id, page_type))
        .await
        .map_err(store_err)?
        .ok_or_else(|| err(StatusCode::NOT_FOUND, "No published configuration"))?;

    let (slots, metadata) = stored.configuration.into_store().map_err(|e| {
        tracing::error!("Published {}/{} is not a valid tree: {}", store_id, page_type, e);
        err(StatusCode::INTERNAL_SERVER_ERROR, "Stored configuration is invalid")
    })?;

    let body = render::to_html(&render::render_page(&slots, &RenderMode::Live));
    let title = metadata.page_name.unwrap_or_else(|| page_type.to_string());
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<main class=\"storefront storefront-{}\">{}</main>\n</body>\n</html>\n",
        escape_html(&title),
        page_type,
        body
    )))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use storeslots::persistence::{Baseline, PageType};

    use crate::routes::test_support::*;

    #[tokio::test]
    async fn renders_published_page_without_editor_markup() {
        let state = state();
        let resp = send(&state, "GET", "/storefront/store-1/success", None, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let token = token("store-1");
        let document = Baseline::BuiltIn.resolve(PageType::Success).unwrap();
        send(
            &state,
            "PUT",
            "/api/configurations/draft/store-1/success",
            Some(&token),
            Some(json!({ "configuration": document })),
        )
        .await;
        send(
            &state,
            "POST",
            "/api/configurations/publish/store-1/success",
            Some(&token),
            None,
        )
        .await;

        let resp = send(&state, "GET", "/storefront/store-1/success", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("<title>Order confirmation</title>"));
        assert!(html.contains("Thank you for your order!"));
        assert!(html.contains("<div data-order-details></div>"));
        assert!(!html.contains("slot-editable"));
        assert!(!html.contains("draggable"));
    }
}
