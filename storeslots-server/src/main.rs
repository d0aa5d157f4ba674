mod config;
mod db;
mod middleware;
mod models;
mod routes;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::db::ConfigStore;

#[derive(Clone)]
pub struct AppState {
    pub store: ConfigStore,
    pub jwt_secret: String,
    pub admin_api_key: String,
    /// Per-store broadcast channels for WebSocket change events.
    /// Key: store_id, Value: sender that broadcasts (origin_session_id, json_payload).
    pub store_channels: Arc<DashMap<String, broadcast::Sender<(Uuid, String)>>>,
}

impl AppState {
    pub fn new(store: ConfigStore, jwt_secret: &str, admin_api_key: &str) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.to_string(),
            admin_api_key: admin_api_key.to_string(),
            store_channels: Arc::new(DashMap::new()),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::issue_token,
        routes::configurations::get_published,
        routes::configurations::get_draft,
        routes::configurations::save_draft,
        routes::configurations::discard_draft,
        routes::configurations::publish,
        routes::storefront::storefront_page,
    ),
    components(schemas(
        models::auth::TokenRequest,
        models::auth::TokenResponse,
        models::configuration::ConfigurationResponse,
        models::configuration::SaveDraftBody,
        routes::ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Editor tokens"),
        (name = "Configurations", description = "Draft and published page configurations"),
        (name = "Storefront", description = "Live rendering of published pages")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storeslots_server=debug,storeslots=info,tower_http=debug".into()),
        )
        .init();

    let config = config::Config::from_env();

    let store = match &config.database_url {
        Some(url) => ConfigStore::connect(url)
            .await
            .expect("Failed to connect to database"),
        None => {
            tracing::warn!("DATABASE_URL not set, configurations are kept in memory");
            ConfigStore::memory()
        }
    };

    let cors = if config.cors_origins.is_empty() || config.cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
    };

    tracing::info!("Configuration store: {}", store.kind());
    let state = AppState::new(store, &config.jwt_secret, &config.admin_api_key);

    let app = routes::api_router(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("Listening on {}", config.listen_addr);
    tracing::info!("Swagger UI at http://{}/docs/", config.listen_addr);
    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        assert!(paths.contains(&"/api/auth/token"));
        assert!(paths.contains(&"/api/configurations/draft/{store_id}/{page_type}"));
        assert!(paths.contains(&"/api/configurations/publish/{store_id}/{page_type}"));
        assert!(paths.contains(&"/storefront/{store_id}/{page_type}"));
    }
}
