use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::catalogue::{CatalogueRegistry, CatalogueStore, FetchError, HttpFetcher};

use super::api::catalog::{self as catalog_handlers, FAILED_KINDS_HEADER};
use super::api_doc::ApiDoc;
use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CatalogueRegistry>,
    /// Requests dated further ahead than this are rejected.
    pub max_future: Duration,
}

pub fn build_registry(config: &Config) -> Result<CatalogueRegistry, FetchError> {
    let store = Arc::new(CatalogueStore::new(config.cache.root.clone()));
    let fetcher = Arc::new(HttpFetcher::new(config.cache.fetch_timeout)?);
    log::info!(
        "Caching {} catalogues under {}",
        config.catalogues.len(),
        store.root().display()
    );

    Ok(CatalogueRegistry::from_specs(
        config.catalogues.clone(),
        store,
        fetcher,
        config.cache_settings(),
        config.cache.fail_on_partial,
    ))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(FAILED_KINDS_HEADER)]);

    Router::new()
        .route("/", get(catalog_handlers::root))
        .route("/catalog", get(catalog_handlers::get_catalog))
        .route("/position", get(catalog_handlers::get_position))
        .route("/bulk_az_el", post(catalog_handlers::bulk_az_el))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(catalog_handlers::not_found)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let registry = build_registry(&config).map_err(std::io::Error::other)?;
    let state = AppState {
        registry: Arc::new(registry),
        max_future: config.web.max_future,
    };

    log::info!("Starting server on {}", config.web.bind);

    let listener = tokio::net::TcpListener::bind(&config.web.bind).await?;
    axum::serve(listener, router(state)).await
}
