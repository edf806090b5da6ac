use axum::{routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

use super::analytics::analytics_routes;
use super::auth::auth_routes;
use super::catalog::catalog_routes;
use super::health::health_check;
use super::plans::plan_routes;
use super::profile::profile_routes;
use super::sessions::session_routes;
use crate::auth::{cors_layer, security_headers_layer, AuthService};
use crate::config::AppConfig;

pub fn create_routes(db: PgPool, config: AppConfig) -> Router {
    let auth_service = AuthService::new(db.clone(), &config);
    let cors = cors_layer(&config);
    let config = Arc::new(config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes(auth_service.clone(), config))
        .nest("/api/profile", profile_routes(db.clone(), auth_service.clone()))
        .nest("/api/catalog", catalog_routes(db.clone(), auth_service.clone()))
        .nest("/api/plans", plan_routes(db.clone(), auth_service.clone()))
        .nest("/api/sessions", session_routes(db.clone(), auth_service.clone()))
        .nest("/api/analytics", analytics_routes(db, auth_service))
        .layer(security_headers_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// The full service. Trailing slashes are trimmed before routing, so
/// `/api/plans/` and `/api/plans` reach the same handler.
pub fn create_app(db: PgPool, config: AppConfig) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_routes(db, config))
}
