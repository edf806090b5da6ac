use axum::{
    extract::{Query, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{AnalyticsQuery, FitnessAnalytics, StreakSummary};
use crate::services::{AnalyticsService, StreakService};

#[derive(Clone)]
pub struct AnalyticsAppState {
    pub analytics_service: AnalyticsService,
    pub streak_service: StreakService,
    pub auth_service: AuthService,
}

pub fn analytics_routes(db: PgPool, auth_service: AuthService) -> Router {
    let shared_state = AnalyticsAppState {
        analytics_service: AnalyticsService::new(db.clone()),
        streak_service: StreakService::new(db),
        auth_service: auth_service.clone(),
    };

    Router::new()
        .route("/", get(get_analytics))
        .route("/streak", get(get_streak))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(shared_state)
}

/// Workout totals, accuracy trends and the current streak
#[tracing::instrument(skip(state, query))]
pub async fn get_analytics(
    State(state): State<AnalyticsAppState>,
    session: UserSession,
    WithRejection(Query(query), _): WithRejection<Query<AnalyticsQuery>, AppError>,
) -> AppResult<Json<FitnessAnalytics>> {
    let analytics = state
        .analytics_service
        .fitness_analytics(session.user_id, &query)
        .await?;
    Ok(Json(analytics))
}

pub async fn get_streak(
    State(state): State<AnalyticsAppState>,
    session: UserSession,
) -> AppResult<Json<StreakSummary>> {
    Ok(Json(state.streak_service.get_streak(session.user_id).await?))
}
