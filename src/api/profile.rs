use axum::{extract::State, middleware, response::Json, routing::{get, put}, Router};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{FitnessProfileResponse, UpdateFitnessProfile};
use crate::services::ProfileService;

#[derive(Clone)]
pub struct ProfileAppState {
    pub profile_service: ProfileService,
    pub auth_service: AuthService,
}

pub fn profile_routes(db: PgPool, auth_service: AuthService) -> Router {
    let shared_state = ProfileAppState {
        profile_service: ProfileService::new(db),
        auth_service: auth_service.clone(),
    };

    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/update", put(update_profile))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(shared_state)
}

/// The caller's fitness profile, with age derived from the birthday
#[tracing::instrument(skip(state))]
pub async fn get_profile(
    State(state): State<ProfileAppState>,
    session: UserSession,
) -> AppResult<Json<FitnessProfileResponse>> {
    let profile = state.profile_service.get_profile(session.user_id).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, update))]
pub async fn update_profile(
    State(state): State<ProfileAppState>,
    session: UserSession,
    WithRejection(Json(update), _): WithRejection<Json<UpdateFitnessProfile>, AppError>,
) -> AppResult<Json<FitnessProfileResponse>> {
    let profile = state.profile_service.update_profile(session.user_id, update).await?;
    Ok(Json(profile))
}
