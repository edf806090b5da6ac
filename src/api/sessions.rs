use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, patch},
    Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateWorkoutSession, ExerciseSetLog, LogSetsRequest, UpdateSetLog, UpdateWorkoutSession, WorkoutSessionResponse,
};
use crate::services::WorkoutSessionService;

#[derive(Clone)]
pub struct SessionsAppState {
    pub session_service: WorkoutSessionService,
    pub auth_service: AuthService,
}

pub fn session_routes(db: PgPool, auth_service: AuthService) -> Router {
    let shared_state = SessionsAppState {
        session_service: WorkoutSessionService::new(db),
        auth_service: auth_service.clone(),
    };

    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route(
            "/:session_id",
            get(get_session).patch(update_session).delete(delete_session),
        )
        .route("/:session_id/logs", get(list_logs).post(log_sets))
        .route("/:session_id/logs/:log_id", patch(update_log).delete(delete_log))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(shared_state)
}

pub async fn list_sessions(
    State(state): State<SessionsAppState>,
    session: UserSession,
) -> AppResult<Json<Vec<WorkoutSessionResponse>>> {
    Ok(Json(state.session_service.list_sessions(session.user_id).await?))
}

/// Start a session against one of the caller's plans
#[tracing::instrument(skip(state, request))]
pub async fn create_session(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateWorkoutSession>, AppError>,
) -> AppResult<(StatusCode, Json<WorkoutSessionResponse>)> {
    let created = state.session_service.create_session(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_session(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<WorkoutSessionResponse>> {
    Ok(Json(state.session_service.get_session(session.user_id, session_id).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_session(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateWorkoutSession>, AppError>,
) -> AppResult<Json<WorkoutSessionResponse>> {
    let updated = state
        .session_service
        .update_session(session.user_id, session_id, request)
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip(state))]
pub async fn delete_session(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.session_service.delete_session(session.user_id, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_logs(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<Vec<ExerciseSetLog>>> {
    Ok(Json(state.session_service.list_logs(session.user_id, session_id).await?))
}

/// Record a batch of sets; repeated set numbers update the existing log
#[tracing::instrument(skip(state, request))]
pub async fn log_sets(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<LogSetsRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Vec<ExerciseSetLog>>)> {
    let logs = state
        .session_service
        .log_sets(session.user_id, session_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(logs)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_log(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path((session_id, log_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateSetLog>, AppError>,
) -> AppResult<Json<ExerciseSetLog>> {
    let log = state
        .session_service
        .update_log(session.user_id, session_id, log_id, request)
        .await?;
    Ok(Json(log))
}

#[tracing::instrument(skip(state))]
pub async fn delete_log(
    State(state): State<SessionsAppState>,
    session: UserSession,
    WithRejection(Path((session_id, log_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<StatusCode> {
    state
        .session_service
        .delete_log(session.user_id, session_id, log_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
