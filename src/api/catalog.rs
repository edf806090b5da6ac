use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::{CatalogEntry, CatalogKind, ExerciseDetail, ExerciseQuery};
use crate::services::CatalogService;

#[derive(Clone)]
pub struct CatalogAppState {
    pub catalog_service: CatalogService,
    pub auth_service: AuthService,
}

pub fn catalog_routes(db: PgPool, auth_service: AuthService) -> Router {
    let shared_state = CatalogAppState {
        catalog_service: CatalogService::new(db),
        auth_service: auth_service.clone(),
    };

    Router::new()
        .route("/exercises", get(list_exercises))
        .route("/exercises/:exercise_id", get(get_exercise))
        .route("/muscle-groups", get(list_muscle_groups))
        .route("/equipment", get(list_equipment))
        .route("/training-styles", get(list_training_styles))
        .route("/environments", get(list_environments))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(shared_state)
}

/// Exercises filtered by name search, muscle group, equipment or training style
pub async fn list_exercises(
    State(state): State<CatalogAppState>,
    WithRejection(Query(query), _): WithRejection<Query<ExerciseQuery>, AppError>,
) -> AppResult<Json<Vec<ExerciseDetail>>> {
    let exercises = state.catalog_service.list_exercises(&query).await?;
    Ok(Json(exercises))
}

pub async fn get_exercise(
    State(state): State<CatalogAppState>,
    WithRejection(Path(exercise_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ExerciseDetail>> {
    let exercise = state.catalog_service.get_exercise(exercise_id).await?;
    Ok(Json(exercise))
}

pub async fn list_muscle_groups(State(state): State<CatalogAppState>) -> AppResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog_service.list(CatalogKind::MuscleGroup).await?))
}

pub async fn list_equipment(State(state): State<CatalogAppState>) -> AppResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog_service.list(CatalogKind::Equipment).await?))
}

pub async fn list_training_styles(State(state): State<CatalogAppState>) -> AppResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog_service.list(CatalogKind::TrainingStyle).await?))
}

pub async fn list_environments(State(state): State<CatalogAppState>) -> AppResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog_service.list(CatalogKind::WorkoutEnvironment).await?))
}
