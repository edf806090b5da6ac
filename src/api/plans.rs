use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{
    AddPlanExercisesRequest, CreateWorkoutPlan, PlanExercise, UpdatePlanExercise, UpdateWorkoutPlan,
    WorkoutPlanResponse,
};
use crate::services::WorkoutPlanService;

#[derive(Clone)]
pub struct PlansAppState {
    pub plan_service: WorkoutPlanService,
    pub auth_service: AuthService,
}

pub fn plan_routes(db: PgPool, auth_service: AuthService) -> Router {
    let shared_state = PlansAppState {
        plan_service: WorkoutPlanService::new(db),
        auth_service: auth_service.clone(),
    };

    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route(
            "/:plan_id",
            get(get_plan).put(update_plan).patch(update_plan).delete(delete_plan),
        )
        .route("/:plan_id/exercises", post(add_exercises))
        .route(
            "/:plan_id/exercises/:exercise_id",
            put(update_plan_exercise).delete(remove_plan_exercise),
        )
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(shared_state)
}

/// The caller's plans, newest first
pub async fn list_plans(
    State(state): State<PlansAppState>,
    session: UserSession,
) -> AppResult<Json<Vec<WorkoutPlanResponse>>> {
    Ok(Json(state.plan_service.list_plans(session.user_id).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_plan(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateWorkoutPlan>, AppError>,
) -> AppResult<(StatusCode, Json<WorkoutPlanResponse>)> {
    let plan = state.plan_service.create_plan(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn get_plan(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<WorkoutPlanResponse>> {
    Ok(Json(state.plan_service.get_plan(session.user_id, plan_id).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_plan(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateWorkoutPlan>, AppError>,
) -> AppResult<Json<WorkoutPlanResponse>> {
    let plan = state.plan_service.update_plan(session.user_id, plan_id, request).await?;
    Ok(Json(plan))
}

#[tracing::instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.plan_service.delete_plan(session.user_id, plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add catalog exercises to a plan in request order
#[tracing::instrument(skip(state, request))]
pub async fn add_exercises(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<AddPlanExercisesRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Vec<PlanExercise>>)> {
    let added = state.plan_service.add_exercises(session.user_id, plan_id, request).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// Update sets/reps/rest or move an exercise to a new order
#[tracing::instrument(skip(state, request))]
pub async fn update_plan_exercise(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Path((plan_id, exercise_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePlanExercise>, AppError>,
) -> AppResult<Json<PlanExercise>> {
    let updated = state
        .plan_service
        .update_plan_exercise(session.user_id, plan_id, exercise_id, request)
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip(state))]
pub async fn remove_plan_exercise(
    State(state): State<PlansAppState>,
    session: UserSession,
    WithRejection(Path((plan_id, exercise_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<StatusCode> {
    state
        .plan_service
        .remove_plan_exercise(session.user_id, plan_id, exercise_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
