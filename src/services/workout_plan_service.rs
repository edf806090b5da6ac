use sqlx::{PgConnection, PgPool};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{
    AddPlanExercisesRequest, CreateWorkoutPlan, PlanExercise, UpdatePlanExercise, UpdateWorkoutPlan,
    WorkoutPlan, WorkoutPlanResponse,
};
use crate::services::plan_ordering::{
    insert_position, move_target, shift_for_delete, shift_for_insert, shift_for_move, ShiftRange,
};

const PLAN_COLUMNS: &str = "id, user_id, name, description, duration_minutes, difficulty_level, created_at, updated_at";

const PLAN_EXERCISE_SELECT: &str = "SELECT pe.id, pe.workout_plan_id, pe.exercise_id, e.name, pe.position, \
     pe.sets, pe.reps, pe.rest_timer
     FROM plan_exercises pe
     JOIN exercises e ON e.id = pe.exercise_id";

const PLAN_NOT_FOUND: &str = "Workout plan not found.";
const EXERCISE_NOT_IN_PLAN: &str = "Exercise not found in this plan.";
const DUPLICATE_PLAN_NAME: &str = "You already have a workout plan with this name.";

#[derive(Debug, Clone)]
pub struct WorkoutPlanService {
    db: PgPool,
}

impl WorkoutPlanService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The caller's plans, newest first
    pub async fn list_plans(&self, user_id: Uuid) -> AppResult<Vec<WorkoutPlanResponse>> {
        let plans = sqlx::query_as::<_, WorkoutPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM workout_plans WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let plan_ids: Vec<Uuid> = plans.iter().map(|plan| plan.id).collect();
        let exercises = sqlx::query_as::<_, PlanExercise>(&format!(
            "{PLAN_EXERCISE_SELECT} WHERE pe.workout_plan_id = ANY($1) ORDER BY pe.position"
        ))
        .bind(&plan_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(plans
            .into_iter()
            .map(|plan| {
                let exercises = exercises
                    .iter()
                    .filter(|exercise| exercise.workout_plan_id == plan.id)
                    .cloned()
                    .collect();
                WorkoutPlanResponse { plan, exercises }
            })
            .collect())
    }

    pub async fn create_plan(&self, user_id: Uuid, request: CreateWorkoutPlan) -> AppResult<WorkoutPlanResponse> {
        request.validate()?;

        let result = sqlx::query_as::<_, WorkoutPlan>(&format!(
            "INSERT INTO workout_plans (id, user_id, name, description, duration_minutes, difficulty_level)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.duration_minutes)
        .bind(request.difficulty_level.map(|level| level.as_str()))
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(plan) => {
                tracing::info!("Created workout plan {} for user {}", plan.id, user_id);
                Ok(WorkoutPlanResponse {
                    plan,
                    exercises: Vec::new(),
                })
            }
            Err(err) if is_unique_violation(&err) => Err(AppError::validation(DUPLICATE_PLAN_NAME)),
            Err(err) => {
                tracing::error!("Error creating workout plan: {}", err);
                Err(AppError::Internal(anyhow::anyhow!("Error creating workout plan")))
            }
        }
    }

    pub async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> AppResult<WorkoutPlanResponse> {
        let mut conn = self.db.acquire().await?;
        let plan = fetch_owned_plan(&mut conn, user_id, plan_id).await?;
        let exercises = fetch_plan_exercises(&mut conn, plan_id).await?;

        Ok(WorkoutPlanResponse { plan, exercises })
    }

    /// Partial update of the plan's own fields
    pub async fn update_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        request: UpdateWorkoutPlan,
    ) -> AppResult<WorkoutPlanResponse> {
        request.validate()?;

        let plan = sqlx::query_as::<_, WorkoutPlan>(&format!(
            "UPDATE workout_plans SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                duration_minutes = COALESCE($5, duration_minutes),
                difficulty_level = COALESCE($6, difficulty_level),
                updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(plan_id)
        .bind(user_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(&request.description)
        .bind(request.duration_minutes)
        .bind(request.difficulty_level.map(|level| level.as_str()))
        .fetch_optional(&self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::validation(DUPLICATE_PLAN_NAME)
            } else {
                AppError::Database(err)
            }
        })?
        .ok_or_else(|| AppError::not_found(PLAN_NOT_FOUND))?;

        let mut conn = self.db.acquire().await?;
        let exercises = fetch_plan_exercises(&mut conn, plan_id).await?;
        Ok(WorkoutPlanResponse { plan, exercises })
    }

    pub async fn delete_plan(&self, user_id: Uuid, plan_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM workout_plans WHERE id = $1 AND user_id = $2")
            .bind(plan_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(PLAN_NOT_FOUND));
        }

        tracing::info!("Deleted workout plan {} for user {}", plan_id, user_id);
        Ok(())
    }

    /// Add catalog exercises to a plan in request order, shifting existing
    /// exercises to make room. The whole batch commits or none of it does.
    pub async fn add_exercises(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        request: AddPlanExercisesRequest,
    ) -> AppResult<Vec<PlanExercise>> {
        if request.exercises.is_empty() {
            return Err(AppError::validation("No exercises provided."));
        }

        let mut seen = HashSet::new();
        for item in &request.exercises {
            item.validate()?;
            if !seen.insert(item.exercise_id) {
                return Err(AppError::validation("The same exercise appears more than once in the request."));
            }
        }

        let mut tx = self.db.begin().await?;
        fetch_owned_plan(&mut tx, user_id, plan_id).await?;

        let mut created_ids = Vec::with_capacity(request.exercises.len());
        for item in &request.exercises {
            let catalog_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exercises WHERE id = $1)")
                .bind(item.exercise_id)
                .fetch_one(&mut *tx)
                .await?;
            if !catalog_exists {
                return Err(AppError::not_found(format!("Exercise {} not found.", item.exercise_id)));
            }

            let already_in_plan: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM plan_exercises WHERE workout_plan_id = $1 AND exercise_id = $2)",
            )
            .bind(plan_id)
            .bind(item.exercise_id)
            .fetch_one(&mut *tx)
            .await?;
            if already_in_plan {
                return Err(AppError::validation("This exercise is already part of the plan."));
            }

            let position = insert_position(item.position, max_position(&mut tx, plan_id).await?);
            apply_shift(&mut tx, plan_id, shift_for_insert(position)).await?;

            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO plan_exercises (id, workout_plan_id, exercise_id, position, sets, reps, rest_timer)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id)
            .bind(plan_id)
            .bind(item.exercise_id)
            .bind(position)
            .bind(item.sets)
            .bind(item.reps)
            .bind(item.rest_timer)
            .execute(&mut *tx)
            .await?;

            created_ids.push(id);
        }

        touch_plan(&mut tx, plan_id).await?;
        let created = sqlx::query_as::<_, PlanExercise>(&format!(
            "{PLAN_EXERCISE_SELECT} WHERE pe.id = ANY($1) ORDER BY pe.position"
        ))
        .bind(&created_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Added {} exercise(s) to plan {}", created.len(), plan_id);
        Ok(created)
    }

    /// Update sets/reps/rest and optionally move the exercise to a new position.
    /// `exercise_ref` is either the plan entry's id or the catalog exercise id.
    pub async fn update_plan_exercise(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        exercise_ref: Uuid,
        request: UpdatePlanExercise,
    ) -> AppResult<PlanExercise> {
        request.validate()?;

        let mut tx = self.db.begin().await?;
        fetch_owned_plan(&mut tx, user_id, plan_id).await?;
        let current = fetch_plan_exercise(&mut tx, plan_id, exercise_ref).await?;

        let mut position = current.position;
        if let Some(requested) = request.position {
            let target = move_target(requested, max_position(&mut tx, plan_id).await?);
            if let Some(shift) = shift_for_move(current.position, target) {
                apply_shift(&mut tx, plan_id, shift).await?;
                position = target;
            }
        }

        sqlx::query(
            "UPDATE plan_exercises SET
                position = $2,
                sets = COALESCE($3, sets),
                reps = COALESCE($4, reps),
                rest_timer = COALESCE($5, rest_timer)
             WHERE id = $1",
        )
        .bind(current.id)
        .bind(position)
        .bind(request.sets)
        .bind(request.reps)
        .bind(request.rest_timer)
        .execute(&mut *tx)
        .await?;

        touch_plan(&mut tx, plan_id).await?;
        let updated = fetch_plan_exercise(&mut tx, plan_id, current.id).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Remove an exercise and close the gap it leaves
    pub async fn remove_plan_exercise(&self, user_id: Uuid, plan_id: Uuid, exercise_ref: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        fetch_owned_plan(&mut tx, user_id, plan_id).await?;
        let current = fetch_plan_exercise(&mut tx, plan_id, exercise_ref).await?;

        sqlx::query("DELETE FROM plan_exercises WHERE id = $1")
            .bind(current.id)
            .execute(&mut *tx)
            .await?;
        apply_shift(&mut tx, plan_id, shift_for_delete(current.position)).await?;
        touch_plan(&mut tx, plan_id).await?;

        tx.commit().await?;

        tracing::info!("Removed exercise {} from plan {}", current.exercise_id, plan_id);
        Ok(())
    }
}

pub(crate) async fn fetch_owned_plan(conn: &mut PgConnection, user_id: Uuid, plan_id: Uuid) -> AppResult<WorkoutPlan> {
    sqlx::query_as::<_, WorkoutPlan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM workout_plans WHERE id = $1 AND user_id = $2"
    ))
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found(PLAN_NOT_FOUND))
}

async fn fetch_plan_exercises(conn: &mut PgConnection, plan_id: Uuid) -> AppResult<Vec<PlanExercise>> {
    let exercises = sqlx::query_as::<_, PlanExercise>(&format!(
        "{PLAN_EXERCISE_SELECT} WHERE pe.workout_plan_id = $1 ORDER BY pe.position"
    ))
    .bind(plan_id)
    .fetch_all(conn)
    .await?;

    Ok(exercises)
}

async fn fetch_plan_exercise(conn: &mut PgConnection, plan_id: Uuid, exercise_ref: Uuid) -> AppResult<PlanExercise> {
    sqlx::query_as::<_, PlanExercise>(&format!(
        "{PLAN_EXERCISE_SELECT} WHERE pe.workout_plan_id = $1 AND (pe.id = $2 OR pe.exercise_id = $2)"
    ))
    .bind(plan_id)
    .bind(exercise_ref)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found(EXERCISE_NOT_IN_PLAN))
}

async fn max_position(conn: &mut PgConnection, plan_id: Uuid) -> AppResult<i32> {
    let max: Option<i32> = sqlx::query_scalar("SELECT MAX(position) FROM plan_exercises WHERE workout_plan_id = $1")
        .bind(plan_id)
        .fetch_one(conn)
        .await?;

    Ok(max.unwrap_or(0))
}

/// Issue a [`ShiftRange`] as one range update. The position uniqueness
/// constraint is deferred, so intermediate duplicates are fine until commit.
async fn apply_shift(conn: &mut PgConnection, plan_id: Uuid, shift: ShiftRange) -> AppResult<()> {
    sqlx::query(
        "UPDATE plan_exercises SET position = position + $2
         WHERE workout_plan_id = $1 AND position >= $3 AND ($4::INT IS NULL OR position <= $4)",
    )
    .bind(plan_id)
    .bind(shift.delta)
    .bind(shift.from)
    .bind(shift.to)
    .execute(conn)
    .await?;

    Ok(())
}

async fn touch_plan(conn: &mut PgConnection, plan_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE workout_plans SET updated_at = NOW() WHERE id = $1")
        .bind(plan_id)
        .execute(conn)
        .await?;
    Ok(())
}
