use chrono::Utc;
use serde_json::Value;
use sqlx::{Connection, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{
    is_session_complete, parse_exercise_id, CreateWorkoutSession, ExerciseSetLog, LogSetInput, LogSetsRequest,
    SetLogWrite, UpdateSetLog, UpdateWorkoutSession, WorkoutSession, WorkoutSessionResponse,
};
use crate::services::streak_service::record_completion;
use crate::services::workout_plan_service::fetch_owned_plan;

const SESSION_SELECT: &str = "SELECT s.id, s.user_id, s.plan_id, p.name AS plan_name, s.date, \
     s.rest_period_seconds, s.score, s.duration_seconds, s.completed, s.created_at, s.updated_at
     FROM workout_sessions s
     LEFT JOIN workout_plans p ON p.id = s.plan_id";

const LOG_SELECT: &str = "SELECT l.id, l.session_id, l.exercise_id, e.name AS exercise_name, l.set_number, \
     l.reps_completed, l.weight_kg, l.duration_seconds, l.score
     FROM exercise_set_logs l
     JOIN exercises e ON e.id = l.exercise_id";

const SESSION_NOT_FOUND: &str = "Session not found.";
const LOG_NOT_FOUND: &str = "Set log not found.";
const NO_PLAN: &str = "This session has no associated plan.";

/// Exercises of a session's plan, addressable by catalog id or plan entry id
#[derive(Debug, Clone, Default)]
pub struct PlanExerciseIndex {
    plan_name: String,
    by_ref: HashMap<Uuid, Uuid>,
    catalog_ids: Vec<Uuid>,
}

impl PlanExerciseIndex {
    /// Build from `(plan entry id, catalog exercise id)` pairs
    pub fn new(plan_name: impl Into<String>, entries: &[(Uuid, Uuid)]) -> Self {
        let mut by_ref = HashMap::new();
        let mut catalog_ids = Vec::with_capacity(entries.len());
        for &(entry_id, exercise_id) in entries {
            by_ref.insert(entry_id, exercise_id);
            by_ref.insert(exercise_id, exercise_id);
            catalog_ids.push(exercise_id);
        }

        Self {
            plan_name: plan_name.into(),
            by_ref,
            catalog_ids,
        }
    }

    /// Catalog exercise id for a reference, if it belongs to the plan
    pub fn resolve(&self, reference: Uuid) -> Option<Uuid> {
        self.by_ref.get(&reference).copied()
    }

    pub fn catalog_ids(&self) -> &[Uuid] {
        &self.catalog_ids
    }

    fn not_in_plan(&self, reference: impl std::fmt::Display) -> AppError {
        AppError::validation(format!(
            "Exercise {} is not part of the plan '{}'.",
            reference, self.plan_name
        ))
    }
}

/// Check every submitted set before anything is written.
pub fn prepare_set_batch(sets: Vec<LogSetInput>, plan: &PlanExerciseIndex) -> AppResult<Vec<SetLogWrite>> {
    if sets.is_empty() {
        return Err(AppError::validation("No sets provided."));
    }

    sets.into_iter()
        .map(|item| -> AppResult<SetLogWrite> {
            item.validate()?;

            let raw = item.exercise_id.as_ref();
            let reference = parse_exercise_id(raw).ok_or_else(|| {
                let shown = match raw {
                    Some(Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                    None => "null".to_string(),
                };
                AppError::validation(format!("Invalid exercise_id: {shown}"))
            })?;
            let exercise_id = plan.resolve(reference).ok_or_else(|| plan.not_in_plan(reference))?;

            Ok(SetLogWrite {
                exercise_id,
                set_number: item.set_number,
                reps_completed: item.reps_completed,
                weight_kg: item.weight_kg,
                duration_seconds: item.duration_seconds,
                score: item.score,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct WorkoutSessionService {
    db: PgPool,
}

impl WorkoutSessionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The caller's sessions with their logs, newest first
    pub async fn list_sessions(&self, user_id: Uuid) -> AppResult<Vec<WorkoutSessionResponse>> {
        let sessions = sqlx::query_as::<_, WorkoutSession>(&format!(
            "{SESSION_SELECT} WHERE s.user_id = $1 ORDER BY s.date DESC, s.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let session_ids: Vec<Uuid> = sessions.iter().map(|session| session.id).collect();
        let logs = sqlx::query_as::<_, ExerciseSetLog>(&format!(
            "{LOG_SELECT} WHERE l.session_id = ANY($1) ORDER BY e.name, l.set_number"
        ))
        .bind(&session_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<ExerciseSetLog>> = HashMap::new();
        for log in logs {
            grouped.entry(log.session_id).or_default().push(log);
        }

        Ok(sessions
            .into_iter()
            .map(|session| WorkoutSessionResponse {
                logs: grouped.remove(&session.id).unwrap_or_default(),
                session,
            })
            .collect())
    }

    pub async fn create_session(&self, user_id: Uuid, request: CreateWorkoutSession) -> AppResult<WorkoutSessionResponse> {
        request.validate()?;
        let plan_id = request
            .plan_id
            .ok_or_else(|| AppError::validation("plan_id is required."))?;

        let mut tx = self.db.begin().await?;
        fetch_owned_plan(&mut tx, user_id, plan_id).await?;

        let session_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO workout_sessions (id, user_id, plan_id, date, rest_period_seconds)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(plan_id)
        .bind(Utc::now().date_naive())
        .bind(request.rest_period_seconds)
        .execute(&mut *tx)
        .await?;

        let session = fetch_owned_session(&mut tx, user_id, session_id).await?;
        tx.commit().await?;

        tracing::info!("Started session {} on plan {} for user {}", session_id, plan_id, user_id);
        Ok(WorkoutSessionResponse {
            session,
            logs: Vec::new(),
        })
    }

    pub async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> AppResult<WorkoutSessionResponse> {
        let mut conn = self.db.acquire().await?;
        let session = fetch_owned_session(&mut conn, user_id, session_id).await?;
        let logs = fetch_logs(&mut conn, session_id).await?;

        Ok(WorkoutSessionResponse { session, logs })
    }

    /// Partial update. Marking a session completed counts towards the streak.
    pub async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        request: UpdateWorkoutSession,
    ) -> AppResult<WorkoutSessionResponse> {
        request.validate()?;

        let mut tx = self.db.begin().await?;
        let before = fetch_owned_session(&mut tx, user_id, session_id).await?;

        sqlx::query(
            "UPDATE workout_sessions SET
                rest_period_seconds = COALESCE($2, rest_period_seconds),
                score = COALESCE($3, score),
                duration_seconds = COALESCE($4, duration_seconds),
                completed = COALESCE($5, completed),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(session_id)
        .bind(request.rest_period_seconds)
        .bind(request.score)
        .bind(request.duration_seconds)
        .bind(request.completed)
        .execute(&mut *tx)
        .await?;

        if !before.completed && request.completed == Some(true) {
            record_completion(&mut tx, user_id, Utc::now().date_naive()).await?;
        }

        let session = fetch_owned_session(&mut tx, user_id, session_id).await?;
        let logs = fetch_logs(&mut tx, session_id).await?;
        tx.commit().await?;

        Ok(WorkoutSessionResponse { session, logs })
    }

    pub async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM workout_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(SESSION_NOT_FOUND));
        }

        Ok(())
    }

    pub async fn list_logs(&self, user_id: Uuid, session_id: Uuid) -> AppResult<Vec<ExerciseSetLog>> {
        let mut conn = self.db.acquire().await?;
        fetch_owned_session(&mut conn, user_id, session_id).await?;
        fetch_logs(&mut conn, session_id).await
    }

    /// Record a batch of sets. A set that was already logged for the same
    /// exercise and set number is updated in place.
    pub async fn log_sets(&self, user_id: Uuid, session_id: Uuid, request: LogSetsRequest) -> AppResult<Vec<ExerciseSetLog>> {
        let mut tx = self.db.begin().await?;
        let session = fetch_owned_session(&mut tx, user_id, session_id).await?;
        let plan = plan_index(&mut tx, &session).await?;
        let writes = prepare_set_batch(request.sets, &plan)?;

        let mut log_ids = Vec::with_capacity(writes.len());
        for write in &writes {
            log_ids.push(upsert_set_log(&mut tx, session_id, write).await?);
        }

        mark_complete_if_done(&mut tx, &session, &plan).await?;

        let logs = sqlx::query_as::<_, ExerciseSetLog>(&format!("{LOG_SELECT} WHERE l.id = ANY($1)"))
            .bind(&log_ids)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(in_request_order(&log_ids, logs))
    }

    pub async fn update_log(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        log_id: Uuid,
        request: UpdateSetLog,
    ) -> AppResult<ExerciseSetLog> {
        request.validate()?;

        let mut tx = self.db.begin().await?;
        let session = fetch_owned_session(&mut tx, user_id, session_id).await?;
        fetch_log(&mut tx, session_id, log_id).await?;

        let plan = plan_index(&mut tx, &session).await?;
        let exercise_id = match request.exercise_id {
            Some(reference) => Some(plan.resolve(reference).ok_or_else(|| plan.not_in_plan(reference))?),
            None => None,
        };

        sqlx::query(
            "UPDATE exercise_set_logs SET
                exercise_id = COALESCE($2, exercise_id),
                set_number = COALESCE($3, set_number),
                reps_completed = COALESCE($4, reps_completed),
                weight_kg = COALESCE($5, weight_kg),
                duration_seconds = COALESCE($6, duration_seconds),
                score = COALESCE($7, score),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(log_id)
        .bind(exercise_id)
        .bind(request.set_number)
        .bind(request.reps_completed)
        .bind(request.weight_kg)
        .bind(request.duration_seconds)
        .bind(request.score)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::conflict("A set log for this exercise and set number already exists.")
            } else {
                AppError::Database(err)
            }
        })?;

        mark_complete_if_done(&mut tx, &session, &plan).await?;
        let log = fetch_log(&mut tx, session_id, log_id).await?;
        tx.commit().await?;

        Ok(log)
    }

    /// Delete a set log. A completed session stays completed.
    pub async fn delete_log(&self, user_id: Uuid, session_id: Uuid, log_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM exercise_set_logs l
             USING workout_sessions s
             WHERE l.id = $1 AND l.session_id = $2 AND s.id = l.session_id AND s.user_id = $3",
        )
        .bind(log_id)
        .bind(session_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(LOG_NOT_FOUND));
        }

        Ok(())
    }
}

async fn fetch_owned_session(conn: &mut PgConnection, user_id: Uuid, session_id: Uuid) -> AppResult<WorkoutSession> {
    sqlx::query_as::<_, WorkoutSession>(&format!("{SESSION_SELECT} WHERE s.id = $1 AND s.user_id = $2"))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(SESSION_NOT_FOUND))
}

async fn fetch_logs(conn: &mut PgConnection, session_id: Uuid) -> AppResult<Vec<ExerciseSetLog>> {
    let logs = sqlx::query_as::<_, ExerciseSetLog>(&format!(
        "{LOG_SELECT} WHERE l.session_id = $1 ORDER BY e.name, l.set_number"
    ))
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(logs)
}

async fn fetch_log(conn: &mut PgConnection, session_id: Uuid, log_id: Uuid) -> AppResult<ExerciseSetLog> {
    sqlx::query_as::<_, ExerciseSetLog>(&format!("{LOG_SELECT} WHERE l.id = $1 AND l.session_id = $2"))
        .bind(log_id)
        .bind(session_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(LOG_NOT_FOUND))
}

async fn plan_index(conn: &mut PgConnection, session: &WorkoutSession) -> AppResult<PlanExerciseIndex> {
    let plan_id = session.plan_id.ok_or_else(|| AppError::validation(NO_PLAN))?;

    let entries: Vec<(Uuid, Uuid)> =
        sqlx::query_as("SELECT id, exercise_id FROM plan_exercises WHERE workout_plan_id = $1 ORDER BY position")
            .bind(plan_id)
            .fetch_all(conn)
            .await?;

    Ok(PlanExerciseIndex::new(
        session.plan_name.clone().unwrap_or_default(),
        &entries,
    ))
}

/// Insert or update one set inside a savepoint. A concurrent insert of the
/// same key surfaces as a unique violation; the row is then re-read and
/// updated once before giving up with a conflict.
async fn upsert_set_log(conn: &mut PgConnection, session_id: Uuid, write: &SetLogWrite) -> AppResult<Uuid> {
    let mut savepoint = conn.begin().await?;

    let result: Result<Uuid, sqlx::Error> = sqlx::query_scalar(
        "INSERT INTO exercise_set_logs
            (id, session_id, exercise_id, set_number, reps_completed, weight_kg, duration_seconds, score)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (session_id, exercise_id, set_number) DO UPDATE SET
            reps_completed = EXCLUDED.reps_completed,
            weight_kg = EXCLUDED.weight_kg,
            duration_seconds = EXCLUDED.duration_seconds,
            score = EXCLUDED.score,
            updated_at = NOW()
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(write.exercise_id)
    .bind(write.set_number)
    .bind(write.reps_completed)
    .bind(write.weight_kg)
    .bind(write.duration_seconds)
    .bind(write.score)
    .fetch_one(&mut *savepoint)
    .await;

    match result {
        Ok(id) => {
            savepoint.commit().await?;
            Ok(id)
        }
        Err(err) if is_unique_violation(&err) => {
            savepoint.rollback().await?;
            tracing::warn!(
                "Set log race on session {} exercise {} set {}; retrying as update",
                session_id,
                write.exercise_id,
                write.set_number
            );

            let updated: Option<Uuid> = sqlx::query_scalar(
                "UPDATE exercise_set_logs SET
                    reps_completed = $4, weight_kg = $5, duration_seconds = $6, score = $7, updated_at = NOW()
                 WHERE session_id = $1 AND exercise_id = $2 AND set_number = $3
                 RETURNING id",
            )
            .bind(session_id)
            .bind(write.exercise_id)
            .bind(write.set_number)
            .bind(write.reps_completed)
            .bind(write.weight_kg)
            .bind(write.duration_seconds)
            .bind(write.score)
            .fetch_optional(&mut *conn)
            .await?;

            updated.ok_or_else(|| AppError::conflict("Conflict creating set log. Please retry."))
        }
        Err(err) => Err(err.into()),
    }
}

/// Flip the session to completed once every plan exercise has a logged set.
/// Never flips it back.
async fn mark_complete_if_done(
    conn: &mut PgConnection,
    session: &WorkoutSession,
    plan: &PlanExerciseIndex,
) -> AppResult<bool> {
    if session.completed {
        return Ok(false);
    }

    let logged: Vec<Uuid> = sqlx::query_scalar("SELECT DISTINCT exercise_id FROM exercise_set_logs WHERE session_id = $1")
        .bind(session.id)
        .fetch_all(&mut *conn)
        .await?;

    let plan_ids = session.plan_id.map(|_| plan.catalog_ids());
    if !is_session_complete(plan_ids, &logged) {
        return Ok(false);
    }

    sqlx::query("UPDATE workout_sessions SET completed = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(session.id)
        .execute(&mut *conn)
        .await?;
    record_completion(conn, session.user_id, Utc::now().date_naive()).await?;

    tracing::info!("Session {} completed", session.id);
    Ok(true)
}

/// One log per submitted set, in submission order. A set repeated within the
/// batch maps to the same row and is returned once per occurrence.
fn in_request_order(log_ids: &[Uuid], logs: Vec<ExerciseSetLog>) -> Vec<ExerciseSetLog> {
    let by_id: HashMap<Uuid, ExerciseSetLog> = logs.into_iter().map(|log| (log.id, log)).collect();
    log_ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}
