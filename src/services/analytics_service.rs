use chrono::{Days, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    format_time_trained, round_accuracy, AccuracyPoint, AnalyticsQuery, ExerciseAccuracy, FitnessAnalytics,
};
use crate::services::streak_service::StreakService;

/// Read-only aggregates over a user's sessions and set logs
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    db: PgPool,
    streaks: StreakService,
}

impl AnalyticsService {
    pub fn new(db: PgPool) -> Self {
        Self {
            streaks: StreakService::new(db.clone()),
            db,
        }
    }

    pub async fn fitness_analytics(&self, user_id: Uuid, query: &AnalyticsQuery) -> AppResult<FitnessAnalytics> {
        let since = accuracy_window_start(Utc::now().date_naive(), query.days)?;

        let (total_workouts, total_seconds): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(duration_seconds), 0)::BIGINT
             FROM workout_sessions
             WHERE user_id = $1 AND completed",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let average: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(l.score)
             FROM exercise_set_logs l
             JOIN workout_sessions s ON s.id = l.session_id
             WHERE s.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let accuracy_over_time = sqlx::query_as::<_, AccuracyPoint>(
            "SELECT s.date, AVG(l.score) AS avg_accuracy
             FROM exercise_set_logs l
             JOIN workout_sessions s ON s.id = l.session_id
             WHERE s.user_id = $1 AND ($2::DATE IS NULL OR s.date >= $2)
             GROUP BY s.date
             ORDER BY s.date",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        let accuracy_per_exercise = sqlx::query_as::<_, ExerciseAccuracy>(
            "SELECT e.name AS exercise_name, AVG(l.score) AS avg_accuracy
             FROM exercise_set_logs l
             JOIN workout_sessions s ON s.id = l.session_id
             JOIN exercises e ON e.id = l.exercise_id
             WHERE s.user_id = $1
             GROUP BY e.name
             ORDER BY e.name",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let streak = self.streaks.get_streak(user_id).await?;

        tracing::debug!("Computed analytics for user {} ({} workouts)", user_id, total_workouts);
        Ok(FitnessAnalytics {
            total_workouts,
            total_time_trained: format_time_trained(total_seconds),
            total_time_trained_seconds: total_seconds,
            average_accuracy: round_accuracy(average),
            accuracy_over_time,
            accuracy_per_exercise,
            streak,
        })
    }
}

/// First day included in `accuracy_over_time` when a window is requested.
/// `days = 1` means today only.
pub fn accuracy_window_start(today: NaiveDate, days: Option<i64>) -> AppResult<Option<NaiveDate>> {
    let Some(days) = days else {
        return Ok(None);
    };

    if days < 1 {
        return Err(AppError::validation("days must be a positive integer."));
    }

    let back = u64::try_from(days - 1).unwrap_or(0);
    Ok(Some(today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN)))
}
