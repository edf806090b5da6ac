use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{DailyStreak, StreakChange, StreakSummary};

#[derive(Debug, Clone)]
pub struct StreakService {
    db: PgPool,
}

impl StreakService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current streak; zero when the user has never completed a session
    pub async fn get_streak(&self, user_id: Uuid) -> AppResult<StreakSummary> {
        let mut conn = self.db.acquire().await?;
        let streak = load_streak(&mut conn, user_id, false).await?;

        Ok(StreakSummary {
            streak_count: streak.streak_count,
            last_active: streak.last_active,
        })
    }
}

async fn load_streak(conn: &mut PgConnection, user_id: Uuid, for_update: bool) -> AppResult<DailyStreak> {
    let sql = if for_update {
        "SELECT user_id, streak_count, last_active FROM daily_streaks WHERE user_id = $1 FOR UPDATE"
    } else {
        "SELECT user_id, streak_count, last_active FROM daily_streaks WHERE user_id = $1"
    };

    let streak = sqlx::query_as::<_, DailyStreak>(sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(streak.unwrap_or_else(|| DailyStreak::new(user_id)))
}

/// Count a completed session on `today` against the user's streak.
/// Runs on the caller's transaction; the streak row is created on first use.
pub async fn record_completion(conn: &mut PgConnection, user_id: Uuid, today: NaiveDate) -> AppResult<DailyStreak> {
    // Make sure there is a row to lock so concurrent completions serialise
    sqlx::query("INSERT INTO daily_streaks (user_id, streak_count) VALUES ($1, 0) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let mut streak = load_streak(&mut *conn, user_id, true).await?;
    let change = streak.record_activity(today);

    if change != StreakChange::Unchanged {
        sqlx::query("UPDATE daily_streaks SET streak_count = $2, last_active = $3 WHERE user_id = $1")
            .bind(user_id)
            .bind(streak.streak_count)
            .bind(streak.last_active)
            .execute(&mut *conn)
            .await?;
        tracing::info!("Streak for user {} is now {} ({:?})", user_id, streak.streak_count, change);
    }

    Ok(streak)
}
