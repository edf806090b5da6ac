use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AccuracyPoint {
    pub date: NaiveDate,
    pub avg_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ExerciseAccuracy {
    pub exercise_name: String,
    pub avg_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreakSummary {
    pub streak_count: i32,
    pub last_active: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessAnalytics {
    pub total_workouts: i64,
    pub total_time_trained: String,
    pub total_time_trained_seconds: i64,
    pub average_accuracy: f64,
    pub accuracy_over_time: Vec<AccuracyPoint>,
    pub accuracy_per_exercise: Vec<ExerciseAccuracy>,
    pub streak: StreakSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// Limit `accuracy_over_time` to the last N days
    pub days: Option<i64>,
}

/// Render a duration as `H:MM:SS`, prefixed with `N day(s), ` past 24 hours.
pub fn format_time_trained(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let clock = format!("{hours}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

pub fn round_accuracy(value: Option<f64>) -> f64 {
    value.map(|v| (v * 100.0).round() / 100.0).unwrap_or(0.0)
}
