use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "plan")]
    pub plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub date: NaiveDate,
    pub rest_period_seconds: Option<i32>,
    pub score: Option<f64>,
    pub duration_seconds: Option<i32>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ExerciseSetLog {
    pub id: Uuid,
    pub session_id: Uuid,
    #[serde(rename = "exercise")]
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub set_number: i32,
    pub reps_completed: Option<i32>,
    pub weight_kg: Option<f64>,
    pub duration_seconds: Option<i32>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSessionResponse {
    #[serde(flatten)]
    pub session: WorkoutSession,
    pub logs: Vec<ExerciseSetLog>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateWorkoutSession {
    pub plan_id: Option<Uuid>,
    #[validate(range(min = 0, max = 3600, message = "Rest period must be between 0 and 3600 seconds"))]
    pub rest_period_seconds: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateWorkoutSession {
    #[validate(range(min = 0, max = 3600, message = "Rest period must be between 0 and 3600 seconds"))]
    pub rest_period_seconds: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: Option<f64>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    pub completed: Option<bool>,
}

/// One set as submitted by the client. `exercise_id` is kept loose so that a
/// malformed identifier can be reported with the offending value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LogSetInput {
    pub exercise_id: Option<Value>,
    #[validate(range(min = 1, message = "Set number must be at least 1"))]
    pub set_number: i32,
    #[validate(range(min = 0, message = "Reps completed cannot be negative"))]
    pub reps_completed: Option<i32>,
    #[validate(range(min = 0.0, message = "Weight cannot be negative"))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSetsRequest {
    #[serde(default)]
    pub sets: Vec<LogSetInput>,
}

/// A validated set ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct SetLogWrite {
    pub exercise_id: Uuid,
    pub set_number: i32,
    pub reps_completed: Option<i32>,
    pub weight_kg: Option<f64>,
    pub duration_seconds: Option<i32>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateSetLog {
    #[serde(rename = "exercise")]
    pub exercise_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Set number must be at least 1"))]
    pub set_number: Option<i32>,
    #[validate(range(min = 0, message = "Reps completed cannot be negative"))]
    pub reps_completed: Option<i32>,
    #[validate(range(min = 0.0, message = "Weight cannot be negative"))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score: Option<f64>,
}

/// Parse a client supplied exercise identifier, accepting a JSON string holding a UUID.
pub fn parse_exercise_id(value: Option<&Value>) -> Option<Uuid> {
    match value? {
        Value::String(raw) => Uuid::parse_str(raw.trim()).ok(),
        _ => None,
    }
}

/// A session is complete once every exercise of its plan has at least one logged set.
/// Sessions without a plan never complete on their own.
pub fn is_session_complete(plan_exercise_ids: Option<&[Uuid]>, logged_exercise_ids: &[Uuid]) -> bool {
    let Some(plan_exercise_ids) = plan_exercise_ids else {
        return false;
    };

    let logged: HashSet<&Uuid> = logged_exercise_ids.iter().collect();
    plan_exercise_ids.iter().all(|id| logged.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_without_plan_never_completes() {
        let logged = vec![Uuid::new_v4()];
        assert!(!is_session_complete(None, &logged));
        assert!(!is_session_complete(None, &[]));
    }

    #[test]
    fn test_session_completes_when_every_plan_exercise_is_logged() {
        let squat = Uuid::new_v4();
        let press = Uuid::new_v4();
        let plan = vec![squat, press];

        assert!(!is_session_complete(Some(&plan), &[]));
        assert!(!is_session_complete(Some(&plan), &[squat, squat]));
        assert!(is_session_complete(Some(&plan), &[press, squat]));
    }

    #[test]
    fn test_extra_logged_exercises_do_not_block_completion() {
        let squat = Uuid::new_v4();
        let plan = vec![squat];
        assert!(is_session_complete(Some(&plan), &[squat, Uuid::new_v4()]));
    }

    #[test]
    fn test_parse_exercise_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_exercise_id(Some(&json!(id.to_string()))), Some(id));
        assert_eq!(parse_exercise_id(Some(&json!(format!(" {id} ")))), Some(id));
        assert_eq!(parse_exercise_id(Some(&json!("not-a-uuid"))), None);
        assert_eq!(parse_exercise_id(Some(&json!(42))), None);
        assert_eq!(parse_exercise_id(None), None);
    }

    #[test]
    fn test_session_serializes_plan_field() {
        let plan_id = Uuid::new_v4();
        let session = WorkoutSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: Some(plan_id),
            plan_name: Some("Leg day".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            rest_period_seconds: Some(90),
            score: None,
            duration_seconds: None,
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(WorkoutSessionResponse { session, logs: vec![] }).unwrap();
        assert_eq!(value["plan"], json!(plan_id));
        assert_eq!(value["plan_name"], "Leg day");
        assert_eq!(value["logs"], json!([]));
    }
}
