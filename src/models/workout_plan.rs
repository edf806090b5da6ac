use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One catalog exercise placed inside a plan
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PlanExercise {
    pub id: Uuid,
    pub workout_plan_id: Uuid,
    pub exercise_id: Uuid,
    pub name: String,
    #[serde(rename = "order")]
    pub position: i32,
    pub sets: Option<i32>,
    pub reps: Option<i32>,
    pub rest_timer: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutPlanResponse {
    #[serde(flatten)]
    pub plan: WorkoutPlan,
    pub exercises: Vec<PlanExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWorkoutPlan {
    #[validate(length(min = 1, max = 100, message = "Plan name must be between 1 and 100 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1440, message = "Duration must be between 0 and 1440 minutes"))]
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<DifficultyLevel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateWorkoutPlan {
    #[validate(length(min = 1, max = 100, message = "Plan name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1440, message = "Duration must be between 0 and 1440 minutes"))]
    pub duration_minutes: Option<i32>,
    pub difficulty_level: Option<DifficultyLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddPlanExercise {
    pub exercise_id: Uuid,
    #[serde(rename = "order")]
    #[validate(range(min = 1, message = "Order must be at least 1"))]
    pub position: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "Sets must be between 0 and 100"))]
    pub sets: Option<i32>,
    #[validate(range(min = 0, max = 1000, message = "Reps must be between 0 and 1000"))]
    pub reps: Option<i32>,
    #[validate(range(min = 0, max = 3600, message = "Rest timer must be between 0 and 3600 seconds"))]
    pub rest_timer: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddPlanExercisesRequest {
    #[serde(default)]
    pub exercises: Vec<AddPlanExercise>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePlanExercise {
    #[serde(rename = "order")]
    #[validate(range(min = 1, message = "Order must be at least 1"))]
    pub position: Option<i32>,
    #[validate(range(min = 0, max = 100, message = "Sets must be between 0 and 100"))]
    pub sets: Option<i32>,
    #[validate(range(min = 0, max = 1000, message = "Reps must be between 0 and 1000"))]
    pub reps: Option<i32>,
    #[validate(range(min = 0, max = 3600, message = "Rest timer must be between 0 and 3600 seconds"))]
    pub rest_timer: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_exercise_serializes_position_as_order() {
        let exercise = PlanExercise {
            id: Uuid::new_v4(),
            workout_plan_id: Uuid::new_v4(),
            exercise_id: Uuid::new_v4(),
            name: "Squat".to_string(),
            position: 2,
            sets: Some(3),
            reps: Some(10),
            rest_timer: None,
        };

        let value = serde_json::to_value(&exercise).unwrap();
        assert_eq!(value["order"], 2);
        assert!(value.get("position").is_none());
    }

    #[test]
    fn test_add_request_reads_order_field() {
        let id = Uuid::new_v4();
        let request: AddPlanExercisesRequest = serde_json::from_value(json!({
            "exercises": [{"exercise_id": id, "order": 1, "sets": 3}]
        }))
        .unwrap();

        assert_eq!(request.exercises.len(), 1);
        assert_eq!(request.exercises[0].position, Some(1));
        assert_eq!(request.exercises[0].exercise_id, id);
    }

    #[test]
    fn test_zero_order_is_rejected() {
        let item = AddPlanExercise {
            exercise_id: Uuid::new_v4(),
            position: Some(0),
            sets: None,
            reps: None,
            rest_timer: None,
        };
        assert!(item.validate().is_err());
    }
}
