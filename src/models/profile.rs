use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Pronouns {
    #[serde(rename = "he/him")]
    HeHim,
    #[serde(rename = "she/her")]
    SheHer,
    #[serde(rename = "they/them")]
    TheyThem,
    #[serde(rename = "he/they")]
    HeThey,
    #[serde(rename = "she/they")]
    SheThey,
    #[serde(rename = "ze/hir")]
    ZeHir,
    #[serde(rename = "prefer_not_to_say")]
    PreferNotToSay,
    #[serde(rename = "custom")]
    Custom,
}

impl Pronouns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pronouns::HeHim => "he/him",
            Pronouns::SheHer => "she/her",
            Pronouns::TheyThem => "they/them",
            Pronouns::HeThey => "he/they",
            Pronouns::SheThey => "she/they",
            Pronouns::ZeHir => "ze/hir",
            Pronouns::PreferNotToSay => "prefer_not_to_say",
            Pronouns::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    WeightLoss,
    MuscleGain,
    Endurance,
    Flexibility,
    Maintenance,
}

impl FitnessGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessGoal::WeightLoss => "weight_loss",
            FitnessGoal::MuscleGain => "muscle_gain",
            FitnessGoal::Endurance => "endurance",
            FitnessGoal::Flexibility => "flexibility",
            FitnessGoal::Maintenance => "maintenance",
        }
    }
}

/// Onboarding and fitness attributes, one row per user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FitnessProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub pronouns: Option<String>,
    pub custom_pronouns: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub goals: Option<String>,
    pub medical_conditions: Option<String>,
    pub fitness_level: Option<String>,
    pub exercise_frequency: Option<i32>,
    pub fitness_goal: Option<String>,
    pub target_weight_kg: Option<f64>,
    pub preferred_training_style_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; omitted fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFitnessProfile {
    #[validate(length(max = 100, message = "Display name cannot be longer than 100 characters"))]
    pub display_name: Option<String>,
    pub pronouns: Option<Pronouns>,
    #[validate(length(max = 50, message = "Custom pronouns cannot be longer than 50 characters"))]
    pub custom_pronouns: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[validate(range(min = 30.0, max = 300.0, message = "Height must be between 30 and 300 cm"))]
    pub height_cm: Option<f64>,
    #[validate(range(min = 20.0, max = 500.0, message = "Weight must be between 20 and 500 kg"))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0, message = "Body fat percentage must be between 0 and 100"))]
    pub body_fat_percentage: Option<f64>,
    pub goals: Option<String>,
    pub medical_conditions: Option<String>,
    pub fitness_level: Option<FitnessLevel>,
    #[validate(range(min = 0, max = 14, message = "Exercise frequency must be between 0 and 14 sessions per week"))]
    pub exercise_frequency: Option<i32>,
    pub fitness_goal: Option<FitnessGoal>,
    #[validate(range(min = 20.0, max = 500.0, message = "Target weight must be between 20 and 500 kg"))]
    pub target_weight_kg: Option<f64>,
    pub preferred_training_style_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessProfileResponse {
    #[serde(flatten)]
    pub profile: FitnessProfile,
    pub age: Option<u32>,
}

impl FitnessProfileResponse {
    pub fn new(profile: FitnessProfile, today: NaiveDate) -> Self {
        let age = profile.birthday.and_then(|birthday| age_on(birthday, today));
        Self { profile, age }
    }
}

/// Completed years between `birthday` and `today`; `None` for birthdays in the future.
pub fn age_on(birthday: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birthday > today {
        return None;
    }

    let mut years = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        years -= 1;
    }

    u32::try_from(years).ok()
}
