use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{FitnessProfile, FitnessProfileResponse, UpdateFitnessProfile};

const PROFILE_COLUMNS: &str = "id, user_id, display_name, pronouns, custom_pronouns, birthday, gender, \
     height_cm, weight_kg, body_fat_percentage, goals, medical_conditions, fitness_level, \
     exercise_frequency, fitness_goal, target_weight_kg, preferred_training_style_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ProfileService {
    db: PgPool,
}

impl ProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<FitnessProfileResponse> {
        let profile = sqlx::query_as::<_, FitnessProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM fitness_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Fitness profile not found."))?;

        Ok(FitnessProfileResponse::new(profile, Utc::now().date_naive()))
    }

    /// Apply a partial update; fields left out of the request keep their value.
    pub async fn update_profile(&self, user_id: Uuid, update: UpdateFitnessProfile) -> AppResult<FitnessProfileResponse> {
        let today = Utc::now().date_naive();
        validate_profile_update(&update, today)?;

        if let Some(style_id) = update.preferred_training_style_id {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM training_styles WHERE id = $1)")
                .bind(style_id)
                .fetch_one(&self.db)
                .await?;
            if !exists {
                return Err(AppError::validation("Preferred training style does not exist."));
            }
        }

        let mut tx = self.db.begin().await?;

        // Accounts created before profiles existed get one on first save
        sqlx::query("INSERT INTO fitness_profiles (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let profile = sqlx::query_as::<_, FitnessProfile>(&format!(
            "UPDATE fitness_profiles SET
                display_name = COALESCE($2, display_name),
                pronouns = COALESCE($3, pronouns),
                custom_pronouns = COALESCE($4, custom_pronouns),
                birthday = COALESCE($5, birthday),
                gender = COALESCE($6, gender),
                height_cm = COALESCE($7, height_cm),
                weight_kg = COALESCE($8, weight_kg),
                body_fat_percentage = COALESCE($9, body_fat_percentage),
                goals = COALESCE($10, goals),
                medical_conditions = COALESCE($11, medical_conditions),
                fitness_level = COALESCE($12, fitness_level),
                exercise_frequency = COALESCE($13, exercise_frequency),
                fitness_goal = COALESCE($14, fitness_goal),
                target_weight_kg = COALESCE($15, target_weight_kg),
                preferred_training_style_id = COALESCE($16, preferred_training_style_id),
                updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&update.display_name)
        .bind(update.pronouns.map(|p| p.as_str()))
        .bind(&update.custom_pronouns)
        .bind(update.birthday)
        .bind(update.gender.map(|g| g.as_str()))
        .bind(update.height_cm)
        .bind(update.weight_kg)
        .bind(update.body_fat_percentage)
        .bind(&update.goals)
        .bind(&update.medical_conditions)
        .bind(update.fitness_level.map(|l| l.as_str()))
        .bind(update.exercise_frequency)
        .bind(update.fitness_goal.map(|g| g.as_str()))
        .bind(update.target_weight_kg)
        .bind(update.preferred_training_style_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Updated fitness profile for user {}", user_id);
        Ok(FitnessProfileResponse::new(profile, today))
    }
}

/// Field checks that need more than the derive ranges
pub fn validate_profile_update(update: &UpdateFitnessProfile, today: NaiveDate) -> AppResult<()> {
    update.validate()?;

    if update.birthday.is_some_and(|birthday| birthday > today) {
        return Err(AppError::validation("Birthday cannot be in the future."));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_future_birthday_is_rejected() {
        let update = UpdateFitnessProfile {
            birthday: NaiveDate::from_ymd_opt(2024, 6, 2),
            ..Default::default()
        };
        assert_matches!(validate_profile_update(&update, today()), Err(AppError::Validation(_)));
    }

    #[test]
    fn test_range_errors_surface_as_invalid_fields() {
        let update = UpdateFitnessProfile {
            height_cm: Some(10.0),
            ..Default::default()
        };
        assert_matches!(validate_profile_update(&update, today()), Err(AppError::InvalidFields(_)));
    }

    #[test]
    fn test_long_custom_pronouns_rejected() {
        let update = UpdateFitnessProfile {
            custom_pronouns: Some("x".repeat(51)),
            ..Default::default()
        };
        assert!(validate_profile_update(&update, today()).is_err());
    }

    #[test]
    fn test_empty_update_is_valid() {
        assert!(validate_profile_update(&UpdateFitnessProfile::default(), today()).is_ok());
    }
}
