use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Shared shape of the simple reference tables
/// (muscle groups, equipment, training styles, environments).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    MuscleGroup,
    Equipment,
    TrainingStyle,
    WorkoutEnvironment,
}

impl CatalogKind {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::MuscleGroup => "muscle_groups",
            CatalogKind::Equipment => "equipment",
            CatalogKind::TrainingStyle => "training_styles",
            CatalogKind::WorkoutEnvironment => "workout_environments",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub training_style_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
}

/// Exercise with its resolved relations, as served by the catalog endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseDetail {
    #[serde(flatten)]
    pub exercise: Exercise,
    pub training_style: Option<String>,
    pub environment: Option<String>,
    pub muscle_groups: Vec<CatalogEntry>,
    pub equipment: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExerciseQuery {
    pub search: Option<String>,
    pub muscle_group: Option<Uuid>,
    pub equipment: Option<Uuid>,
    pub training_style: Option<Uuid>,
}

impl ExerciseQuery {
    /// `ILIKE` pattern for the name search, with wildcards in the input escaped.
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }

        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{escaped}%"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let query = ExerciseQuery {
            search: Some(" 100%_push ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_pattern().as_deref(), Some("%100\\%\\_push%"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = ExerciseQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_pattern(), None);
        assert_eq!(ExerciseQuery::default().search_pattern(), None);
    }
}
