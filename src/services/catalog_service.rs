use sqlx::{PgPool, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CatalogEntry, CatalogKind, Exercise, ExerciseDetail, ExerciseQuery};

/// Read-only access to the exercise catalog and its reference lists
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    #[sqlx(flatten)]
    exercise: Exercise,
    training_style: Option<String>,
    environment: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LinkedEntry {
    exercise_id: Uuid,
    #[sqlx(flatten)]
    entry: CatalogEntry,
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, kind: CatalogKind) -> AppResult<Vec<CatalogEntry>> {
        let entries = sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT id, name, description FROM {} ORDER BY name",
            kind.table()
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn list_exercises(&self, query: &ExerciseQuery) -> AppResult<Vec<ExerciseDetail>> {
        let mut builder = QueryBuilder::new(
            "SELECT e.id, e.name, e.description, e.training_style_id, e.environment_id,
                    ts.name AS training_style, env.name AS environment
             FROM exercises e
             LEFT JOIN training_styles ts ON ts.id = e.training_style_id
             LEFT JOIN workout_environments env ON env.id = e.environment_id
             WHERE TRUE",
        );

        if let Some(pattern) = query.search_pattern() {
            builder.push(" AND e.name ILIKE ").push_bind(pattern);
        }
        if let Some(muscle_group) = query.muscle_group {
            builder
                .push(" AND EXISTS (SELECT 1 FROM exercise_muscle_groups emg WHERE emg.exercise_id = e.id AND emg.muscle_group_id = ")
                .push_bind(muscle_group)
                .push(")");
        }
        if let Some(equipment) = query.equipment {
            builder
                .push(" AND EXISTS (SELECT 1 FROM exercise_equipment ee WHERE ee.exercise_id = e.id AND ee.equipment_id = ")
                .push_bind(equipment)
                .push(")");
        }
        if let Some(style) = query.training_style {
            builder.push(" AND e.training_style_id = ").push_bind(style);
        }
        builder.push(" ORDER BY e.name");

        let rows = builder.build_query_as::<ExerciseRow>().fetch_all(&self.db).await?;
        self.with_relations(rows).await
    }

    pub async fn get_exercise(&self, exercise_id: Uuid) -> AppResult<ExerciseDetail> {
        let row = sqlx::query_as::<_, ExerciseRow>(
            "SELECT e.id, e.name, e.description, e.training_style_id, e.environment_id,
                    ts.name AS training_style, env.name AS environment
             FROM exercises e
             LEFT JOIN training_styles ts ON ts.id = e.training_style_id
             LEFT JOIN workout_environments env ON env.id = e.environment_id
             WHERE e.id = $1",
        )
        .bind(exercise_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise not found."))?;

        let mut details = self.with_relations(vec![row]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::not_found("Exercise not found."))
    }

    async fn with_relations(&self, rows: Vec<ExerciseRow>) -> AppResult<Vec<ExerciseDetail>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.exercise.id).collect();

        let muscle_groups = sqlx::query_as::<_, LinkedEntry>(
            "SELECT emg.exercise_id, mg.id, mg.name, mg.description
             FROM exercise_muscle_groups emg
             JOIN muscle_groups mg ON mg.id = emg.muscle_group_id
             WHERE emg.exercise_id = ANY($1)
             ORDER BY mg.name",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let equipment = sqlx::query_as::<_, LinkedEntry>(
            "SELECT ee.exercise_id, eq.id, eq.name, eq.description
             FROM exercise_equipment ee
             JOIN equipment eq ON eq.id = ee.equipment_id
             WHERE ee.exercise_id = ANY($1)
             ORDER BY eq.name",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut muscle_groups = group_by_exercise(muscle_groups);
        let mut equipment = group_by_exercise(equipment);

        Ok(rows
            .into_iter()
            .map(|row| ExerciseDetail {
                muscle_groups: muscle_groups.remove(&row.exercise.id).unwrap_or_default(),
                equipment: equipment.remove(&row.exercise.id).unwrap_or_default(),
                training_style: row.training_style,
                environment: row.environment,
                exercise: row.exercise,
            })
            .collect())
    }
}

fn group_by_exercise(entries: Vec<LinkedEntry>) -> HashMap<Uuid, Vec<CatalogEntry>> {
    let mut grouped: HashMap<Uuid, Vec<CatalogEntry>> = HashMap::new();
    for linked in entries {
        grouped.entry(linked.exercise_id).or_default().push(linked.entry);
    }
    grouped
}
