use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::CatalogKind;

const MUSCLE_GROUPS: &[(&str, &str)] = &[
    ("Chest", "Pectoralis major and minor"),
    ("Back", "Latissimus dorsi, rhomboids and trapezius"),
    ("Shoulders", "Deltoids"),
    ("Biceps", "Front of the upper arm"),
    ("Triceps", "Back of the upper arm"),
    ("Core", "Abdominals and obliques"),
    ("Quadriceps", "Front of the thigh"),
    ("Hamstrings", "Back of the thigh"),
    ("Glutes", "Gluteus maximus, medius and minimus"),
    ("Calves", "Gastrocnemius and soleus"),
];

const EQUIPMENT: &[(&str, &str)] = &[
    ("None", "Bodyweight only"),
    ("Dumbbells", "Pair of free weights"),
    ("Barbell", "Olympic bar with plates"),
    ("Kettlebell", "Cast iron ball with handle"),
    ("Resistance Band", "Elastic band"),
    ("Pull-up Bar", "Fixed overhead bar"),
    ("Bench", "Flat or adjustable bench"),
];

const TRAINING_STYLES: &[(&str, &str)] = &[
    ("Strength", "Heavy loads, low repetitions"),
    ("Hypertrophy", "Moderate loads, moderate repetitions"),
    ("Endurance", "Light loads, high repetitions"),
    ("HIIT", "Short intervals at high intensity"),
    ("Mobility", "Range of motion and flexibility work"),
];

const ENVIRONMENTS: &[(&str, &str)] = &[
    ("Gym", "Full equipment available"),
    ("Home", "Limited equipment"),
    ("Outdoor", "Parks and open spaces"),
];

struct ExerciseSeed {
    name: &'static str,
    description: &'static str,
    training_style: &'static str,
    environment: &'static str,
    muscle_groups: &'static [&'static str],
    equipment: &'static [&'static str],
}

const EXERCISES: &[ExerciseSeed] = &[
    ExerciseSeed {
        name: "Push-up",
        description: "Lower the chest to the floor and press back up",
        training_style: "Endurance",
        environment: "Home",
        muscle_groups: &["Chest", "Triceps", "Core"],
        equipment: &["None"],
    },
    ExerciseSeed {
        name: "Bodyweight Squat",
        description: "Sit the hips back and down, then stand up",
        training_style: "Endurance",
        environment: "Home",
        muscle_groups: &["Quadriceps", "Glutes"],
        equipment: &["None"],
    },
    ExerciseSeed {
        name: "Barbell Back Squat",
        description: "Squat with the bar across the upper back",
        training_style: "Strength",
        environment: "Gym",
        muscle_groups: &["Quadriceps", "Glutes", "Hamstrings"],
        equipment: &["Barbell"],
    },
    ExerciseSeed {
        name: "Bench Press",
        description: "Press the bar from the chest while lying on a bench",
        training_style: "Strength",
        environment: "Gym",
        muscle_groups: &["Chest", "Shoulders", "Triceps"],
        equipment: &["Barbell", "Bench"],
    },
    ExerciseSeed {
        name: "Deadlift",
        description: "Lift the bar from the floor to hip height",
        training_style: "Strength",
        environment: "Gym",
        muscle_groups: &["Back", "Hamstrings", "Glutes"],
        equipment: &["Barbell"],
    },
    ExerciseSeed {
        name: "Pull-up",
        description: "Hang from the bar and pull the chin over it",
        training_style: "Strength",
        environment: "Gym",
        muscle_groups: &["Back", "Biceps"],
        equipment: &["Pull-up Bar"],
    },
    ExerciseSeed {
        name: "Dumbbell Shoulder Press",
        description: "Press dumbbells overhead from shoulder height",
        training_style: "Hypertrophy",
        environment: "Gym",
        muscle_groups: &["Shoulders", "Triceps"],
        equipment: &["Dumbbells"],
    },
    ExerciseSeed {
        name: "Dumbbell Curl",
        description: "Curl dumbbells from full extension to the shoulders",
        training_style: "Hypertrophy",
        environment: "Home",
        muscle_groups: &["Biceps"],
        equipment: &["Dumbbells"],
    },
    ExerciseSeed {
        name: "Kettlebell Swing",
        description: "Hinge at the hips and drive the bell to chest height",
        training_style: "HIIT",
        environment: "Home",
        muscle_groups: &["Glutes", "Hamstrings", "Core"],
        equipment: &["Kettlebell"],
    },
    ExerciseSeed {
        name: "Walking Lunge",
        description: "Alternate forward lunges while walking",
        training_style: "Endurance",
        environment: "Outdoor",
        muscle_groups: &["Quadriceps", "Glutes"],
        equipment: &["None"],
    },
    ExerciseSeed {
        name: "Plank",
        description: "Hold a straight line from head to heels on the forearms",
        training_style: "Endurance",
        environment: "Home",
        muscle_groups: &["Core"],
        equipment: &["None"],
    },
    ExerciseSeed {
        name: "Calf Raise",
        description: "Rise onto the toes and lower under control",
        training_style: "Endurance",
        environment: "Home",
        muscle_groups: &["Calves"],
        equipment: &["None"],
    },
    ExerciseSeed {
        name: "Burpee",
        description: "Squat, kick back to a plank, return and jump",
        training_style: "HIIT",
        environment: "Outdoor",
        muscle_groups: &["Chest", "Quadriceps", "Core"],
        equipment: &["None"],
    },
    ExerciseSeed {
        name: "Band Pull-apart",
        description: "Pull a band apart at shoulder height",
        training_style: "Mobility",
        environment: "Home",
        muscle_groups: &["Back", "Shoulders"],
        equipment: &["Resistance Band"],
    },
];

/// Loads the reference catalog. Safe to run on every start: rows that already
/// exist (matched by name) are left untouched.
pub struct CatalogSeeder {
    pool: PgPool,
}

impl CatalogSeeder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn seed_all(&self) -> Result<()> {
        tracing::info!("Starting catalog seeding...");
        let mut tx = self.pool.begin().await?;

        seed_entries(&mut tx, CatalogKind::MuscleGroup, MUSCLE_GROUPS).await?;
        seed_entries(&mut tx, CatalogKind::Equipment, EQUIPMENT).await?;
        seed_entries(&mut tx, CatalogKind::TrainingStyle, TRAINING_STYLES).await?;
        seed_entries(&mut tx, CatalogKind::WorkoutEnvironment, ENVIRONMENTS).await?;

        let mut inserted = 0;
        for seed in EXERCISES {
            if seed_exercise(&mut tx, seed).await? {
                inserted += 1;
            }
        }

        tx.commit().await?;
        tracing::info!("Catalog seeding completed ({} new exercises)", inserted);
        Ok(())
    }
}

async fn seed_entries(conn: &mut PgConnection, kind: CatalogKind, entries: &[(&str, &str)]) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (id, name, description) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        kind.table()
    );

    for (name, description) in entries {
        sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(*name)
            .bind(*description)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("seeding {} {:?}", kind.table(), name))?;
    }

    Ok(())
}

async fn lookup_id(conn: &mut PgConnection, kind: CatalogKind, name: &str) -> Result<Uuid> {
    let id: Option<Uuid> = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE name = $1", kind.table()))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    id.with_context(|| format!("{} {:?} missing from catalog", kind.table(), name))
}

/// Returns whether the exercise was newly inserted
async fn seed_exercise(conn: &mut PgConnection, seed: &ExerciseSeed) -> Result<bool> {
    let style_id = lookup_id(conn, CatalogKind::TrainingStyle, seed.training_style).await?;
    let environment_id = lookup_id(conn, CatalogKind::WorkoutEnvironment, seed.environment).await?;

    let exercise_id: Option<Uuid> = sqlx::query_scalar(
        "INSERT INTO exercises (id, name, description, training_style_id, environment_id)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (name) DO NOTHING
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(seed.name)
    .bind(seed.description)
    .bind(style_id)
    .bind(environment_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(exercise_id) = exercise_id else {
        return Ok(false);
    };

    for muscle_group in seed.muscle_groups {
        let muscle_group_id = lookup_id(conn, CatalogKind::MuscleGroup, muscle_group).await?;
        sqlx::query("INSERT INTO exercise_muscle_groups (exercise_id, muscle_group_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(exercise_id)
            .bind(muscle_group_id)
            .execute(&mut *conn)
            .await?;
    }

    for equipment in seed.equipment {
        let equipment_id = lookup_id(conn, CatalogKind::Equipment, equipment).await?;
        sqlx::query("INSERT INTO exercise_equipment (exercise_id, equipment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(exercise_id)
            .bind(equipment_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(true)
}
