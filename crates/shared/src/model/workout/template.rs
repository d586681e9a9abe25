use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::{Expr, Order};

use crate::{
    error::{ResultContext, StoreError},
    model::{Model, NewExerciseEntry, ValidateModel, Workout},
    types::{MuscleGroups, Uuid, WorkoutCategory},
};

model!(
    "workout_template",
    /// A reusable workout blueprint. Only used to pre-populate new workouts,
    /// never counted as training history
    pub struct WorkoutTemplate {
        pub id: Uuid,
        pub name: String,
        pub category: WorkoutCategory,
        pub muscle_groups: MuscleGroups,
        pub note: String,
        pub creation_date: DateTime<Utc>,
    }
);

model!(
    "template_exercise_entry",
    pub struct TemplateExerciseEntry {
        pub id: Uuid,
        pub template_id: Uuid,
        pub position: i64,
        pub name: String,
        pub reps: Option<i64>,
        pub weight_kg: Option<f64>,
        pub duration_minutes: Option<f64>,
        pub distance_km: Option<f64>,
        pub is_cardio: bool,
        pub note: String,
    }
);

impl From<&TemplateExerciseEntry> for NewExerciseEntry {
    fn from(value: &TemplateExerciseEntry) -> Self {
        Self {
            name: value.name.clone(),
            reps: value.reps,
            weight_kg: value.weight_kg,
            duration_minutes: value.duration_minutes,
            distance_km: value.distance_km,
            is_cardio: value.is_cardio,
            note: value.note.clone(),
        }
    }
}

impl TemplateExerciseEntry {
    pub fn from_new(template_id: Uuid, position: i64, new: &NewExerciseEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_id,
            position,
            name: new.name.clone(),
            reps: new.reps,
            weight_kg: new.weight_kg,
            duration_minutes: new.duration_minutes,
            distance_km: new.distance_km,
            is_cardio: new.is_cardio,
            note: new.note.clone(),
        }
    }
}

impl WorkoutTemplate {
    pub fn new<S: Into<String>>(name: S, category: WorkoutCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            muscle_groups: category.default_muscle_groups(),
            note: String::new(),
            creation_date: Utc::now(),
        }
    }

    pub fn create(
        conn: &mut Connection,
        template: WorkoutTemplate,
        entries: &[NewExerciseEntry],
    ) -> Result<WorkoutTemplate, StoreError> {
        for entry in entries {
            entry.validate()?;
        }

        let tx = conn.transaction()?;
        let template = {
            template.insert(&tx).context("WorkoutTemplate::create(WorkoutTemplate)")?;
            for (position, entry) in entries.iter().enumerate() {
                TemplateExerciseEntry::from_new(template.id, position as i64, entry)
                    .insert(&tx)
                    .context("WorkoutTemplate::create(TemplateExerciseEntry)")?;
            }
            WorkoutTemplate::fetch_by_id(&tx, &template.id).context("WorkoutTemplate::create(fetch)")?
        };
        tx.commit()?;

        Ok(template)
    }

    pub fn entries(&self, conn: &Connection) -> Result<Vec<TemplateExerciseEntry>, rusqlite::Error> {
        TemplateExerciseEntry::fetch_with(
            conn,
            TemplateExerciseEntry::select_star()
                .and_where(Expr::col(TemplateExerciseEntryIden::TemplateId).eq(self.id))
                .order_by(TemplateExerciseEntryIden::Position, Order::Asc),
        )
    }

    /// Creates a new workout on `day_start` pre-populated from this template.
    /// The template itself is left untouched
    pub fn instantiate<S: Into<String>>(
        &self,
        conn: &mut Connection,
        day_start: DateTime<Utc>,
        note: S,
    ) -> Result<Workout, StoreError> {
        let entries = self
            .entries(conn)
            .context("WorkoutTemplate::instantiate(entries)")?
            .iter()
            .map(NewExerciseEntry::from)
            .collect::<Vec<_>>();

        let mut workout = Workout::new(day_start, self.category, note);
        workout.muscle_groups = self.muscle_groups.clone();

        Workout::create(conn, workout, &entries)
    }
}
