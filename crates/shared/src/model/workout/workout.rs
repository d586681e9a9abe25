use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::Order;

use crate::{
    error::{ResultContext, StoreError},
    model::{ExerciseEntry, Model, NewExerciseEntry, ValidateModel},
    types::{MuscleGroups, Uuid, WorkoutCategory},
};

model!(
    "workout",
    /// One training session. Owns its [`ExerciseEntry`] rows
    pub struct Workout {
        pub id: Uuid,
        /// Start of the day the workout happened on
        pub date: DateTime<Utc>,
        pub category: WorkoutCategory,
        /// Filled from the category when created, editable afterwards
        pub muscle_groups: MuscleGroups,
        pub note: String,
        pub creation_date: DateTime<Utc>,
    }
);

impl Workout {
    /// `day_start` must already be normalized to the start of the day
    pub fn new<S: Into<String>>(day_start: DateTime<Utc>, category: WorkoutCategory, note: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: day_start,
            category,
            muscle_groups: category.default_muscle_groups(),
            note: note.into(),
            creation_date: Utc::now(),
        }
    }

    /// Inserts the workout and its sets in a single transaction
    pub fn create(
        conn: &mut Connection,
        workout: Workout,
        entries: &[NewExerciseEntry],
    ) -> Result<Workout, StoreError> {
        for entry in entries {
            entry.validate()?;
        }

        let tx = conn.transaction()?;
        let workout = {
            workout.insert(&tx).context("Workout::create(Workout)")?;
            for (position, entry) in entries.iter().enumerate() {
                ExerciseEntry::from_new(workout.id, position as i64, entry)
                    .insert(&tx)
                    .context("Workout::create(ExerciseEntry)")?;
            }
            Workout::fetch_by_id(&tx, &workout.id).context("Workout::create(fetch)")?
        };
        tx.commit()?;

        Ok(workout)
    }

    /// Every workout, most recent first
    pub fn fetch_all_desc(conn: &Connection) -> Result<Vec<Workout>, rusqlite::Error> {
        Self::fetch_with(
            conn,
            Self::select_star()
                .order_by(WorkoutIden::Date, Order::Desc)
                .order_by(WorkoutIden::CreationDate, Order::Desc),
        )
    }

    pub fn entries(&self, conn: &Connection) -> Result<Vec<ExerciseEntry>, rusqlite::Error> {
        ExerciseEntry::fetch_for_workout(conn, &self.id)
    }

    pub fn set_muscle_groups(
        conn: &Connection,
        id: &Uuid,
        muscle_groups: MuscleGroups,
    ) -> Result<usize, rusqlite::Error> {
        Self::update_by_id(conn, id, vec![(WorkoutIden::MuscleGroups, muscle_groups.into())])
    }

    /// Deletes the workout, its sets go with it
    pub fn delete(conn: &Connection, id: &Uuid) -> Result<usize, rusqlite::Error> {
        Self::delete_by_id(conn, id)
    }
}
