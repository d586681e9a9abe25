use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::{Expr, Order};
use serde::{Deserialize, Serialize};

use crate::{
    error::ValidationError,
    model::{ExerciseDefinition, Model, ValidateModel},
    types::Uuid,
};

model!(
    "exercise_entry",
    /// One set performed within a workout. Deleted along with its workout
    pub struct ExerciseEntry {
        pub id: Uuid,
        pub workout_id: Uuid,
        /// Order of the set within the workout
        pub position: i64,
        /// Refers to an [`ExerciseDefinition`] by name. Not enforced, history
        /// outlives library entries
        pub name: String,
        pub reps: Option<i64>,
        pub weight_kg: Option<f64>,
        pub duration_minutes: Option<f64>,
        pub distance_km: Option<f64>,
        /// Selects which of the reps/weight or duration/distance pairs is used
        pub is_cardio: bool,
        pub note: String,
    }
);

/// The user supplied part of a set, shared by workouts and templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExerciseEntry {
    pub name: String,
    pub reps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    pub is_cardio: bool,
    pub note: String,
}

impl NewExerciseEntry {
    pub fn strength<S: Into<String>>(name: S, reps: i64, weight_kg: f64) -> Self {
        Self {
            name: name.into(),
            reps: Some(reps),
            weight_kg: Some(weight_kg),
            duration_minutes: None,
            distance_km: None,
            is_cardio: false,
            note: String::new(),
        }
    }

    pub fn cardio<S: Into<String>>(name: S, duration_minutes: f64, distance_km: Option<f64>) -> Self {
        Self {
            name: name.into(),
            reps: None,
            weight_kg: None,
            duration_minutes: Some(duration_minutes),
            distance_km,
            is_cardio: true,
            note: String::new(),
        }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = note.into();
        self
    }
}

impl ValidateModel for NewExerciseEntry {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut error_messages = vec![];
        if self.name.trim().is_empty() {
            error_messages.push("Exercise name can't be empty".to_owned());
        }
        if self.reps.is_some_and(|r| r < 0) {
            error_messages.push("Reps can't be negative".to_owned());
        }
        for (field, value) in [
            ("Weight", self.weight_kg),
            ("Duration", self.duration_minutes),
            ("Distance", self.distance_km),
        ] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                error_messages.push(format!("{field} must be a non-negative number"));
            }
        }

        if error_messages.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { error_messages })
        }
    }
}

impl ExerciseEntry {
    pub fn from_new(workout_id: Uuid, position: i64, new: &NewExerciseEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            workout_id,
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

    pub fn fetch_for_workout(
        conn: &Connection,
        workout_id: &Uuid,
    ) -> Result<Vec<ExerciseEntry>, rusqlite::Error> {
        Self::fetch_with(
            conn,
            Self::select_star()
                .and_where(Expr::col(ExerciseEntryIden::WorkoutId).eq(workout_id))
                .order_by(ExerciseEntryIden::Position, Order::Asc),
        )
    }

    /// Looks up the library entry this set was recorded against, if it still
    /// exists
    pub fn definition(&self, conn: &Connection) -> Result<Option<ExerciseDefinition>, rusqlite::Error> {
        ExerciseDefinition::fetch_by_name(conn, &self.name)
    }

    /// Short description of the active pair of metrics
    pub fn summary(&self) -> String {
        if self.is_cardio {
            match (self.duration_minutes, self.distance_km) {
                (Some(m), Some(km)) => format!("{m:.0} min, {km:.2} km"),
                (Some(m), None) => format!("{m:.0} min"),
                (None, Some(km)) => format!("{km:.2} km"),
                (None, None) => String::new(),
            }
        } else {
            match (self.reps, self.weight_kg) {
                (Some(r), Some(kg)) => format!("{r} x {kg:.1} kg"),
                (Some(r), None) => format!("{r} reps"),
                (None, Some(kg)) => format!("{kg:.1} kg"),
                (None, None) => String::new(),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_collects_every_problem() {
        let mut new = NewExerciseEntry::strength(" ", -1, 50.0);
        new.distance_km = Some(f64::INFINITY);

        let err = new.validate().unwrap_err();
        assert_eq!(err.error_messages.len(), 3);
        assert!(NewExerciseEntry::cardio("Run", 30.0, Some(5.0)).validate().is_ok());
    }

    #[test]
    fn test_summary_uses_active_pair() {
        let workout_id = Uuid::new_v4();
        let mut strength =
            ExerciseEntry::from_new(workout_id, 0, &NewExerciseEntry::strength("Squat", 5, 100.0));
        assert_eq!(strength.summary(), "5 x 100.0 kg");

        // Stale cardio fields are ignored while the set is in strength mode
        strength.duration_minutes = Some(12.0);
        assert_eq!(strength.summary(), "5 x 100.0 kg");

        let cardio =
            ExerciseEntry::from_new(workout_id, 1, &NewExerciseEntry::cardio("Row", 20.0, None));
        assert_eq!(cardio.summary(), "20 min");
    }
}
