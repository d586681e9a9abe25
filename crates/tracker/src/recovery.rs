use chrono::{DateTime, Utc};
use rusqlite::Connection;
use shared::{
    calendar::Calendar,
    error::{ResultContext, StoreError},
    model::Workout,
    types::{LabelSet, MuscleGroup, StoredLabel},
};
use tracing::{debug, instrument};

/// Whole calendar days since `muscle` was last trained, 0 if trained today
/// and None if it never was.
///
/// Only the most recent matching workout counts so the order of `workouts`
/// doesn't matter. Workouts dated after `today` are skipped. A plain scan of
/// the newest workout first would stop at such a workout and return a
/// negative count (-1 for tomorrow) instead.
pub fn days_since_last_trained(
    muscle: MuscleGroup,
    workouts: &[Workout],
    today: DateTime<Utc>,
    calendar: &Calendar,
) -> Option<i64> {
    let today_day = calendar.day_of(today);

    workouts
        .iter()
        .filter(|w| w.muscle_groups.contains(&muscle))
        .filter(|w| calendar.day_of(w.date) <= today_day)
        .max_by_key(|w| w.date)
        .map(|w| calendar.days_between(w.date, today))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryStatus {
    pub muscle: MuscleGroup,
    pub days_since_trained: Option<i64>,
}

/// Reports recovery for the muscles the user chose to track
#[derive(Debug, Clone)]
pub struct RecoveryCalculator {
    tracked: LabelSet<MuscleGroup>,
    calendar: Calendar,
}

impl RecoveryCalculator {
    pub fn new(tracked: LabelSet<MuscleGroup>, calendar: Calendar) -> Self {
        Self { tracked, calendar }
    }

    /// Tracks every muscle group
    pub fn all(calendar: Calendar) -> Self {
        Self::new(MuscleGroup::ALL.iter().copied().collect(), calendar)
    }

    pub fn tracked(&self) -> &LabelSet<MuscleGroup> {
        &self.tracked
    }

    /// One status per tracked muscle, in label order
    pub fn report_for(&self, workouts: &[Workout], today: DateTime<Utc>) -> Vec<RecoveryStatus> {
        self.tracked
            .iter()
            .map(|&muscle| RecoveryStatus {
                muscle,
                days_since_trained: days_since_last_trained(muscle, workouts, today, &self.calendar),
            })
            .collect()
    }

    /// Reads the workout history. Templates are stored apart from workouts so
    /// they never count as training
    #[instrument(skip(self, conn))]
    pub fn report(&self, conn: &Connection, today: DateTime<Utc>) -> Result<Vec<RecoveryStatus>, StoreError> {
        let workouts = Workout::fetch_all_desc(conn).context("fetch Workout history")?;
        debug!(workouts = workouts.len());

        Ok(self.report_for(&workouts, today))
    }
}
