use std::collections::HashSet;

use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use shared::{
    error::{ResultContext, StoreError},
    model::{ExerciseDefinition, Flag},
    types::{MuscleGroup, MuscleGroups},
};
use tracing::{debug, info, instrument};

use crate::errors::ErrorSink;

/// Set once the default exercise library has been written
pub const LIBRARY_SEEDED_FLAG: &str = "library_seeded";

/// Persistent one-shot markers used to gate first run side effects
pub trait FlagStore {
    fn has_flag(&self, name: &str) -> Result<bool, StoreError>;
    fn set_flag(&mut self, name: &str) -> Result<(), StoreError>;
}

/// Flags kept in the `flag` table of the tracker database
pub struct SqliteFlagStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteFlagStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl FlagStore for SqliteFlagStore<'_> {
    fn has_flag(&self, name: &str) -> Result<bool, StoreError> {
        Ok(Flag::fetch_by_name(self.conn, name)
            .context("Flag::fetch_by_name")?
            .is_some())
    }

    fn set_flag(&mut self, name: &str) -> Result<(), StoreError> {
        if !self.has_flag(name)? {
            Flag::new(name).insert(self.conn).context("insert Flag")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: HashSet<String>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn has_flag(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.flags.contains(name))
    }

    fn set_flag(&mut self, name: &str) -> Result<(), StoreError> {
        self.flags.insert(name.to_owned());
        Ok(())
    }
}

/// Exercises every new library starts with: name, muscle groups, cardio
pub const DEFAULT_LIBRARY: &[(&str, &[MuscleGroup], bool)] = &[
    ("Bench Press", &[MuscleGroup::Chest, MuscleGroup::Triceps, MuscleGroup::Shoulders], false),
    ("Incline Dumbbell Press", &[MuscleGroup::Chest, MuscleGroup::Shoulders], false),
    ("Push Up", &[MuscleGroup::Chest, MuscleGroup::Triceps], false),
    ("Overhead Press", &[MuscleGroup::Shoulders, MuscleGroup::Triceps], false),
    ("Lateral Raise", &[MuscleGroup::Shoulders], false),
    ("Tricep Pushdown", &[MuscleGroup::Triceps], false),
    ("Pull Up", &[MuscleGroup::Back, MuscleGroup::Biceps], false),
    ("Barbell Row", &[MuscleGroup::Back, MuscleGroup::Biceps], false),
    ("Lat Pulldown", &[MuscleGroup::Back, MuscleGroup::Biceps], false),
    ("Bicep Curl", &[MuscleGroup::Biceps], false),
    ("Deadlift", &[MuscleGroup::Back, MuscleGroup::Legs, MuscleGroup::Glutes], false),
    ("Squat", &[MuscleGroup::Legs, MuscleGroup::Glutes], false),
    ("Lunge", &[MuscleGroup::Legs, MuscleGroup::Glutes], false),
    ("Leg Press", &[MuscleGroup::Legs], false),
    ("Hip Thrust", &[MuscleGroup::Glutes], false),
    ("Plank", &[MuscleGroup::Core], false),
    ("Crunch", &[MuscleGroup::Core], false),
    ("Running", &[MuscleGroup::Legs], true),
    ("Cycling", &[MuscleGroup::Legs], true),
    ("Rowing", &[MuscleGroup::Back, MuscleGroup::Legs], true),
    ("Jump Rope", &[], true),
];

/// Writes the default exercise library exactly once per flag store
pub struct Seeder<F: FlagStore> {
    flags: F,
}

impl<F: FlagStore> Seeder<F> {
    pub fn new(flags: F) -> Self {
        Self { flags }
    }

    pub fn into_flags(self) -> F {
        self.flags
    }

    /// Returns the number of definitions inserted, 0 if already seeded or on
    /// failure. Failures are reported to the sink
    pub fn ensure_seeded(&mut self, conn: &Connection, sink: &dyn ErrorSink) -> usize {
        self.try_ensure_seeded(conn).unwrap_or_else(|e| {
            sink.report("ensure_seeded", &e);
            0
        })
    }

    /// Names already in the library are skipped so a library that was partly
    /// filled elsewhere doesn't end up with duplicates
    #[instrument(skip_all)]
    pub fn try_ensure_seeded(&mut self, conn: &Connection) -> Result<usize, StoreError> {
        if self.flags.has_flag(LIBRARY_SEEDED_FLAG)? {
            debug!("Library already seeded");
            return Ok(0);
        }

        // The flag store may share this connection so a borrowing transaction
        // is used
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        for &(name, muscles, is_cardio) in DEFAULT_LIBRARY {
            if ExerciseDefinition::count_by_name(&tx, name).context("count ExerciseDefinition")? > 0 {
                continue;
            }
            ExerciseDefinition::new(name, muscles.iter().copied().collect::<MuscleGroups>(), is_cardio)
                .insert(&tx)
                .with_context(|| format!("insert ExerciseDefinition {name:?}"))?;
            inserted += 1;
        }
        tx.commit()?;

        self.flags.set_flag(LIBRARY_SEEDED_FLAG)?;
        info!(inserted, "Seeded exercise library");

        Ok(inserted)
    }
}
