use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use shared::{
    model::NewExerciseEntry,
    types::{GoalType, MuscleGroup, UnitSystem, Uuid, WorkoutCategory},
};

use crate::weight::AggregatePolicy;

#[derive(Debug, Clone, Parser)]
#[clap(name = "tracker", about = "Body weight, calorie and workout tracker")]
pub struct Cli {
    #[clap(long, env, default_value = "tracker.sqlite")]
    pub sqlite_connection_string: String,

    /// Offset from UTC used to decide which calendar day a timestamp is on
    #[arg(long, env, default_value = "0", allow_negative_numbers = true)]
    pub utc_offset_minutes: i32,

    #[arg(long, env, value_enum, default_value_t = AggregatePolicy::LastWrite)]
    pub aggregate_policy: AggregatePolicy,

    /// Units weights are entered and shown in
    #[arg(long, env, default_value = "Metric")]
    pub units: UnitSystem,

    /// Muscle groups included in the recovery report. All when empty
    #[arg(long, env, value_delimiter = ',')]
    pub tracked_muscles: Vec<MuscleGroup>,

    /// Deletes the database before starting the main program for debug purposes
    #[arg(long, env, default_value = "false")]
    pub debug_delete_database: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log a body weight measurement
    RecordWeight {
        weight: f64,
        /// When the measurement was taken, defaults to now
        #[arg(long)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        goal: Option<GoalType>,
    },
    /// Delete a weight entry and recompute its day
    RemoveWeight { id: Uuid },
    /// Every weight entry, latest first
    ListWeights,
    /// Set the calories consumed and burned for a day
    RecordCalories {
        consumed: i64,
        #[arg(default_value = "0")]
        burned: i64,
        #[arg(long)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        goal: Option<GoalType>,
    },
    /// Show the summary and weight entries of a day
    ShowDay {
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },
    /// Log a workout with its sets
    LogWorkout {
        category: WorkoutCategory,
        #[arg(long)]
        date: Option<DateTime<Utc>>,
        #[arg(long, default_value = "")]
        note: String,
        /// Overrides the muscle groups implied by the category
        #[arg(long, value_delimiter = ',')]
        muscles: Vec<MuscleGroup>,
        /// A strength set as `name,reps,weight[,note]`
        #[arg(long = "set", value_parser = parse_strength_set)]
        sets: Vec<NewExerciseEntry>,
        /// A cardio set as `name,minutes[,km[,note]]`
        #[arg(long = "cardio", value_parser = parse_cardio_set)]
        cardio: Vec<NewExerciseEntry>,
    },
    /// Change the muscle groups a logged workout counts towards
    EditWorkout {
        id: Uuid,
        #[arg(long, value_delimiter = ',')]
        add: Vec<MuscleGroup>,
        #[arg(long, value_delimiter = ',')]
        remove: Vec<MuscleGroup>,
    },
    /// Days since each tracked muscle group was last trained
    Recovery,
    /// Remove exercise definitions that share a name
    Dedup,
    /// Write the default exercise library if it hasn't been written yet
    Seed,
    /// List the exercise library
    Library,
}

fn split_fields(s: &str, min: usize, max: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = s.split(',').map(str::trim).collect();
    if fields.len() < min || fields.len() > max || fields[0].is_empty() {
        return Err(format!("Expected {min} to {max} comma separated fields, got {s:?}"));
    }
    Ok(fields)
}

fn parse_number<T: std::str::FromStr>(field: &str, what: &str) -> Result<T, String> {
    field
        .parse()
        .map_err(|_| format!("Invalid {what}: {field:?}"))
}

/// Weights are in the units given on the command line and converted later
pub fn parse_strength_set(s: &str) -> Result<NewExerciseEntry, String> {
    let fields = split_fields(s, 3, 4)?;
    let set = NewExerciseEntry::strength(
        fields[0],
        parse_number(fields[1], "reps")?,
        parse_number(fields[2], "weight")?,
    );
    Ok(match fields.get(3) {
        Some(note) => set.with_note(*note),
        None => set,
    })
}

/// An empty distance field skips the distance but still allows a note
pub fn parse_cardio_set(s: &str) -> Result<NewExerciseEntry, String> {
    let fields = split_fields(s, 2, 4)?;
    let distance_km = fields
        .get(2)
        .filter(|km| !km.is_empty())
        .map(|km| parse_number(km, "distance"))
        .transpose()?;
    let set = NewExerciseEntry::cardio(fields[0], parse_number(fields[1], "minutes")?, distance_km);
    Ok(match fields.get(3) {
        Some(note) => set.with_note(*note),
        None => set,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_sets() {
        let set = parse_strength_set("Bench Press, 8, 62.5").unwrap();
        assert_eq!(set, NewExerciseEntry::strength("Bench Press", 8, 62.5));

        let run = parse_cardio_set("Running,30,5.2").unwrap();
        assert_eq!(run, NewExerciseEntry::cardio("Running", 30.0, Some(5.2)));
        assert_eq!(
            parse_cardio_set("Cycling,45").unwrap(),
            NewExerciseEntry::cardio("Cycling", 45.0, None)
        );

        assert_eq!(
            parse_strength_set("Squat,5,100,paused reps").unwrap().note,
            "paused reps"
        );
        assert_eq!(
            parse_cardio_set("Running,30,,intervals").unwrap(),
            NewExerciseEntry::cardio("Running", 30.0, None).with_note("intervals")
        );

        assert!(parse_strength_set("Squat,5").is_err());
        assert!(parse_strength_set(",5,100").is_err());
        assert!(parse_strength_set("Squat,five,100").is_err());
    }

    #[test]
    fn test_parse_cli() {
        let cli = Cli::try_parse_from([
            "tracker",
            "--utc-offset-minutes",
            "-300",
            "--aggregate-policy",
            "latest-timestamp",
            "--tracked-muscles",
            "chest,Legs",
            "log-workout",
            "push",
            "--set",
            "Bench Press,8,60",
            "--cardio",
            "Rowing,10",
        ])
        .unwrap();

        assert_eq!(cli.utc_offset_minutes, -300);
        assert_eq!(cli.aggregate_policy, AggregatePolicy::LatestTimestamp);
        assert_eq!(cli.tracked_muscles, vec![MuscleGroup::Chest, MuscleGroup::Legs]);
        match cli.command {
            Command::LogWorkout {
                category,
                sets,
                cardio,
                ..
            } => {
                assert_eq!(category, WorkoutCategory::Push);
                assert_eq!(sets.len(), 1);
                assert_eq!(cardio.len(), 1);
            }
            other => panic!("Unexpected command {other:?}"),
        }
    }
}
