use std::io::Write;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use shared::{
    calendar::Calendar,
    model::{ExerciseDefinition, Model, NewExerciseEntry, WeightEntry, Workout},
    types::{LabelSet, MuscleGroup, UnitSystem},
};
use tracing::{debug, instrument};

use crate::{
    cli::{Cli, Command},
    errors::ErrorSink,
    library,
    recovery::RecoveryCalculator,
    seed::{Seeder, SqliteFlagStore},
    weight::{AggregatePolicy, WeightLog},
};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct App {
    pub calendar: Calendar,
    pub policy: AggregatePolicy,
    pub units: UnitSystem,
    pub tracked: LabelSet<MuscleGroup>,
}

impl App {
    pub fn from_args(args: &Cli) -> anyhow::Result<Self> {
        let calendar = Calendar::from_offset_minutes(args.utc_offset_minutes)
            .ok_or_else(|| anyhow!("UTC offset out of range: {} minutes", args.utc_offset_minutes))?;

        Ok(Self {
            calendar,
            policy: args.aggregate_policy,
            units: args.units,
            tracked: args.tracked_muscles.iter().copied().collect(),
        })
    }

    fn recovery(&self) -> RecoveryCalculator {
        if self.tracked.is_empty() {
            RecoveryCalculator::all(self.calendar)
        } else {
            RecoveryCalculator::new(self.tracked.clone(), self.calendar)
        }
    }

    fn weight_to_kg(&self, mut set: NewExerciseEntry) -> NewExerciseEntry {
        set.weight_kg = set.weight_kg.map(|w| self.units.to_kg(w));
        set
    }

    /// Runs a single command, writing human readable output to `out`. Core
    /// failures are reported to `sink` and don't stop the command
    #[instrument(skip(self, conn, sink, out))]
    pub fn run(
        &self,
        conn: &mut Connection,
        command: Command,
        sink: &dyn ErrorSink,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let now = Utc::now();

        match command {
            Command::RecordWeight { weight, date, goal } => {
                let kg = self.units.to_kg(weight);
                let mut log = WeightLog::new(conn, self.calendar, sink).with_policy(self.policy);
                if let Some(entry) = log.record_weight(date.unwrap_or(now), kg, goal) {
                    writeln!(out, "Recorded {} ({})", self.units.format_weight(entry.weight_kg), entry.id)?;
                }
            }
            Command::RemoveWeight { id } => {
                let entry = WeightEntry::fetch_by_id(conn, &id).with_context(|| format!("Weight entry {id}"))?;
                WeightLog::new(conn, self.calendar, sink).remove_weight(&entry);
                writeln!(out, "Removed {}", entry.id)?;
            }
            Command::ListWeights => {
                for entry in WeightEntry::fetch_all_desc(conn)? {
                    writeln!(
                        out,
                        "{}  {}  {}",
                        entry.id,
                        self.local(entry.date),
                        self.units.format_weight(entry.weight_kg)
                    )?;
                }
            }
            Command::RecordCalories {
                consumed,
                burned,
                date,
                goal,
            } => {
                let mut log = WeightLog::new(conn, self.calendar, sink);
                if let Some(day) = log.record_calories(date.unwrap_or(now), consumed, burned, goal) {
                    writeln!(out, "{}: net {} kcal", self.calendar.day_of(day.date), day.net_calories())?;
                }
            }
            Command::ShowDay { date } => {
                let date = date.unwrap_or(now);
                let log = WeightLog::new(conn, self.calendar, sink);
                writeln!(out, "{}", self.calendar.day_of(date))?;
                match log.aggregate_for_day(date)? {
                    Some(day) => {
                        let weight = day
                            .weight_kg
                            .map(|kg| self.units.format_weight(kg))
                            .unwrap_or_else(|| "-".to_owned());
                        let goal = day.goal_type.map(|g| g.to_string()).unwrap_or_else(|| "-".to_owned());
                        writeln!(out, "  weight: {weight}")?;
                        writeln!(
                            out,
                            "  calories: {} in, {} out, {} net",
                            day.calories_consumed,
                            day.calories_burned,
                            day.net_calories()
                        )?;
                        writeln!(out, "  goal: {goal}")?;
                    }
                    None => writeln!(out, "  nothing recorded")?,
                }
                for entry in log.entries_for_day(date)? {
                    writeln!(
                        out,
                        "  {}  {}  {}",
                        entry.id,
                        self.local(entry.date),
                        self.units.format_weight(entry.weight_kg)
                    )?;
                }
            }
            Command::LogWorkout {
                category,
                date,
                note,
                muscles,
                sets,
                cardio,
            } => {
                let mut workout = Workout::new(self.calendar.start_of_day(date.unwrap_or(now)), category, note);
                if !muscles.is_empty() {
                    workout.muscle_groups = muscles.into_iter().collect();
                }
                let entries: Vec<_> = sets
                    .into_iter()
                    .map(|s| self.weight_to_kg(s))
                    .chain(cardio)
                    .collect();

                let workout = Workout::create(conn, workout, &entries)?;
                writeln!(out, "Logged {} workout {}", workout.category, workout.id)?;
                for entry in workout.entries(conn)? {
                    let known = entry.definition(conn)?.is_some();
                    let marker = if known { "" } else { "  (not in library)" };
                    writeln!(out, "  {}  {}{marker}", entry.name, entry.summary())?;
                }
            }
            Command::EditWorkout { id, add, remove } => {
                let workout = Workout::fetch_by_id(conn, &id).with_context(|| format!("Workout {id}"))?;
                let mut muscles = workout.muscle_groups;
                for muscle in add {
                    muscles.insert(muscle);
                }
                for muscle in &remove {
                    muscles.remove(muscle);
                }
                let labels: Vec<String> = muscles.iter().map(|m| m.to_string()).collect();
                Workout::set_muscle_groups(conn, &id, muscles)?;
                writeln!(out, "Workout {id} trains {}", labels.join(", "))?;
            }
            Command::Recovery => {
                for status in self.recovery().report(conn, now)? {
                    match status.days_since_trained {
                        Some(days) => writeln!(out, "{:<10} {days} days", status.muscle)?,
                        None => writeln!(out, "{:<10} not yet trained", status.muscle)?,
                    }
                }
            }
            Command::Dedup => {
                let removed = library::deduplicate(conn, sink);
                writeln!(out, "Removed {removed} duplicate definitions")?;
            }
            Command::Seed => {
                let inserted = Seeder::new(SqliteFlagStore::new(conn)).ensure_seeded(conn, sink);
                writeln!(out, "Inserted {inserted} definitions")?;
            }
            Command::Library => {
                let definitions = ExerciseDefinition::fetch_all_in_insertion_order(conn)?;
                debug!(definitions = definitions.len());
                for definition in definitions {
                    let muscles: Vec<String> = definition.muscle_groups.iter().map(|m| m.to_string()).collect();
                    let kind = if definition.is_cardio { "cardio" } else { "strength" };
                    writeln!(out, "{:<24} {kind:<8} {}", definition.name, muscles.join(", "))?;
                }
            }
        }

        Ok(())
    }

    fn local(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.calendar.offset()).format("%F %R").to_string()
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;
    use crate::{db::test_connection, errors::RecordingErrorSink};

    fn run(app: &App, conn: &mut Connection, argv: &[&str]) -> String {
        let mut args = vec!["tracker"];
        args.extend_from_slice(argv);
        let cli = Cli::try_parse_from(args).unwrap();

        let sink = RecordingErrorSink::new();
        let mut out = Vec::new();
        app.run(conn, cli.command, &sink, &mut out).unwrap();
        assert!(sink.is_empty(), "{:?}", sink.reports());
        String::from_utf8(out).unwrap()
    }

    fn app(argv: &[&str]) -> App {
        let mut args = vec!["tracker"];
        args.extend_from_slice(argv);
        args.push("recovery");
        App::from_args(&Cli::try_parse_from(args).unwrap()).unwrap()
    }

    #[test]
    fn test_weight_commands_use_units() {
        let mut conn = test_connection();
        let app = app(&["--units", "imperial"]);

        let out = run(&app, &mut conn, &["record-weight", "176.4", "--date", "2024-03-01T08:00:00Z"]);
        assert!(out.starts_with("Recorded 176.4 lb"), "{out}");

        let entries = WeightEntry::fetch_all_desc(&conn).unwrap();
        assert!((entries[0].weight_kg - 80.0).abs() < 0.05);

        let out = run(&app, &mut conn, &["show-day", "--date", "2024-03-01T20:00:00Z"]);
        assert!(out.contains("weight: 176.4 lb"), "{out}");

        let id = entries[0].id.to_string();
        run(&app, &mut conn, &["remove-weight", &id]);
        let out = run(&app, &mut conn, &["show-day", "--date", "2024-03-01T20:00:00Z"]);
        assert!(out.contains("weight: -"), "{out}");
    }

    #[test]
    fn test_log_workout_and_recovery() {
        let mut conn = test_connection();
        let app = app(&["--tracked-muscles", "Chest,Legs"]);

        let out = run(
            &app,
            &mut conn,
            &["log-workout", "Push", "--set", "Bench Press,8,60", "--cardio", "Rowing,10,2"],
        );
        assert!(out.contains("Bench Press  8 x 60.0 kg"), "{out}");
        assert!(out.contains("Rowing  10 min, 2.00 km"), "{out}");

        let out = run(&app, &mut conn, &["recovery"]);
        assert_eq!(out, "Chest      0 days\nLegs       not yet trained\n");
    }

    #[test]
    fn test_edit_workout_muscles() {
        let mut conn = test_connection();
        let app = app(&["--tracked-muscles", "Chest,Legs"]);

        run(&app, &mut conn, &["log-workout", "Push", "--set", "Bench Press,8,60"]);
        let id = Workout::fetch_all_desc(&conn).unwrap()[0].id.to_string();

        let out = run(
            &app,
            &mut conn,
            &["edit-workout", &id, "--add", "Legs", "--remove", "Chest,Shoulders,Triceps"],
        );
        assert_eq!(out, format!("Workout {id} trains Legs\n"));

        let out = run(&app, &mut conn, &["recovery"]);
        assert_eq!(out, "Chest      not yet trained\nLegs       0 days\n");
    }

    #[test]
    fn test_sets_outside_library_are_marked() {
        let mut conn = test_connection();
        let app = app(&[]);
        run(&app, &mut conn, &["seed"]);

        let out = run(
            &app,
            &mut conn,
            &["log-workout", "Legs", "--set", "Squat,5,100", "--set", "Zercher Squat,5,80,paused"],
        );
        assert!(out.contains("Squat  5 x 100.0 kg\n"), "{out}");
        assert!(out.contains("Zercher Squat  5 x 80.0 kg  (not in library)\n"), "{out}");
    }

    #[test]
    fn test_seed_then_dedup() {
        let mut conn = test_connection();
        let app = app(&[]);

        assert!(run(&app, &mut conn, &["seed"]).starts_with("Inserted"));
        assert_eq!(run(&app, &mut conn, &["seed"]), "Inserted 0 definitions\n");
        assert_eq!(run(&app, &mut conn, &["dedup"]), "Removed 0 duplicate definitions\n");
        assert!(run(&app, &mut conn, &["library"]).contains("Squat"));
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        let cli = Cli::try_parse_from(["tracker", "--utc-offset-minutes", "100000", "dedup"]).unwrap();
        assert!(App::from_args(&cli).is_err());
    }
}
