//! Keeps the per day aggregates in step with the individual weight entries.
//!
//! Each calendar day has at most one [`DailyAggregate`] and its weight is the
//! weight of the latest surviving [`WeightEntry`] of that day, or nothing when
//! every entry of the day has been removed.

use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use shared::{
    calendar::Calendar,
    error::{ResultContext, StoreError},
    model::{DailyAggregate, Model, ValidateModel, WeightEntry},
    types::GoalType,
};
use tracing::{debug, info, instrument};

use crate::errors::ErrorSink;

/// How a newly recorded weight updates the day's aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AggregatePolicy {
    /// The weight just recorded always becomes the day's weight, even when an
    /// entry with a later timestamp already exists for that day
    #[default]
    LastWrite,
    /// The day's weight is taken from the entry with the latest timestamp
    LatestTimestamp,
}

pub struct WeightLog<'a> {
    conn: &'a mut Connection,
    calendar: Calendar,
    policy: AggregatePolicy,
    sink: &'a dyn ErrorSink,
}

impl<'a> WeightLog<'a> {
    pub fn new(conn: &'a mut Connection, calendar: Calendar, sink: &'a dyn ErrorSink) -> Self {
        Self {
            conn,
            calendar,
            policy: AggregatePolicy::default(),
            sink,
        }
    }

    pub fn with_policy(mut self, policy: AggregatePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn conn(&self) -> &Connection {
        &*self.conn
    }

    /// Records a measurement and updates the aggregate for its day. Failures
    /// are reported to the sink and nothing is returned
    pub fn record_weight(
        &mut self,
        date: DateTime<Utc>,
        weight_kg: f64,
        goal_type: Option<GoalType>,
    ) -> Option<WeightEntry> {
        self.try_record_weight(date, weight_kg, goal_type)
            .map_err(|e| self.sink.report("record_weight", &e))
            .ok()
    }

    /// The entry and the aggregate change are committed together or not at all
    #[instrument(skip(self))]
    pub fn try_record_weight(
        &mut self,
        date: DateTime<Utc>,
        weight_kg: f64,
        goal_type: Option<GoalType>,
    ) -> Result<WeightEntry, StoreError> {
        let entry = WeightEntry::new(date, weight_kg);
        entry.validate()?;

        let (day_start, day_end) = self.calendar.day_bounds(date);
        let policy = self.policy;

        let tx = self.conn.transaction()?;

        entry.insert(&tx).context("insert WeightEntry")?;

        let day_weight = match policy {
            AggregatePolicy::LastWrite => weight_kg,
            AggregatePolicy::LatestTimestamp => WeightEntry::fetch_between_desc(&tx, day_start, day_end)
                .context("fetch day entries")?
                .first()
                .map_or(weight_kg, |latest| latest.weight_kg),
        };

        match DailyAggregate::fetch_for_day(&tx, day_start).context("fetch DailyAggregate")? {
            Some(aggregate) => {
                DailyAggregate::set_weight(&tx, &aggregate.id, Some(day_weight))
                    .context("update DailyAggregate weight")?;
                // Never overwrite a goal that was already recorded for the day
                if aggregate.goal_type.is_none() && goal_type.is_some() {
                    DailyAggregate::set_goal_type(&tx, &aggregate.id, goal_type)
                        .context("backfill DailyAggregate goal")?;
                }
            }
            None => {
                let mut aggregate = DailyAggregate::new(day_start);
                aggregate.weight_kg = Some(day_weight);
                aggregate.goal_type = goal_type;
                aggregate.insert(&tx).context("insert DailyAggregate")?;
            }
        }

        tx.commit()?;
        info!(id = %entry.id, %day_start, day_weight, "Recorded weight");

        Ok(entry)
    }

    /// Deletes an entry and repairs its day's aggregate. Failures are reported
    /// to the sink and swallowed, which can leave the entry deleted but the
    /// aggregate stale
    pub fn remove_weight(&mut self, entry: &WeightEntry) {
        if let Err(e) = self.try_remove_weight(entry) {
            self.sink.report("remove_weight", &e);
        }
    }

    /// Returns the repaired aggregate, or None if the day had no aggregate
    #[instrument(skip(self), fields(id = %entry.id, date = %entry.date))]
    pub fn try_remove_weight(&mut self, entry: &WeightEntry) -> Result<Option<DailyAggregate>, StoreError> {
        let deleted = WeightEntry::delete_by_id(self.conn(), &entry.id).context("delete WeightEntry")?;
        debug!(deleted);

        self.repair_day(entry.date)
    }

    /// Sets the aggregate's weight from the latest entry still present for the
    /// day containing `date`. The aggregate itself is never deleted since it
    /// also holds the day's calories
    fn repair_day(&self, date: DateTime<Utc>) -> Result<Option<DailyAggregate>, StoreError> {
        let (day_start, day_end) = self.calendar.day_bounds(date);

        let Some(aggregate) =
            DailyAggregate::fetch_for_day(self.conn(), day_start).context("fetch DailyAggregate")?
        else {
            debug!(%day_start, "No aggregate to repair");
            return Ok(None);
        };

        let remaining = WeightEntry::fetch_between_desc(self.conn(), day_start, day_end)
            .context("fetch remaining entries")?;
        let weight_kg = remaining.first().map(|latest| latest.weight_kg);

        DailyAggregate::set_weight(self.conn(), &aggregate.id, weight_kg)
            .context("update DailyAggregate weight")?;
        info!(%day_start, ?weight_kg, remaining = remaining.len(), "Repaired aggregate");

        Ok(Some(
            DailyAggregate::fetch_by_id(self.conn(), &aggregate.id).context("refetch DailyAggregate")?,
        ))
    }

    /// Sets the calories for the day containing `date`, creating the day's
    /// aggregate if needed
    pub fn record_calories(
        &mut self,
        date: DateTime<Utc>,
        consumed: i64,
        burned: i64,
        goal_type: Option<GoalType>,
    ) -> Option<DailyAggregate> {
        self.try_record_calories(date, consumed, burned, goal_type)
            .map_err(|e| self.sink.report("record_calories", &e))
            .ok()
    }

    #[instrument(skip(self))]
    pub fn try_record_calories(
        &mut self,
        date: DateTime<Utc>,
        consumed: i64,
        burned: i64,
        goal_type: Option<GoalType>,
    ) -> Result<DailyAggregate, StoreError> {
        let day_start = self.calendar.start_of_day(date);
        let tx = self.conn.transaction()?;

        let id = match DailyAggregate::fetch_for_day(&tx, day_start).context("fetch DailyAggregate")? {
            Some(aggregate) => {
                DailyAggregate::set_calories(&tx, &aggregate.id, consumed, burned)
                    .context("update DailyAggregate calories")?;
                if aggregate.goal_type.is_none() && goal_type.is_some() {
                    DailyAggregate::set_goal_type(&tx, &aggregate.id, goal_type)
                        .context("backfill DailyAggregate goal")?;
                }
                aggregate.id
            }
            None => {
                let mut aggregate = DailyAggregate::new(day_start);
                aggregate.calories_consumed = consumed;
                aggregate.calories_burned = burned;
                aggregate.goal_type = goal_type;
                aggregate.insert(&tx).context("insert DailyAggregate")?;
                aggregate.id
            }
        };

        let aggregate = DailyAggregate::fetch_by_id(&tx, &id).context("refetch DailyAggregate")?;
        tx.commit()?;

        Ok(aggregate)
    }

    pub fn aggregate_for_day(&self, date: DateTime<Utc>) -> Result<Option<DailyAggregate>, StoreError> {
        Ok(DailyAggregate::fetch_for_day(
            self.conn(),
            self.calendar.start_of_day(date),
        )?)
    }

    /// Entries for the day containing `date`, latest first
    pub fn entries_for_day(&self, date: DateTime<Utc>) -> Result<Vec<WeightEntry>, StoreError> {
        let (day_start, day_end) = self.calendar.day_bounds(date);
        Ok(WeightEntry::fetch_between_desc(self.conn(), day_start, day_end)?)
    }

    pub fn all_entries(&self) -> Result<Vec<WeightEntry>, StoreError> {
        Ok(WeightEntry::fetch_all_desc(self.conn())?)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::{db::test_connection, errors::RecordingErrorSink};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn aggregates(conn: &Connection) -> Vec<DailyAggregate> {
        DailyAggregate::fetch_all_desc(conn).unwrap()
    }

    #[test]
    fn test_one_aggregate_per_day() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        for date in [
            "2024-03-01T07:00:00Z",
            "2024-03-01T21:00:00Z",
            "2024-03-02T08:00:00Z",
            "2024-03-01T12:00:00Z",
            "2024-03-05T23:59:59Z",
            "2024-03-02T00:00:00Z",
        ] {
            assert!(log.record_weight(ts(date), 80.0, None).is_some());
        }
        drop(log);

        let aggregates = aggregates(&conn);
        let days: HashSet<_> = aggregates.iter().map(|a| a.date).collect();
        assert_eq!(aggregates.len(), 3);
        assert_eq!(days.len(), 3);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_record_sets_aggregate_to_new_value() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        log.record_weight(ts("2024-03-01T07:00:00Z"), 81.2, Some(GoalType::Cutting));
        let day = log.aggregate_for_day(ts("2024-03-01T15:00:00Z")).unwrap().unwrap();
        assert_eq!(day.weight_kg, Some(81.2));
        assert_eq!(day.date, ts("2024-03-01T00:00:00Z"));
        assert_eq!(day.goal_type, Some(GoalType::Cutting));

        // Last write wins even though the new entry is earlier in the day
        log.record_weight(ts("2024-03-01T06:00:00Z"), 81.9, None);
        let day = log.aggregate_for_day(ts("2024-03-01T15:00:00Z")).unwrap().unwrap();
        assert_eq!(day.weight_kg, Some(81.9));
        assert_eq!(log.entries_for_day(ts("2024-03-01T00:00:00Z")).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_timestamp_policy() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log =
            WeightLog::new(&mut conn, Calendar::utc(), &sink).with_policy(AggregatePolicy::LatestTimestamp);

        log.record_weight(ts("2024-03-01T20:00:00Z"), 79.5, None);
        log.record_weight(ts("2024-03-01T08:00:00Z"), 80.0, None);

        let day = log.aggregate_for_day(ts("2024-03-01T00:00:00Z")).unwrap().unwrap();
        assert_eq!(day.weight_kg, Some(79.5));
    }

    #[test]
    fn test_goal_type_is_only_backfilled() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        log.record_calories(ts("2024-03-01T09:00:00Z"), 2100, 300, None).unwrap();
        log.record_weight(ts("2024-03-01T10:00:00Z"), 80.0, Some(GoalType::Cutting));
        log.record_weight(ts("2024-03-01T11:00:00Z"), 80.1, Some(GoalType::Bulking));

        let day = log.aggregate_for_day(ts("2024-03-01T00:00:00Z")).unwrap().unwrap();
        assert_eq!(day.goal_type, Some(GoalType::Cutting));
        assert_eq!(day.weight_kg, Some(80.1));
    }

    #[test]
    fn test_remove_latest_entry_falls_back_to_remaining() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        log.record_weight(ts("2024-03-01T08:00:00Z"), 80.0, None).unwrap();
        let evening = log.record_weight(ts("2024-03-01T20:00:00Z"), 79.5, None).unwrap();

        log.remove_weight(&evening);

        let day = log.aggregate_for_day(ts("2024-03-01T00:00:00Z")).unwrap().unwrap();
        assert_eq!(day.weight_kg, Some(80.0));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_remove_morning_entry_keeps_evening_weight() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        let morning = log.record_weight(ts("2024-03-01T08:00:00Z"), 80.0, None).unwrap();
        log.record_weight(ts("2024-03-01T20:00:00Z"), 79.5, None).unwrap();

        let day = log.try_remove_weight(&morning).unwrap().unwrap();
        assert_eq!(day.weight_kg, Some(79.5));
    }

    #[test]
    fn test_remove_last_entry_clears_weight_but_keeps_aggregate() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        let entry = log.record_weight(ts("2024-03-01T08:00:00Z"), 80.0, None).unwrap();
        log.record_calories(ts("2024-03-01T12:00:00Z"), 1800, 250, None).unwrap();

        log.remove_weight(&entry);

        let day = log.aggregate_for_day(ts("2024-03-01T00:00:00Z")).unwrap().unwrap();
        assert_eq!(day.weight_kg, None);
        assert_eq!(day.calories_consumed, 1800);
        assert_eq!(day.calories_burned, 250);
        assert_eq!(day.net_calories(), 1550);
        assert!(log.entries_for_day(ts("2024-03-01T00:00:00Z")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_without_aggregate_is_a_no_op() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();

        let entry = WeightEntry::new(ts("2024-03-01T08:00:00Z"), 80.0);
        entry.insert(&conn).unwrap();

        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);
        assert_eq!(log.try_remove_weight(&entry).unwrap(), None);
        assert!(log.all_entries().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_weight_is_reported_not_stored() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        assert!(log.record_weight(ts("2024-03-01T08:00:00Z"), -3.0, None).is_none());
        assert!(log.all_entries().unwrap().is_empty());
        drop(log);

        assert!(aggregates(&conn).is_empty());
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "record_weight");
    }

    #[test]
    fn test_remove_failure_is_swallowed_and_reported() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);
        let entry = log.record_weight(ts("2024-03-01T08:00:00Z"), 80.0, None).unwrap();
        drop(log);

        conn.execute_batch("DROP TABLE daily_aggregate").unwrap();

        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);
        log.remove_weight(&entry);

        // The entry is gone even though the aggregate couldn't be repaired
        assert!(log.all_entries().unwrap().is_empty());
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "remove_weight");
    }

    #[test]
    fn test_record_is_atomic() {
        let mut conn = test_connection();
        conn.execute_batch("DROP TABLE daily_aggregate").unwrap();
        let sink = RecordingErrorSink::new();
        let mut log = WeightLog::new(&mut conn, Calendar::utc(), &sink);

        assert!(log.record_weight(ts("2024-03-01T08:00:00Z"), 80.0, None).is_none());
        assert!(log.all_entries().unwrap().is_empty());
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn test_days_follow_calendar_offset() {
        let mut conn = test_connection();
        let sink = RecordingErrorSink::new();
        let calendar = Calendar::from_offset_minutes(-5 * 60).unwrap();
        let mut log = WeightLog::new(&mut conn, calendar, &sink);

        // Both are March 1st five hours west of UTC
        log.record_weight(ts("2024-03-01T06:00:00Z"), 80.0, None);
        log.record_weight(ts("2024-03-02T03:00:00Z"), 79.0, None);
        drop(log);

        let aggregates = aggregates(&conn);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].date, ts("2024-03-01T05:00:00Z"));
        assert_eq!(aggregates[0].weight_kg, Some(79.0));
    }
}
