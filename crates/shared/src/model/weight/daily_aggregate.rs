use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::{Expr, Order};

use crate::{
    model::Model,
    types::{GoalType, Uuid},
};

model!(
    "daily_aggregate",
    /// Per day summary. At most one exists for each calendar day and `date` is
    /// always the start of that day
    pub struct DailyAggregate {
        pub id: Uuid,
        pub date: DateTime<Utc>,
        /// Weight of the latest surviving entry for the day
        pub weight_kg: Option<f64>,
        pub calories_consumed: i64,
        pub calories_burned: i64,
        pub goal_type: Option<GoalType>,
        pub last_updated_date: DateTime<Utc>,
    }
);

impl DailyAggregate {
    /// `day_start` must already be normalized to the start of the day
    pub fn new(day_start: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: day_start,
            weight_kg: None,
            calories_consumed: 0,
            calories_burned: 0,
            goal_type: None,
            last_updated_date: Utc::now(),
        }
    }

    pub fn net_calories(&self) -> i64 {
        self.calories_consumed - self.calories_burned
    }

    pub fn fetch_for_day(
        conn: &Connection,
        day_start: DateTime<Utc>,
    ) -> Result<Option<DailyAggregate>, rusqlite::Error> {
        Self::fetch_optional_with(
            conn,
            Self::select_star()
                .and_where(Expr::col(DailyAggregateIden::Date).eq(day_start))
                .limit(1),
        )
    }

    pub fn fetch_all_desc(conn: &Connection) -> Result<Vec<DailyAggregate>, rusqlite::Error> {
        Self::fetch_with(
            conn,
            Self::select_star().order_by(DailyAggregateIden::Date, Order::Desc),
        )
    }

    pub fn set_weight(
        conn: &Connection,
        id: &Uuid,
        weight_kg: Option<f64>,
    ) -> Result<usize, rusqlite::Error> {
        Self::update_by_id(
            conn,
            id,
            vec![
                (DailyAggregateIden::WeightKg, weight_kg.into()),
                (DailyAggregateIden::LastUpdatedDate, Utc::now().into()),
            ],
        )
    }

    pub fn set_goal_type(
        conn: &Connection,
        id: &Uuid,
        goal_type: Option<GoalType>,
    ) -> Result<usize, rusqlite::Error> {
        Self::update_by_id(
            conn,
            id,
            vec![
                (DailyAggregateIden::GoalType, goal_type.into()),
                (DailyAggregateIden::LastUpdatedDate, Utc::now().into()),
            ],
        )
    }

    pub fn set_calories(
        conn: &Connection,
        id: &Uuid,
        consumed: i64,
        burned: i64,
    ) -> Result<usize, rusqlite::Error> {
        Self::update_by_id(
            conn,
            id,
            vec![
                (DailyAggregateIden::CaloriesConsumed, consumed.into()),
                (DailyAggregateIden::CaloriesBurned, burned.into()),
                (DailyAggregateIden::LastUpdatedDate, Utc::now().into()),
            ],
        )
    }
}
