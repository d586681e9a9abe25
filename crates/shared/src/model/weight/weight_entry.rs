use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::{Expr, Order};

use crate::{
    error::ValidationError,
    model::{Model, ValidateModel},
    types::Uuid,
};

model!(
    "weight_entry",
    /// A single body weight measurement. Several may exist for the same day
    pub struct WeightEntry {
        pub id: Uuid,
        /// When the measurement was taken, not normalized to the day
        pub date: DateTime<Utc>,
        pub weight_kg: f64,
        pub creation_date: DateTime<Utc>,
    }
);

impl WeightEntry {
    pub fn new(date: DateTime<Utc>, weight_kg: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            weight_kg,
            creation_date: Utc::now(),
        }
    }

    /// Entries with `start <= date < end`, latest first
    pub fn fetch_between_desc(
        conn: &Connection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WeightEntry>, rusqlite::Error> {
        Self::fetch_with(
            conn,
            Self::select_star()
                .and_where(Expr::col(WeightEntryIden::Date).gte(start))
                .and_where(Expr::col(WeightEntryIden::Date).lt(end))
                .order_by(WeightEntryIden::Date, Order::Desc)
                .order_by(WeightEntryIden::CreationDate, Order::Desc),
        )
    }

    pub fn fetch_all_desc(conn: &Connection) -> Result<Vec<WeightEntry>, rusqlite::Error> {
        Self::fetch_with(
            conn,
            Self::select_star().order_by(WeightEntryIden::Date, Order::Desc),
        )
    }
}

impl ValidateModel for WeightEntry {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.weight_kg.is_finite() && self.weight_kg > 0.0 {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "Weight must be a positive number of kg, got {}",
                self.weight_kg
            )))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_rejects_non_positive_weight() {
        assert!(WeightEntry::new(Utc::now(), 80.0).validate().is_ok());
        assert!(WeightEntry::new(Utc::now(), 0.0).validate().is_err());
        assert!(WeightEntry::new(Utc::now(), -1.5).validate().is_err());
        assert!(WeightEntry::new(Utc::now(), f64::NAN).validate().is_err());
    }

    #[test]
    fn test_star_lists_every_column() {
        assert_eq!(WeightEntry::star().len(), 4);
    }
}
