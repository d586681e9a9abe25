use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::Expr;

use crate::{model::Model, types::Uuid};

model!(
    "flag",
    /// A persisted one-shot marker, e.g. that the exercise library was seeded
    pub struct Flag {
        pub id: Uuid,
        pub name: String,
        pub set_date: DateTime<Utc>,
    }
);

impl Flag {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            set_date: Utc::now(),
        }
    }

    pub fn fetch_by_name(conn: &Connection, name: &str) -> Result<Option<Flag>, rusqlite::Error> {
        Self::fetch_optional_with(
            conn,
            Self::select_star()
                .and_where(Expr::col(FlagIden::Name).eq(name))
                .limit(1),
        )
    }
}
