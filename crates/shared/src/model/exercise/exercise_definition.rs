use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::{Expr, Order};

use crate::{
    model::Model,
    types::{MuscleGroups, Uuid},
};

model!(
    "exercise_definition",
    /// A library entry describing an exercise. Names are meant to be unique
    /// but nothing in the schema enforces it, see the library deduplication
    pub struct ExerciseDefinition {
        pub id: Uuid,
        pub name: String,
        pub muscle_groups: MuscleGroups,
        pub is_cardio: bool,
        pub creation_date: DateTime<Utc>,
        pub last_updated_date: DateTime<Utc>,
    }
);

impl ExerciseDefinition {
    pub fn new<S: Into<String>>(name: S, muscle_groups: MuscleGroups, is_cardio: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            muscle_groups,
            is_cardio,
            creation_date: now,
            last_updated_date: now,
        }
    }

    /// Every definition in the order it was inserted
    pub fn fetch_all_in_insertion_order(
        conn: &Connection,
    ) -> Result<Vec<ExerciseDefinition>, rusqlite::Error> {
        Self::fetch_with(
            conn,
            Self::select_star().order_by_expr(Expr::cust("rowid"), Order::Asc),
        )
    }

    /// The earliest inserted definition with this exact name
    pub fn fetch_by_name(
        conn: &Connection,
        name: &str,
    ) -> Result<Option<ExerciseDefinition>, rusqlite::Error> {
        Self::fetch_optional_with(
            conn,
            Self::select_star()
                .and_where(Expr::col(ExerciseDefinitionIden::Name).eq(name))
                .order_by_expr(Expr::cust("rowid"), Order::Asc)
                .limit(1),
        )
    }

    pub fn count_by_name(conn: &Connection, name: &str) -> Result<usize, rusqlite::Error> {
        Self::count_where(conn, Some(Expr::col(ExerciseDefinitionIden::Name).eq(name)))
    }
}
