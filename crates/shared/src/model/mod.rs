use exemplar::Model as ExemplarModel;
use rusqlite::{Connection, OptionalExtension};
use sea_query::{Expr, Iden, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder};
use sea_query_rusqlite::RusqliteBinder;

use crate::{error::ValidationError, types::Uuid};

/// Declares a persisted model: derives row mapping and inserts with exemplar,
/// the column identifier enum with sea_query and implements [`Model`]
macro_rules! model {
    (
        $table:literal,
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        ::paste::paste! {
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize, ::exemplar::Model)]
            #[table($table)]
            #[::sea_query::enum_def]
            pub struct $name {
                $( $(#[$fmeta])* pub $field: $ty, )*
            }

            impl $crate::model::Model for $name {
                type Iden = [<$name Iden>];

                fn table_iden() -> Self::Iden {
                    [<$name Iden>]::Table
                }

                fn id_iden() -> Self::Iden {
                    [<$name Iden>]::Id
                }

                fn star() -> Vec<Self::Iden> {
                    vec![ $( [<$name Iden>]::[<$field:camel>], )* ]
                }

                fn id(&self) -> &$crate::types::Uuid {
                    &self.id
                }
            }
        }
    };
}

mod weight;
pub use weight::*;

mod workout;
pub use workout::*;

mod exercise;
pub use exercise::*;

mod flag;
pub use flag::*;

mod service_version;
pub use service_version::*;

pub trait ValidateModel {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Common queries shared by every persisted model
pub trait Model: ExemplarModel + Sized {
    type Iden: Iden + 'static;

    fn table_iden() -> Self::Iden;
    fn id_iden() -> Self::Iden;
    /// Every column, in declaration order
    fn star() -> Vec<Self::Iden>;
    fn id(&self) -> &Uuid;

    fn select_star() -> SelectStatement {
        Query::select()
            .columns(Self::star())
            .from(Self::table_iden())
            .to_owned()
    }

    fn fetch_with(conn: &Connection, query: &SelectStatement) -> Result<Vec<Self>, rusqlite::Error> {
        let (sql, values) = query.build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt
            .query_map(&*values.as_params(), Self::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(res)
    }

    fn fetch_optional_with(
        conn: &Connection,
        query: &SelectStatement,
    ) -> Result<Option<Self>, rusqlite::Error> {
        let (sql, values) = query.build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt.query_row(&*values.as_params(), Self::from_row).optional()?;
        Ok(res)
    }

    fn fetch_by_id(conn: &Connection, id: &Uuid) -> Result<Self, rusqlite::Error> {
        let (sql, values) = Self::select_star()
            .and_where(Expr::col(Self::id_iden()).eq(id))
            .limit(1)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt.query_row(&*values.as_params(), Self::from_row)?;
        Ok(res)
    }

    fn fetch_all(conn: &Connection) -> Result<Vec<Self>, rusqlite::Error> {
        Self::fetch_with(conn, &Self::select_star())
    }

    fn count_where(conn: &Connection, filter: Option<SimpleExpr>) -> Result<usize, rusqlite::Error> {
        let mut query = Query::select();
        query.expr(Expr::cust("COUNT(*)")).from(Self::table_iden());
        if let Some(filter) = filter {
            query.and_where(filter);
        }
        let (sql, values) = query.build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let count: i64 = stmt.query_row(&*values.as_params(), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Sets the given columns on the row with `id`, returning the number of
    /// rows changed
    fn update_by_id(
        conn: &Connection,
        id: &Uuid,
        values: Vec<(Self::Iden, SimpleExpr)>,
    ) -> Result<usize, rusqlite::Error> {
        let (sql, values) = Query::update()
            .table(Self::table_iden())
            .values(values)
            .and_where(Expr::col(Self::id_iden()).eq(id))
            .build_rusqlite(SqliteQueryBuilder);

        conn.execute(&sql, &*values.as_params())
    }

    fn delete_by_id(conn: &Connection, id: &Uuid) -> Result<usize, rusqlite::Error> {
        let (sql, values) = Query::delete()
            .from_table(Self::table_iden())
            .and_where(Expr::col(Self::id_iden()).eq(id))
            .build_rusqlite(SqliteQueryBuilder);

        conn.execute(&sql, &*values.as_params())
    }
}
