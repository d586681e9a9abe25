use std::{fmt, str::FromStr};

use rusqlite::{
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    ToSql,
};
use serde::{Deserialize, Serialize};

/// Row id. Stored as hyphenated text so the database stays readable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid(uuid::Uuid);

impl Uuid {
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Accepts any form `uuid` understands, ids typed on the command line included
impl FromStr for Uuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim()).map(Self)
    }
}

impl ToSql for Uuid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Uuid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

// Query parameters go through sea-query, which needs the same text form
impl From<&Uuid> for sea_query::Value {
    fn from(value: &Uuid) -> Self {
        value.to_string().into()
    }
}

impl From<Uuid> for sea_query::Value {
    fn from(value: Uuid) -> Self {
        (&value).into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_trims_and_displays_hyphenated() {
        let id = Uuid::new_v4();
        let typed = format!("  {}\n", id.0.simple());

        let parsed: Uuid = typed.parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.to_string().len(), 36);
        assert!("not-an-id".parse::<Uuid>().is_err());
    }

    #[test]
    fn test_sql_value_matches_display() {
        let id = Uuid::new_v4();
        assert_eq!(sea_query::Value::from(id), sea_query::Value::from(id.to_string()));
    }
}
