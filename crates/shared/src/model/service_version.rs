use std::fmt::Display;

use chrono::{DateTime, Utc};
use exemplar::Model as ExemplarModel;
use rusqlite::Connection;
use sea_query::Order;
use semver::Version;

use crate::{error::StoreError, model::Model, types::Uuid};

model!(
    "service_version",
    /// A version of the tracker that has opened this database
    pub struct ServiceVersion {
        pub id: Uuid,
        pub version: String,
        pub creation_date: DateTime<Utc>,
    }
);

impl Display for ServiceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.version.fmt(f)
    }
}

impl ServiceVersion {
    pub fn new(version: String) -> Result<Self, semver::Error> {
        // Just to check it's valid semver
        let _ = Version::parse(&version)?;
        Ok(Self {
            id: Uuid::new_v4(),
            version,
            creation_date: Utc::now(),
        })
    }

    pub fn cmp(&self, other: &str) -> Result<std::cmp::Ordering, semver::Error> {
        let my_version = Version::parse(&self.version)?;
        let other_version = Version::parse(other)?;

        Ok(my_version.cmp(&other_version))
    }

    pub fn fetch_latest(conn: &Connection) -> Result<Option<Self>, StoreError> {
        let value = Self::fetch_optional_with(
            conn,
            Self::select_star()
                .order_by(ServiceVersionIden::CreationDate, Order::Desc)
                .limit(1),
        )?;

        Ok(value)
    }

    pub fn create(conn: &mut Connection, new_service_version: ServiceVersion) -> Result<ServiceVersion, StoreError> {
        let tx = conn.transaction()?;
        let new_service_version = {
            new_service_version.insert(&tx)?;
            ServiceVersion::fetch_by_id(&tx, &new_service_version.id)?
        };
        tx.commit()?;

        Ok(new_service_version)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_semver() {
        assert!(ServiceVersion::new("not a version".to_owned()).is_err());
    }

    #[test]
    fn test_cmp_uses_semver_ordering() {
        let v = ServiceVersion::new("0.10.0".to_owned()).unwrap();
        assert_eq!(v.cmp("0.9.3").unwrap(), std::cmp::Ordering::Greater);
        assert_eq!(v.cmp("0.10.0").unwrap(), std::cmp::Ordering::Equal);
    }
}
