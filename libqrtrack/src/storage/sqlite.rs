use super::Backend;
use crate::{Coordinate, Location, Result};
use async_trait::async_trait;
use sqlx::{FromRow, Pool, Sqlite, SqlitePool, sqlite::SqliteConnectOptions};
use std::path::Path;
use tracing::trace;

/// Keeps every reported location in a sqlite database
#[derive(Clone, Debug)]
pub struct SqliteBackend(Pool<Sqlite>);

impl From<Pool<Sqlite>> for SqliteBackend {
    /// **WARNING**: This is primarily intended for tests. You should probably
    /// use [SqliteBackend::open()] instead, since it will also migrate the
    /// database schema.
    fn from(value: Pool<Sqlite>) -> Self {
        Self(value)
    }
}

#[derive(FromRow)]
struct LocationRow {
    timestamp: String,
    lat: String,
    lon: String,
    address: String,
}

impl TryFrom<LocationRow> for Location {
    type Error = crate::Error;

    fn try_from(row: LocationRow) -> Result<Self> {
        Ok(Location {
            timestamp: row.timestamp,
            lat: serde_json::from_str::<Coordinate>(&row.lat)?,
            lon: serde_json::from_str::<Coordinate>(&row.lon)?,
            address: row.address,
        })
    }
}

impl SqliteBackend {
    /// Open (creating if necessary) the database at the given path and bring
    /// its schema up to date.
    pub async fn open<P: AsRef<Path>>(db: P) -> Result<Self> {
        let dbpool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db)
                .create_if_missing(true),
        )
        .await?;
        trace!("Running database migrations");
        sqlx::migrate!("../db/migrations").run(&dbpool).await?;
        Ok(Self(dbpool))
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.0
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn save(&self, location: &Location) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO locations (timestamp, lat, lon, address)
            VALUES (?, ?, ?, ?)"#,
        )
        .bind(&location.timestamp)
        .bind(serde_json::to_string(&location.lat)?)
        .bind(serde_json::to_string(&location.lon)?)
        .bind(&location.address)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Location>> {
        sqlx::query_as::<_, LocationRow>(
            "SELECT timestamp, lat, lon, address FROM locations ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?
        .map(Location::try_from)
        .transpose()
    }

    async fn history(&self, limit: Option<u32>) -> Result<Vec<Location>> {
        // a negative limit means no limit in sqlite
        let limit = limit.map(i64::from).unwrap_or(-1);
        sqlx::query_as::<_, LocationRow>(
            "SELECT timestamp, lat, lon, address FROM locations ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Location::try_from)
        .collect()
    }

    fn describe(&self) -> String {
        "sqlite database".to_string()
    }
}
