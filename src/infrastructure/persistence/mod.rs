use sqlx::{
    any::{AnyConnectOptions, AnyPoolOptions, AnyRow},
    Any, AnyPool, ConnectOptions, Decode, Row, Type,
};
use std::str::FromStr;

mod conversations;
mod messages;
mod tickets;

pub struct Database {
    pub(crate) pool: AnyPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect_with_pool_size(database_url, 20, 5).await
    }

    pub async fn connect_with_pool_size(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        // Ensure drivers are installed for AnyPool
        sqlx::any::install_default_drivers();

        let mut connect_options = AnyConnectOptions::from_str(database_url)?;

        // Configure logging
        connect_options = connect_options
            .log_statements(log::LevelFilter::Debug)
            .log_slow_statements(log::LevelFilter::Warn, std::time::Duration::from_secs(1));

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // SQLite pragmas are per connection
                    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                    sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect_with(connect_options)
            .await?;

        // Enable optimizations for SQLite
        if database_url.starts_with("sqlite") {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA synchronous = NORMAL")
                .execute(&pool)
                .await?;
        }

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("migrations/sqlite").run(&self.pool).await
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// Decode a stored enum column, mapping parse failures to an internal error.
pub(crate) fn parse_column<T: FromStr<Err = String>>(
    raw: &str,
) -> crate::domain::errors::DomainResult<T> {
    raw.parse::<T>()
        .map_err(crate::domain::errors::DomainError::Internal)
}

pub(crate) fn parse_ts(raw: &str) -> crate::domain::errors::DomainResult<chrono::DateTime<chrono::Utc>> {
    crate::domain::entities::parse_timestamp(raw).ok_or_else(|| {
        crate::domain::errors::DomainError::Internal(format!("invalid timestamp '{}'", raw))
    })
}

/// Read a nullable column. The Any driver reports a NULL value as a type
/// mismatch for `Option<T>`, so any decode failure reads as absent.
pub(crate) fn nullable<'r, T>(row: &'r AnyRow, column: &str) -> Option<T>
where
    T: Decode<'r, Any> + Type<Any>,
{
    row.try_get::<Option<T>, _>(column).ok().flatten()
}
