use std::time::Duration;

use jiff::Timestamp;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

#[derive(Clone, Debug)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
        }
    }
}

impl From<&Config> for PoolOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_connections: config.db_max_conns,
            min_connections: config.db_min_conns,
            connect_timeout: config.db_connect_timeout,
            idle_timeout: config.db_idle_timeout,
            max_lifetime: config.db_max_lifetime,
        }
    }
}

pub async fn connect_and_migrate(
    database_url: &str,
    pool: &PoolOptions,
) -> AppResult<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url.to_string());

    // Every connection to an in-memory database opens a separate, empty one.
    let (max, min) = if database_url.contains(":memory:") {
        (1, 1)
    } else {
        (pool.max_connections, pool.min_connections)
    };
    opts.max_connections(max)
        .min_connections(min)
        .connect_timeout(pool.connect_timeout)
        .idle_timeout(pool.idle_timeout)
        .max_lifetime(pool.max_lifetime)
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;

    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA synchronous=NORMAL",
        "PRAGMA cache_size=-64000",
        "PRAGMA foreign_keys=ON",
    ] {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    info!(max_connections = max, "database ready");
    Ok(db)
}

/// Round-trips to the database, bounded by `timeout`.
pub async fn ping(db: &DatabaseConnection, timeout: Duration) -> AppResult<()> {
    match tokio::time::timeout(timeout, db.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "database ping failed");
            Err(AppError::Unavailable)
        },
        Err(_) => {
            tracing::warn!(?timeout, "database ping timed out");
            Err(AppError::Unavailable)
        },
    }
}

pub(crate) fn now_micros() -> i64 {
    Timestamp::now().as_microsecond()
}
