use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!("Postgres pool ready ({} connections)", pool_size);
        Ok(Database { pool })
    }

    /// `None`, если `DATABASE_URL` не задан: тогда сервис работает на in-memory хранилище.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Option<Self>, sqlx::Error> {
        match config.url.as_deref() {
            Some(url) => Ok(Some(Self::new(url, config.pool_size).await?)),
            None => Ok(None),
        }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
