use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::Config;

// Definimos un alias para "Pool<Postgres>"
pub type DbPool = Pool<Postgres>;

/// Estado compartido por todos los handlers.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

pub async fn init_db(config: &Config) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
}

/// Aplica las migraciones embebidas de `migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
