use crate::config::StoreConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(config: &StoreConfig) -> Result<PgPool, sqlx::Error> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| sqlx::Error::Configuration("store.url is required for postgres".into()))?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}
