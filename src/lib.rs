pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;

use std::sync::Arc;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database).await?;
        db.run_migrations().await?;
        Ok(Arc::new(Self { db, config }))
    }
}
