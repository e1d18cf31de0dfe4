mod config;
mod db;
mod entities;
mod error;
mod extract;
mod models;
mod routes;
mod store;

use std::sync::Arc;

use crate::{config::Config, store::Store};

pub struct AppState {
    pub store: Store,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movie_reviews=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect(&config.database_url).await?;
    db::create_tables(&db).await?;
    if config.seed_data {
        db::seed_data(&db).await?;
    }

    let state = Arc::new(AppState { store: Store::new(db) });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, seed_data = config.seed_data, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
