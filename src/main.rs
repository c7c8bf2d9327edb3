//! trasy server.
//!
//! `TRASY_STORE=memory cargo run` starts without a database, with one demo
//! background to draw on.

use std::sync::Arc;
use tokio::net::TcpListener;
use trasy::model::NewBackground;
use trasy::store::RouteStore;
use trasy::{app, ensure_database_exists, AppState, ConfigError, MemoryStore, PgStore, Settings, Store, StoreKind};

async fn open_store(settings: &Settings) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match settings.store {
        StoreKind::Postgres => {
            let database_url = settings
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            ensure_database_exists(database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(database_url)
                .await?;
            let store = PgStore::new(pool, settings.schema.clone());
            store.ensure_tables().await?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            let store = MemoryStore::new();
            store
                .create_background(NewBackground {
                    name: "Plan miasta".into(),
                    description: "Demo background".into(),
                    image: "tla/plan.png".into(),
                    width: 800,
                    height: 600,
                })
                .await?;
            tracing::warn!("using the in-memory store; data is lost on exit");
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trasy=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let store = open_store(&settings).await?;
    let state = AppState::new(store)?;
    let router = app(state, &settings);

    let listener = TcpListener::bind(settings.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        store = ?settings.store,
        "trasy listening"
    );
    axum::serve(listener, router).await?;
    Ok(())
}
