pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::config::Config;
use crate::database::Database;
use crate::models::SeatLayout;
use crate::redis_client::RedisClient;
use crate::services::catalog::CatalogGateway;
use crate::store::{MemoryStore, MovieStore, PgStore, ShowStore};

// Shared state для всего приложения
pub struct AppState {
    pub config: Config,
    pub db: Option<Database>,
    pub movies: Arc<dyn MovieStore>,
    pub shows: Arc<dyn ShowStore>,
    pub catalog: CatalogGateway,
    pub cache: CacheService,
    pub layout: SeatLayout,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let db = Database::from_config(&config.database).await?;

        let (movies, shows): (Arc<dyn MovieStore>, Arc<dyn ShowStore>) = match &db {
            Some(db) => {
                db.run_migrations().await?;
                let store = Arc::new(PgStore::new(db.pool.clone()));
                (store.clone(), store)
            }
            None => {
                warn!("DATABASE_URL is not set, using the in-memory store");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

        // Без Redis сервис работает, просто без кеша now-playing
        let redis = match config.redis.url.as_deref() {
            Some(url) => match RedisClient::new(url).await {
                Ok(client) => {
                    info!("Redis connected");
                    Some(client)
                }
                Err(e) => {
                    warn!("Redis unavailable, now-playing cache disabled: {:?}", e);
                    None
                }
            },
            None => None,
        };
        let cache = CacheService::new(redis, config.redis.now_playing_ttl_secs);

        let catalog = CatalogGateway::new(config.catalog.clone(), &config.circuit_breaker)?;
        let layout = SeatLayout::from_config(&config.booking);

        Ok(Arc::new(Self {
            config,
            db,
            movies,
            shows,
            catalog,
            cache,
            layout,
        }))
    }

    /// Состояние на in-memory хранилище без кеша, для тестов и локального запуска.
    pub fn in_memory(config: Config) -> error::Result<Arc<Self>> {
        let store = Arc::new(MemoryStore::new());
        let catalog = CatalogGateway::new(config.catalog.clone(), &config.circuit_breaker)?;
        let layout = SeatLayout::from_config(&config.booking);

        Ok(Arc::new(Self {
            config,
            db: None,
            movies: store.clone(),
            shows: store,
            catalog,
            cache: CacheService::disabled(),
            layout,
        }))
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = match &state.db {
        Some(db) => {
            if db.ping().await {
                "up"
            } else {
                "down"
            }
        }
        None => "memory",
    };
    Json(json!({
        "status": "ok",
        "database": database,
        "cache": state.cache.is_enabled(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Server is Live!" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
