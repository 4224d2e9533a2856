//! Shared application state.

use std::sync::Arc;

use mealpass_core::{
    AppConfig, EngineOptions, Error, FsBlobStore, LiveResolver, MealClock, MemoryCache,
    ScanStateEngine, SqliteStore,
};

use crate::render::HttpCodeRenderer;

pub type Engine = ScanStateEngine<SqliteStore, MemoryCache, FsBlobStore, HttpCodeRenderer>;
pub type Live = LiveResolver<SqliteStore, MemoryCache>;

pub struct AppState {
    pub config: AppConfig,
    pub engine: Engine,
    pub live: Live,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Arc<Self>, Error> {
        let store = SqliteStore::open(&config.db_path).await?;
        let cache = MemoryCache::new();
        let blobs = FsBlobStore::from_config(&config);
        let renderer = HttpCodeRenderer::from_config(&config)?;
        let clock = MealClock::new(config.utc_offset_minutes, config.meal_hours);

        let engine = ScanStateEngine::new(
            store.clone(),
            cache.clone(),
            blobs,
            renderer,
            clock,
            EngineOptions::from_config(&config),
        );
        let live = LiveResolver::new(store, cache, config.default_live_url.clone(), config.live_ttl_secs);

        Ok(Arc::new(Self { config, engine, live }))
    }
}
