//! Shared application state and router assembly.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use kindred_core::{
    Config, CoreResult, IngestPipeline, ProfileProvider, ProfileStore, RecommendationEngine,
    SyntheticProfiles,
};

use crate::routes::{health, users};

/// State handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub engine: Arc<RecommendationEngine>,
    pub provider: Arc<dyn ProfileProvider>,
    /// Profiles generated per seeding request when no `count` is given.
    pub default_count: usize,
    /// Largest `count` a seeding request may ask for.
    pub max_count: usize,
}

impl AppState {
    /// Wire pipeline and engine to one shared store, using the index named in
    /// `config.elastic.index` and the seeded synthetic provider.
    pub fn new(store: Arc<dyn ProfileStore>, config: &Config) -> CoreResult<Self> {
        let collection = config.elastic.index.clone();
        let pipeline = IngestPipeline::new(
            Arc::clone(&store),
            collection.clone(),
            config.ingest.clone(),
        )?;
        let engine = RecommendationEngine::new(store, collection, config.recommend.clone());

        Ok(Self {
            pipeline: Arc::new(pipeline),
            engine: Arc::new(engine),
            provider: Arc::new(SyntheticProfiles::new(config.ingest.seed)),
            default_count: config.ingest.synthetic_count,
            max_count: config.ingest.max_synthetic_count,
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProfileProvider>) -> Self {
        self.provider = provider;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("collection", &self.pipeline.collection())
            .field("default_count", &self.default_count)
            .field("max_count", &self.max_count)
            .finish()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health::healthcheck))
        .route("/users/create/fake-users", post(users::create_fake_users))
        .route("/users/recommendations/", get(users::missing_user_id))
        .route("/users/recommendations/:user_id", get(users::recommendations))
        .with_state(state)
}
