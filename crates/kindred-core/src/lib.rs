//! Kindred Core - profile ingestion and similar-user recommendation
//!
//! This crate holds the orchestration layer that sits in front of a document
//! search backend. The backend itself is reached through the [`ProfileStore`]
//! trait; everything here is independent of the concrete engine.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +--------------------+
//! | ProfileProvider  | --> |   IngestPipeline   | --+
//! +------------------+     |  (IndexGuard gate) |   |
//!                          +--------------------+   |    +--------------+
//!                                                   +--> | ProfileStore |
//!                          +--------------------+   |    +--------------+
//!   subject id ----------> | RecommendationEngine| --+
//!                          +--------------------+
//! ```
//!
//! - [`IndexGuard`] decides whether seeding should run at all.
//! - [`IngestPipeline`] partitions records into batches and writes them
//!   concurrently with bounded retry on overload.
//! - [`RecommendationEngine`] runs a similarity query and degrades to a
//!   fallback query when the similarity query yields nothing.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use kindred_core::{IngestPipeline, RecommendationEngine, SyntheticProfiles, ProfileProvider};
//!
//! let store: Arc<dyn ProfileStore> = Arc::new(my_store);
//! let pipeline = IngestPipeline::new(Arc::clone(&store), "users", config.ingest.clone())?;
//! let report = pipeline.ingest(SyntheticProfiles::new(0).profiles(1_000)).await?;
//!
//! let engine = RecommendationEngine::new(store, "users", config.recommend.clone());
//! let result = engine.recommend("some-user-id").await?;
//! ```

pub mod bulk;
pub mod config;
pub mod error;
pub mod guard;
pub mod ingest;
pub mod provider;
pub mod recommend;
pub mod retry;
pub mod stubs;
pub mod traits;
pub mod types;

pub use bulk::BulkPayload;
pub use config::Config;
pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use guard::IndexGuard;
pub use ingest::{partition, IngestPipeline};
pub use provider::{ProfileProvider, SyntheticProfiles, TAG_VOCABULARY};
pub use recommend::RecommendationEngine;
pub use retry::{Backoff, CancelFlag, FixedBackoff, NoBackoff};
pub use traits::ProfileStore;
pub use types::{
    Batch, BatchErrorKind, BatchFailure, FallbackQuery, IngestReport, IngestStatus,
    RecommendationResult, RecommendationSource, SearchHit, SimilarityQuery, UserProfile,
    WriteOutcome,
};
