//! Profile store trait: the contract every search backend must satisfy.

use async_trait::async_trait;

use crate::bulk::BulkPayload;
use crate::error::StoreResult;
use crate::types::{FallbackQuery, SearchHit, SimilarityQuery};

/// Capability set the orchestration layer needs from a search backend.
///
/// Implementations are shared read-only across concurrent tasks behind an
/// `Arc<dyn ProfileStore>`, so every method takes `&self`.
///
/// # Errors
///
/// Implementations report the backend's overload signal as
/// [`crate::StoreError::Overloaded`] and must keep it distinct from every other
/// failure; the ingestion pipeline retries only that variant.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Total number of documents in `collection`, read from a zero-size probe.
    async fn count_documents(&self, collection: &str) -> StoreResult<u64>;

    /// Submit one bulk payload. Succeeds only if every document was accepted.
    async fn bulk_write(&self, collection: &str, payload: &BulkPayload) -> StoreResult<()>;

    /// Documents most similar to `query.subject_id`, best first.
    async fn similar_to(
        &self,
        collection: &str,
        query: &SimilarityQuery,
    ) -> StoreResult<Vec<SearchHit>>;

    /// Any documents except `query.exclude_id`, no ranking requirement.
    async fn excluding(&self, collection: &str, query: &FallbackQuery)
        -> StoreResult<Vec<SearchHit>>;

    /// Human-readable backend name for logs.
    fn backend_name(&self) -> &'static str;
}
