//! [`ProfileStore`] backed by Elasticsearch.

use async_trait::async_trait;
use kindred_core::{
    BulkPayload, FallbackQuery, ProfileStore, SearchHit, SimilarityQuery, StoreResult,
};
use tracing::debug;

use crate::client::ElasticClient;
use crate::error::ElasticResult;
use crate::query::SearchRequest;

pub struct ElasticProfileStore {
    client: ElasticClient,
}

impl ElasticProfileStore {
    pub fn new(client: ElasticClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ElasticClient {
        &self.client
    }

    /// Create the configured index with the profile mapping if missing.
    pub async fn ensure_collection(&self) -> ElasticResult<bool> {
        self.client.ensure_index(self.client.index()).await
    }
}

#[async_trait]
impl ProfileStore for ElasticProfileStore {
    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        let response = self
            .client
            .search(collection, &SearchRequest::probe())
            .await?;
        Ok(response.total()?)
    }

    async fn bulk_write(&self, collection: &str, payload: &BulkPayload) -> StoreResult<()> {
        debug!(collection, documents = payload.documents(), "Submitting bulk request");
        let response = self
            .client
            .bulk(collection, payload.body().to_string())
            .await?;
        Ok(response.check()?)
    }

    async fn similar_to(
        &self,
        collection: &str,
        query: &SimilarityQuery,
    ) -> StoreResult<Vec<SearchHit>> {
        let request = SearchRequest::similarity(collection, query);
        debug!(collection, subject = %query.subject_id, "more_like_this query");
        let response = self.client.search(collection, &request).await?;
        Ok(response.into_hits()?)
    }

    async fn excluding(
        &self,
        collection: &str,
        query: &FallbackQuery,
    ) -> StoreResult<Vec<SearchHit>> {
        let request = SearchRequest::fallback(query);
        debug!(collection, excluded = %query.exclude_id, "Fallback query");
        let response = self.client.search(collection, &request).await?;
        Ok(response.into_hits()?)
    }

    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }
}
