//! Recommendation engine: similar users with a fallback sample.
//!
//! The engine issues at most two backend queries per request, in sequence:
//!
//! 1. A similarity query ("more like this") over the configured fields,
//!    excluding the subject.
//! 2. Only if step 1 leaves nothing after self-exclusion: an unranked query for
//!    any documents except the subject.
//!
//! The subject id is filtered out of both result lists again before returning,
//! so it never appears even if the backend ignores the exclusion.
//! There is no retry here; read failures surface immediately.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RecommendConfig;
use crate::error::{CoreError, CoreResult};
use crate::traits::ProfileStore;
use crate::types::{
    FallbackQuery, RecommendationResult, RecommendationSource, SearchHit, SimilarityQuery,
};

/// Per-request similar-user lookup against one collection.
pub struct RecommendationEngine {
    store: Arc<dyn ProfileStore>,
    collection: String,
    config: RecommendConfig,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        collection: impl Into<String>,
        config: RecommendConfig,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            config,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Similarity query for `subject_id` built from the configuration.
    pub fn similarity_query(&self, subject_id: &str) -> SimilarityQuery {
        SimilarityQuery {
            subject_id: subject_id.to_string(),
            fields: self.config.fields.clone(),
            min_term_freq: self.config.min_term_freq,
            max_query_terms: self.config.max_query_terms,
            size: self.config.max_results,
        }
    }

    /// Fallback query for `subject_id` built from the configuration.
    pub fn fallback_query(&self, subject_id: &str) -> FallbackQuery {
        FallbackQuery {
            exclude_id: subject_id.to_string(),
            size: self.config.max_results,
        }
    }

    /// Recommend users similar to `subject_id`.
    ///
    /// An empty collection (apart from the subject) yields an empty result, not
    /// an error.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidInput`] for an empty subject id.
    /// - [`CoreError::Query`] if either backend query fails.
    pub async fn recommend(&self, subject_id: &str) -> CoreResult<RecommendationResult> {
        if subject_id.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "subject id cannot be empty".to_string(),
            ));
        }

        let query = self.similarity_query(subject_id);
        debug!(
            collection = %self.collection,
            subject = subject_id,
            fields = ?query.fields,
            "Issuing similarity query"
        );
        let hits = self
            .store
            .similar_to(&self.collection, &query)
            .await
            .map_err(|e| {
                warn!(subject = subject_id, error = %e, "Similarity query failed");
                CoreError::Query(e)
            })?;

        let primary = self.filter_hits(subject_id, hits);
        if !primary.is_empty() {
            debug!(subject = subject_id, count = primary.len(), "Similarity query matched");
            return Ok(RecommendationResult {
                user_id: subject_id.to_string(),
                recommendations: primary,
                source: RecommendationSource::Similarity,
            });
        }

        info!(
            subject = subject_id,
            "No similar users found, falling back to unranked sample"
        );
        let fallback = self.fallback_query(subject_id);
        let hits = self
            .store
            .excluding(&self.collection, &fallback)
            .await
            .map_err(|e| {
                warn!(subject = subject_id, error = %e, "Fallback query failed");
                CoreError::Query(e)
            })?;

        Ok(RecommendationResult {
            user_id: subject_id.to_string(),
            recommendations: self.filter_hits(subject_id, hits),
            source: RecommendationSource::Fallback,
        })
    }

    /// Keep ranking order, drop the subject and duplicates, cap the length.
    fn filter_hits(&self, subject_id: &str, hits: Vec<SearchHit>) -> Vec<String> {
        let mut seen = HashSet::new();
        hits.into_iter()
            .map(|hit| hit.id)
            .filter(|id| id != subject_id)
            .filter(|id| seen.insert(id.clone()))
            .take(self.config.max_results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::stubs::InMemoryProfileStore;
    use crate::types::UserProfile;

    fn profile(id: &str, interests: &[&str], hobbies: &[&str]) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: format!("{}@example.com", id),
            interests: interests.iter().map(|s| s.to_string()).collect(),
            hobbies: hobbies.iter().map(|s| s.to_string()).collect(),
            age: 30,
            address: "1 Main St".into(),
            gender: None,
            status: None,
            photo: None,
        }
    }

    fn engine(store: Arc<InMemoryProfileStore>) -> RecommendationEngine {
        RecommendationEngine::new(store, "users", RecommendConfig::default())
    }

    #[tokio::test]
    async fn test_similar_user_ranked_first_and_subject_excluded() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.seed(
            "users",
            vec![
                profile("u1", &["music", "travel"], &[]),
                profile("u2", &["music"], &[]),
                profile("u3", &["sports"], &[]),
            ],
        );

        let result = engine(Arc::clone(&store)).recommend("u1").await.unwrap();
        assert_eq!(result.source, RecommendationSource::Similarity);
        assert_eq!(result.recommendations.first().map(String::as_str), Some("u2"));
        assert!(!result.recommendations.contains(&"u1".to_string()));
        assert_eq!(store.fallback_calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_issued_once_when_no_similar_users() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.seed(
            "users",
            vec![
                profile("u1", &["music"], &["music"]),
                profile("u2", &["sports"], &["books"]),
                profile("u3", &["movies"], &["travel"]),
            ],
        );

        let result = engine(Arc::clone(&store)).recommend("u1").await.unwrap();
        assert_eq!(result.source, RecommendationSource::Fallback);
        assert_eq!(result.recommendations, vec!["u2".to_string(), "u3".to_string()]);
        assert_eq!(store.similarity_calls(), 1);
        assert_eq!(store.fallback_calls(), 1);
    }

    #[tokio::test]
    async fn test_subject_alone_yields_empty_result() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.seed("users", vec![profile("solo", &["music"], &["books"])]);

        let result = engine(store).recommend("solo").await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.source, RecommendationSource::Fallback);
    }

    #[tokio::test]
    async fn test_results_capped_at_ten() {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut profiles = vec![profile("subject", &["music"], &[])];
        for i in 0..25 {
            profiles.push(profile(&format!("m{:02}", i), &["music"], &[]));
        }
        store.seed("users", profiles);

        let result = engine(store).recommend("subject").await.unwrap();
        assert_eq!(result.len(), 10);
    }

    #[tokio::test]
    async fn test_backend_echoing_subject_is_filtered() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.script_similarity_hits(vec![
            SearchHit {
                id: "u1".into(),
                score: Some(9.0),
            },
            SearchHit {
                id: "u4".into(),
                score: Some(3.0),
            },
            SearchHit {
                id: "u4".into(),
                score: Some(3.0),
            },
        ]);

        let result = engine(Arc::clone(&store)).recommend("u1").await.unwrap();
        assert_eq!(result.recommendations, vec!["u4".to_string()]);
        assert_eq!(store.fallback_calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_surfaces_without_fallback() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.fail_queries(StoreError::Transport("connection reset".into()));

        let err = engine(Arc::clone(&store)).recommend("u1").await.unwrap_err();
        assert!(matches!(err, CoreError::Query(_)));
        assert_eq!(store.fallback_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_subject_rejected_before_backend() {
        let store = Arc::new(InMemoryProfileStore::new());
        let err = engine(Arc::clone(&store)).recommend("  ").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert_eq!(store.similarity_calls(), 0);
    }

    #[test]
    fn test_queries_follow_config() {
        let store = Arc::new(InMemoryProfileStore::new());
        let engine = engine(store);

        let query = engine.similarity_query("u1");
        assert_eq!(query.fields, vec!["interests", "hobbies"]);
        assert_eq!(query.min_term_freq, 1);
        assert_eq!(query.max_query_terms, 12);
        assert_eq!(query.size, 10);

        let fallback = engine.fallback_query("u1");
        assert_eq!(fallback.exclude_id, "u1");
        assert_eq!(fallback.size, 10);
    }
}
