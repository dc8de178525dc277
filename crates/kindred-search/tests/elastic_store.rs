//! Wire-level tests for the Elasticsearch profile store against a mock cluster.

use std::sync::Arc;

use kindred_core::config::{ElasticConfig, IngestConfig, RecommendConfig};
use kindred_core::{
    BulkPayload, FallbackQuery, IngestPipeline, IngestStatus, NoBackoff, ProfileProvider,
    ProfileStore, RecommendationEngine, RecommendationSource, SimilarityQuery, StoreError,
    SyntheticProfiles,
};
use kindred_search::{ElasticClient, ElasticProfileStore};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ElasticConfig {
    ElasticConfig {
        endpoint: server.uri(),
        ..Default::default()
    }
}

fn store_for(server: &MockServer) -> ElasticProfileStore {
    ElasticProfileStore::new(ElasticClient::new(config_for(server)).unwrap())
}

fn total_body(total: u64) -> serde_json::Value {
    json!({"took": 1, "hits": {"total": {"value": total, "relation": "eq"}, "hits": []}})
}

fn hits_body(ids: &[&str]) -> serde_json::Value {
    let hits: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| json!({"_index": "users", "_id": id, "_score": 10.0 - i as f64, "_source": {"id": id}}))
        .collect();
    json!({"hits": {"total": {"value": ids.len(), "relation": "eq"}, "hits": hits}})
}

fn bulk_ok() -> serde_json::Value {
    json!({"took": 3, "errors": false, "items": [{"index": {"_id": "x", "status": 201}}]})
}

async fn requests_to(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .count()
}

fn payload(count: usize) -> BulkPayload {
    BulkPayload::encode("users", &SyntheticProfiles::new(1).profiles(count)).unwrap()
}

#[tokio::test]
async fn test_probe_reads_exact_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .and(body_partial_json(json!({"size": 0, "track_total_hits": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(total_body(1234)))
        .expect(1)
        .mount(&server)
        .await;

    let total = store_for(&server).count_documents("users").await.unwrap();
    assert_eq!(total, 1234);
}

#[tokio::test]
async fn test_probe_without_total_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"hits": []}})))
        .mount(&server)
        .await;

    let err = store_for(&server).count_documents("users").await.unwrap_err();
    assert!(matches!(err, StoreError::MissingField { field: "hits.total" }));
}

#[tokio::test]
async fn test_probe_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = store_for(&server).count_documents("users").await.unwrap_err();
    assert!(err.is_malformed_response());
}

#[tokio::test]
async fn test_unreachable_cluster_is_transport_error() {
    let config = ElasticConfig {
        endpoint: "http://127.0.0.1:1".into(),
        timeout_secs: 2,
        ..Default::default()
    };
    let store = ElasticProfileStore::new(ElasticClient::new(config).unwrap());

    let err = store.count_documents("users").await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}

#[tokio::test]
async fn test_bulk_sends_ndjson_with_profile_ids() {
    let server = MockServer::start().await;
    let profiles = SyntheticProfiles::new(1).profiles(3);
    let payload = BulkPayload::encode("users", &profiles).unwrap();

    let mut mock = Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .and(header("content-type", "application/x-ndjson"));
    for profile in &profiles {
        mock = mock.and(body_string_contains(format!(
            "{{\"index\":{{\"_index\":\"users\",\"_id\":\"{}\"}}}}",
            profile.id
        )));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .expect(1)
        .mount(&server)
        .await;

    store_for(&server).bulk_write("users", &payload).await.unwrap();
}

#[tokio::test]
async fn test_bulk_http_429_is_overload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .bulk_write("users", &payload(2))
        .await
        .unwrap_err();
    assert!(err.is_overload());
}

#[tokio::test]
async fn test_bulk_item_429_is_overload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 429, "error": {"type": "es_rejected_execution_exception"}}}
            ]
        })))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .bulk_write("users", &payload(2))
        .await
        .unwrap_err();
    assert!(err.is_overload());
}

#[tokio::test]
async fn test_bulk_item_400_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        })))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .bulk_write("users", &payload(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected { status: 400, .. }));
    assert!(!err.is_overload());
}

#[tokio::test]
async fn test_bulk_server_error_is_not_overload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .bulk_write("users", &payload(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected { status: 500, ref body } if body == "boom"));
}

#[tokio::test]
async fn test_similarity_query_decodes_hits_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .and(body_partial_json(json!({
            "size": 10,
            "query": {"bool": {"must": [{"more_like_this": {
                "fields": ["interests", "hobbies"],
                "like": [{"_index": "users", "_id": "u-1"}]
            }}]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(&["u-7", "u-3", "u-9"])))
        .expect(1)
        .mount(&server)
        .await;

    let query = SimilarityQuery {
        subject_id: "u-1".into(),
        fields: vec!["interests".into(), "hobbies".into()],
        min_term_freq: 1,
        max_query_terms: 12,
        size: 10,
    };
    let hits = store_for(&server).similar_to("users", &query).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["u-7", "u-3", "u-9"]);
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn test_fallback_query_excludes_by_document_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .and(body_partial_json(json!({
            "query": {"bool": {"must_not": [{"ids": {"values": ["u-1"]}}]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(&["u-2", "u-3"])))
        .expect(1)
        .mount(&server)
        .await;

    let query = FallbackQuery {
        exclude_id: "u-1".into(),
        size: 10,
    };
    let hits = store_for(&server).excluding("users", &query).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn test_search_rejection_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "index_not_found_exception"}, "status": 404
        })))
        .mount(&server)
        .await;

    let query = FallbackQuery {
        exclude_id: "u-1".into(),
        size: 10,
    };
    let err = store_for(&server).excluding("users", &query).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn test_ensure_collection_creates_missing_index() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users"))
        .and(body_partial_json(json!({
            "mappings": {"properties": {"interests": {"type": "text"}}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store_for(&server).ensure_collection().await.unwrap());
}

#[tokio::test]
async fn test_ensure_collection_leaves_existing_index_alone() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!store_for(&server).ensure_collection().await.unwrap());
}

#[tokio::test]
async fn test_credentials_sent_as_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .and(basic_auth("elastic", "changeme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(total_body(0)))
        .expect(1)
        .mount(&server)
        .await;

    let config = ElasticConfig {
        username: Some("elastic".into()),
        password: Some("changeme".into()),
        ..config_for(&server)
    };
    let store = ElasticProfileStore::new(ElasticClient::new(config).unwrap());
    assert_eq!(store.count_documents("users").await.unwrap(), 0);
}

#[tokio::test]
async fn test_pipeline_retries_throttled_bulk_over_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(total_body(0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .mount(&server)
        .await;

    let store = Arc::new(store_for(&server));
    let config = IngestConfig {
        batch_size: 10,
        ..Default::default()
    };
    let pipeline = IngestPipeline::new(store, "users", config)
        .unwrap()
        .with_backoff(Arc::new(NoBackoff));

    let report = pipeline
        .ingest(SyntheticProfiles::new(2).profiles(15))
        .await
        .unwrap();

    assert_eq!(report.status, IngestStatus::Completed);
    assert!(report.is_complete_success());
    assert_eq!(report.batches_attempted, 2);
    assert_eq!(requests_to(&server, "/users/_bulk").await, 3);
}

#[tokio::test]
async fn test_pipeline_skips_populated_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(total_body(100_000)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bulk_ok()))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline =
        IngestPipeline::new(Arc::new(store_for(&server)), "users", IngestConfig::default()).unwrap();
    let report = pipeline
        .ingest(SyntheticProfiles::new(3).profiles(5))
        .await
        .unwrap();
    assert_eq!(report.status, IngestStatus::Skipped);
}

#[tokio::test]
async fn test_engine_falls_back_when_similarity_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .and(body_string_contains("more_like_this"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(&[])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(&["u-2", "u-3", "u-4"])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = RecommendationEngine::new(
        Arc::new(store_for(&server)),
        "users",
        RecommendConfig::default(),
    );
    let result = engine.recommend("u-1").await.unwrap();

    assert_eq!(result.source, RecommendationSource::Fallback);
    assert_eq!(result.recommendations, ["u-2", "u-3", "u-4"]);
}

#[tokio::test]
async fn test_engine_uses_similarity_hits_without_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .and(body_string_contains("more_like_this"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(&["u-5", "u-6"])))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits_body(&["u-2"])))
        .expect(0)
        .mount(&server)
        .await;

    let engine = RecommendationEngine::new(
        Arc::new(store_for(&server)),
        "users",
        RecommendConfig::default(),
    );
    let result = engine.recommend("u-1").await.unwrap();

    assert_eq!(result.source, RecommendationSource::Similarity);
    assert_eq!(result.recommendations, ["u-5", "u-6"]);
}
