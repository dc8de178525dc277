//! Thin async client over the Elasticsearch REST API.
//!
//! Only the handful of endpoints the profile store needs are wrapped. Non-2xx
//! responses become [`ElasticError::Api`] carrying the status and raw body;
//! the status is what later decides whether a failure is retryable.

use std::time::Duration;

use kindred_core::config::ElasticConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ElasticError, ElasticResult};
use crate::mapping::profile_index_body;
use crate::query::SearchRequest;
use crate::response::{BulkResponse, SearchResponse};

const NDJSON: &str = "application/x-ndjson";

/// Elasticsearch client bound to one cluster endpoint.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    config: ElasticConfig,
    http: Client,
}

impl ElasticClient {
    /// Create a client from validated configuration.
    pub fn new(config: ElasticConfig) -> ElasticResult<Self> {
        config
            .validate()
            .map_err(|e| ElasticError::Config(e.to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ElasticError::Config(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    /// Name of the profile index.
    pub fn index(&self) -> &str {
        &self.config.index
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path);
        let request = self.http.request(method, url);
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn api_error(response: Response) -> ElasticError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ElasticError::Api { status, body }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ElasticResult<T> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// True if the cluster root answers with a 2xx.
    pub async fn ping(&self) -> ElasticResult<bool> {
        let response = self.request(Method::GET, "").send().await?;
        Ok(response.status().is_success())
    }

    pub async fn index_exists(&self, index: &str) -> ElasticResult<bool> {
        let response = self.request(Method::HEAD, index).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::api_error(response).await),
        }
    }

    pub async fn create_index(&self, index: &str, body: &Value) -> ElasticResult<()> {
        let response = self.request(Method::PUT, index).json(body).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    /// Create `index` with the profile mapping unless it already exists.
    ///
    /// Returns true if this call created it. Losing a creation race to another
    /// process counts as already existing.
    pub async fn ensure_index(&self, index: &str) -> ElasticResult<bool> {
        if self.index_exists(index).await? {
            debug!(index, "Index already exists");
            return Ok(false);
        }

        match self.create_index(index, &profile_index_body()).await {
            Ok(()) => {
                info!(index, "Created index with profile mapping");
                Ok(true)
            }
            Err(ElasticError::Api { status: 400, body })
                if body.contains("resource_already_exists_exception") =>
            {
                debug!(index, "Index created concurrently");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn search(&self, index: &str, request: &SearchRequest) -> ElasticResult<SearchResponse> {
        let response = self
            .request(Method::POST, &format!("{}/_search", index))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Submit a pre-encoded NDJSON bulk body.
    pub async fn bulk(&self, index: &str, body: String) -> ElasticResult<BulkResponse> {
        let response = self
            .request(Method::POST, &format!("{}/_bulk", index))
            .header(CONTENT_TYPE, NDJSON)
            .body(body)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ElasticConfig {
            endpoint: "localhost:9200".into(),
            ..Default::default()
        };
        assert!(matches!(
            ElasticClient::new(config),
            Err(ElasticError::Config(_))
        ));
    }

    #[test]
    fn test_index_accessor() {
        let client = ElasticClient::new(ElasticConfig::default()).unwrap();
        assert_eq!(client.index(), "users");
    }
}
