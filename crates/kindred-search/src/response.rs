//! Typed views over Elasticsearch response bodies.
//!
//! Every field the service relies on is optional at the serde level so that a
//! missing field surfaces as [`ElasticError::MissingField`] naming the path,
//! rather than as an opaque decode error.

use std::collections::HashMap;

use kindred_core::SearchHit;
use serde::Deserialize;

use crate::error::{ElasticError, ElasticResult, TOO_MANY_REQUESTS};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Option<HitsEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Option<Vec<RawHit>>,
}

/// `hits.total` is an object on 7.x and later, a bare number before that.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
    Legacy(u64),
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value, .. } => *value,
            TotalHits::Legacy(value) => *value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Option<HitSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitSource {
    #[serde(default)]
    pub id: Option<String>,
}

impl SearchResponse {
    /// Exact document total reported by a probe.
    pub fn total(&self) -> ElasticResult<u64> {
        let hits = self.hits.as_ref().ok_or(ElasticError::MissingField("hits"))?;
        let total = hits
            .total
            .as_ref()
            .ok_or(ElasticError::MissingField("hits.total"))?;
        Ok(total.value())
    }

    /// Hits in response order. The profile id comes from `_source.id`, with
    /// `_id` as the fallback.
    pub fn into_hits(self) -> ElasticResult<Vec<SearchHit>> {
        let raw = self
            .hits
            .ok_or(ElasticError::MissingField("hits"))?
            .hits
            .ok_or(ElasticError::MissingField("hits.hits"))?;

        raw.into_iter()
            .map(|hit| {
                let id = hit
                    .source
                    .and_then(|s| s.id)
                    .or(hit.id)
                    .ok_or(ElasticError::MissingField("hits.hits._id"))?;
                Ok(SearchHit {
                    id,
                    score: hit.score,
                })
            })
            .collect()
    }
}

/// Response of `POST /{index}/_bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl BulkItem {
    fn failed(&self) -> bool {
        self.error.is_some() || !(200..300).contains(&self.status)
    }
}

impl BulkResponse {
    /// Ok only if every item was accepted.
    ///
    /// A 429 on any item wins over other item failures, so a partially
    /// throttled batch is resubmitted as a whole.
    pub fn check(self) -> ElasticResult<()> {
        if !self.errors {
            return Ok(());
        }

        let failed: Vec<BulkItem> = self
            .items
            .into_iter()
            .flat_map(|item| item.into_values())
            .filter(BulkItem::failed)
            .collect();

        let first = failed.first().ok_or_else(|| {
            ElasticError::UnexpectedShape("bulk reported errors but no item failed".to_string())
        })?;

        let status = if failed.iter().any(|i| i.status == TOO_MANY_REQUESTS) {
            TOO_MANY_REQUESTS
        } else {
            first.status
        };

        let body = format!(
            "{} of the batch's documents failed; first {}: {}",
            failed.len(),
            first.id.as_deref().unwrap_or("<unknown>"),
            first
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default()
        );
        Err(ElasticError::Api { status, body })
    }
}
