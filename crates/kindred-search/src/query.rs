//! Typed Elasticsearch query DSL, limited to the shapes this service sends.

use kindred_core::{FallbackQuery, SimilarityQuery};
use serde::Serialize;

/// Body of a `POST /{index}/_search` request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRequest {
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    pub query: Query,
}

/// Query clauses, serialized externally tagged: `{"match_all": {}}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    MatchAll {},
    Bool {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        must: Vec<Query>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        must_not: Vec<Query>,
    },
    MoreLikeThis {
        fields: Vec<String>,
        like: Vec<DocumentRef>,
        min_term_freq: u32,
        max_query_terms: u32,
    },
    Ids {
        values: Vec<String>,
    },
}

/// Reference to an indexed document, used as a `more_like_this` seed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentRef {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
}

impl SearchRequest {
    /// Zero-size match-all with an exact total.
    pub fn probe() -> Self {
        Self {
            size: 0,
            track_total_hits: Some(true),
            source: None,
            query: Query::MatchAll {},
        }
    }

    /// `more_like_this` seeded by the subject document, which is also excluded.
    pub fn similarity(index: &str, query: &SimilarityQuery) -> Self {
        Self {
            size: query.size,
            track_total_hits: None,
            source: Some(vec!["id".to_string()]),
            query: Query::Bool {
                must: vec![Query::MoreLikeThis {
                    fields: query.fields.clone(),
                    like: vec![DocumentRef {
                        index: index.to_string(),
                        id: query.subject_id.clone(),
                    }],
                    min_term_freq: query.min_term_freq,
                    max_query_terms: query.max_query_terms,
                }],
                must_not: vec![Query::exclude(&query.subject_id)],
            },
        }
    }

    /// Every document except the subject.
    pub fn fallback(query: &FallbackQuery) -> Self {
        Self {
            size: query.size,
            track_total_hits: None,
            source: Some(vec!["id".to_string()]),
            query: Query::Bool {
                must: Vec::new(),
                must_not: vec![Query::exclude(&query.exclude_id)],
            },
        }
    }
}

impl Query {
    fn exclude(id: &str) -> Self {
        Query::Ids {
            values: vec![id.to_string()],
        }
    }
}
