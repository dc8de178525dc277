//! Elasticsearch client errors.

use kindred_core::StoreError;
use thiserror::Error;

/// Errors that can occur while talking to Elasticsearch.
#[derive(Debug, Error)]
pub enum ElasticError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response field missing: {0}")]
    MissingField(&'static str),

    #[error("Unexpected response: {0}")]
    UnexpectedShape(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type ElasticResult<T> = Result<T, ElasticError>;

pub(crate) const TOO_MANY_REQUESTS: u16 = 429;

impl From<ElasticError> for StoreError {
    fn from(err: ElasticError) -> Self {
        match err {
            ElasticError::Api { status, .. } if status == TOO_MANY_REQUESTS => {
                StoreError::Overloaded { status }
            }
            ElasticError::Api { status, body } => StoreError::Rejected { status, body },
            ElasticError::Http(e) if e.is_decode() => StoreError::UnexpectedShape(e.to_string()),
            ElasticError::Http(e) => StoreError::Transport(e.to_string()),
            ElasticError::Decode(e) => StoreError::UnexpectedShape(e.to_string()),
            ElasticError::MissingField(field) => StoreError::MissingField { field },
            ElasticError::UnexpectedShape(msg) => StoreError::UnexpectedShape(msg),
            ElasticError::Config(msg) => StoreError::Transport(format!("client misconfigured: {}", msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_becomes_overload() {
        let err: StoreError = ElasticError::Api {
            status: 429,
            body: "circuit_breaking_exception".into(),
        }
        .into();
        assert!(err.is_overload());
    }

    #[test]
    fn test_other_statuses_become_rejections() {
        for status in [400, 404, 500, 503] {
            let err: StoreError = ElasticError::Api {
                status,
                body: String::new(),
            }
            .into();
            assert!(matches!(err, StoreError::Rejected { status: s, .. } if s == status));
        }
    }

    #[test]
    fn test_decode_failures_are_unexpected_shape() {
        let decode = serde_json::from_str::<u64>("\"nope\"").unwrap_err();
        let err: StoreError = ElasticError::Decode(decode).into();
        assert!(err.is_malformed_response());

        let err: StoreError = ElasticError::MissingField("hits.total").into();
        assert!(matches!(err, StoreError::MissingField { field: "hits.total" }));
    }
}
