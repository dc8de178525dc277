//! Kindred Search - Elasticsearch profile store
//!
//! Implements [`kindred_core::ProfileStore`] on top of the Elasticsearch REST
//! API using an async reqwest client.
//!
//! # Wire contract
//!
//! | Operation         | Request                                   |
//! |-------------------|-------------------------------------------|
//! | existence probe   | `POST /{index}/_search` with `size: 0`    |
//! | bulk write        | `POST /{index}/_bulk` (NDJSON)            |
//! | similarity query  | `POST /{index}/_search` (`more_like_this`)|
//! | fallback query    | `POST /{index}/_search` (`must_not ids`)  |
//! | index bootstrap   | `HEAD /{index}`, then `PUT /{index}`      |
//!
//! HTTP 429, or a bulk item with status 429, is reported as
//! [`kindred_core::StoreError::Overloaded`]; every other failure maps to a
//! non-retryable variant.
//!
//! # Usage
//!
//! ```ignore
//! use kindred_search::{ElasticClient, ElasticProfileStore};
//!
//! let client = ElasticClient::new(config.elastic.clone())?;
//! let store = ElasticProfileStore::new(client);
//! store.ensure_collection().await?;
//! ```

pub mod client;
pub mod error;
pub mod mapping;
pub mod query;
pub mod response;
pub mod store;

pub use client::ElasticClient;
pub use error::{ElasticError, ElasticResult};
pub use store::ElasticProfileStore;
