//! Stub implementations for development and testing.
//!
//! # TEST ONLY - DO NOT USE IN PRODUCTION
//!
//! All stub exports are gated with `#[cfg(any(test, feature = "test-utils"))]`.
//! Production code cannot import these stubs unless the `test-utils` feature
//! is enabled, and that feature must never be enabled in production builds.
//!
//! # Stubs
//!
//! - [`InMemoryProfileStore`]: in-process [`crate::ProfileStore`] with
//!   term-overlap similarity scoring, fault injection and call counters.
//!   O(n) queries, no persistence.
//!
//! # Usage
//!
//! ```ignore
//! // [dev-dependencies]
//! // kindred-core = { workspace = true, features = ["test-utils"] }
//!
//! use kindred_core::stubs::{BulkFault, InMemoryProfileStore};
//!
//! let store = InMemoryProfileStore::new();
//! store.inject_global_bulk_fault(BulkFault::Overload { times: 1 });
//! ```

#[cfg(any(test, feature = "test-utils"))]
mod memory_store;

#[cfg(any(test, feature = "test-utils"))]
pub use memory_store::{BulkFault, InMemoryProfileStore};
