//! Index guard: decides whether seeding should run at all.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{CoreError, CoreResult};
use crate::traits::ProfileStore;

/// Gates ingestion on whether the target collection already holds data.
///
/// Seeding is idempotent because of this check: once documents exist, every
/// later ingestion run is a no-op.
pub struct IndexGuard {
    store: Arc<dyn ProfileStore>,
    collection: String,
}

impl IndexGuard {
    pub fn new(store: Arc<dyn ProfileStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// True iff the collection reports more than zero documents.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ProbeFailed`] when the probe cannot be answered.
    /// Callers must abort rather than guess.
    pub async fn has_data(&self) -> CoreResult<bool> {
        match self.store.count_documents(&self.collection).await {
            Ok(total) => {
                debug!(
                    collection = %self.collection,
                    total,
                    backend = self.store.backend_name(),
                    "Existence probe answered"
                );
                Ok(total > 0)
            }
            Err(source) => {
                error!(
                    collection = %self.collection,
                    error = %source,
                    "Existence probe failed"
                );
                Err(CoreError::ProbeFailed {
                    collection: self.collection.clone(),
                    source,
                })
            }
        }
    }
}
