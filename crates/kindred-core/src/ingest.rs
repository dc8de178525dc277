//! Batch ingestion pipeline.
//!
//! Turns an in-memory record set into concurrent bulk writes:
//!
//! 1. Ask the [`IndexGuard`]; if the collection already holds data, skip.
//! 2. Partition the records into batches of at most `batch_size`.
//! 3. Spawn one task per batch. Each task encodes its batch and submits it,
//!    retrying on the overload signal only, up to `max_attempts` submissions.
//! 4. Wait for every task, then fold the outcomes into an [`IngestReport`].
//!
//! Writes are not transactional across batches. A report with failed batches
//! is a normal result and is returned as `Ok`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::bulk::BulkPayload;
use crate::config::IngestConfig;
use crate::error::{CoreError, CoreResult};
use crate::guard::IndexGuard;
use crate::retry::{Backoff, CancelFlag, FixedBackoff};
use crate::traits::ProfileStore;
use crate::types::{Batch, BatchErrorKind, BatchFailure, IngestReport, UserProfile, WriteOutcome};

/// Split `records` into consecutive batches of `batch_size` (the last may be
/// smaller). Records are moved, never cloned.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] if `batch_size` is zero.
pub fn partition(records: Vec<UserProfile>, batch_size: usize) -> CoreResult<Vec<Batch>> {
    if batch_size == 0 {
        return Err(CoreError::InvalidInput(
            "batch size must be greater than 0".to_string(),
        ));
    }

    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut remaining = records.into_iter();
    let mut start = 0;

    loop {
        let chunk: Vec<UserProfile> = remaining.by_ref().take(batch_size).collect();
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        batches.push(Batch {
            index: batches.len(),
            start,
            records: chunk,
        });
        start += len;
    }

    Ok(batches)
}

/// Concurrent, overload-aware bulk loader for one collection.
pub struct IngestPipeline {
    store: Arc<dyn ProfileStore>,
    guard: IndexGuard,
    collection: String,
    config: IngestConfig,
    backoff: Arc<dyn Backoff>,
    cancel: CancelFlag,
}

impl IngestPipeline {
    /// Create a pipeline writing into `collection`.
    ///
    /// The retry delay defaults to a [`FixedBackoff`] of
    /// `config.retry_delay_ms`; replace it with [`IngestPipeline::with_backoff`].
    pub fn new(
        store: Arc<dyn ProfileStore>,
        collection: impl Into<String>,
        config: IngestConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        let collection = collection.into();
        let guard = IndexGuard::new(Arc::clone(&store), collection.clone());
        let backoff: Arc<dyn Backoff> = Arc::new(FixedBackoff::new(config.retry_delay()));

        Ok(Self {
            store,
            guard,
            collection,
            config,
            backoff,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that cancels in-flight runs of this pipeline.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Seed the collection with `records` unless it already holds data.
    ///
    /// # Errors
    ///
    /// Only a failed existence probe is an error. Batch failures are reported
    /// inside the returned [`IngestReport`].
    pub async fn ingest(&self, records: Vec<UserProfile>) -> CoreResult<IngestReport> {
        let started_at = Utc::now();
        let total_records = records.len();

        if self.guard.has_data().await? {
            info!(
                collection = %self.collection,
                "Collection already has data, skipping import"
            );
            return Ok(IngestReport::skipped(&self.collection, total_records, started_at));
        }

        let clock = Instant::now();
        let batches = partition(records, self.config.batch_size)?;
        info!(
            collection = %self.collection,
            records = total_records,
            batches = batches.len(),
            batch_size = self.config.batch_size,
            "Collection is empty, importing"
        );

        // Keep each batch's range outside its task so a panicked task still
        // yields a WriteOutcome.
        let mut ranges = Vec::with_capacity(batches.len());
        let tasks: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                ranges.push((batch.index, batch.start, batch.end()));
                let store = Arc::clone(&self.store);
                let backoff = Arc::clone(&self.backoff);
                let cancel = self.cancel.clone();
                let collection = self.collection.clone();
                let max_attempts = self.config.max_attempts;

                tokio::spawn(async move {
                    write_batch(store, &collection, batch, max_attempts, backoff, cancel).await
                })
            })
            .collect();

        let task_results = join_all(tasks).await;

        let outcomes: Vec<WriteOutcome> = task_results
            .into_iter()
            .zip(ranges)
            .map(|(result, (batch_index, start, end))| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(batch = batch_index, error = %e, "Batch task failed");
                    WriteOutcome {
                        batch_index,
                        start,
                        end,
                        success: false,
                        attempts: 0,
                        error: Some(BatchFailure {
                            kind: BatchErrorKind::TaskFailed,
                            message: format!("Batch task failed: {}", e),
                        }),
                    }
                }
            })
            .collect();

        let elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = IngestReport::from_outcomes(
            &self.collection,
            total_records,
            outcomes,
            started_at,
            elapsed_ms,
        );

        if report.batches_failed > 0 {
            warn!(
                collection = %self.collection,
                attempted = report.batches_attempted,
                succeeded = report.batches_succeeded,
                failed = report.batches_failed,
                elapsed_ms,
                "Import finished with failed batches"
            );
        } else {
            info!(
                collection = %self.collection,
                attempted = report.batches_attempted,
                elapsed_ms,
                "Import completed"
            );
        }

        Ok(report)
    }
}

/// Write one batch, retrying only on the overload signal.
async fn write_batch(
    store: Arc<dyn ProfileStore>,
    collection: &str,
    batch: Batch,
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
    cancel: CancelFlag,
) -> WriteOutcome {
    if cancel.is_cancelled() {
        return WriteOutcome::failed(&batch, 0, BatchErrorKind::Cancelled, "Cancelled before start");
    }

    let payload = match BulkPayload::encode(collection, &batch.records) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(batch = batch.index, error = %e, "Failed to encode batch");
            return WriteOutcome::failed(&batch, 0, BatchErrorKind::Serialization, e.to_string());
        }
    };

    let mut attempt = 0;
    loop {
        attempt += 1;
        match store.bulk_write(collection, &payload).await {
            Ok(()) => {
                debug!(
                    batch = batch.index,
                    start = batch.start + 1,
                    end = batch.end(),
                    attempt,
                    "Indexed batch"
                );
                return WriteOutcome::succeeded(&batch, attempt);
            }
            Err(err) if err.is_overload() => {
                if attempt >= max_attempts {
                    warn!(
                        batch = batch.index,
                        attempts = attempt,
                        "Backend still overloaded, giving up on batch"
                    );
                    return WriteOutcome::failed(
                        &batch,
                        attempt,
                        BatchErrorKind::RetriesExhausted,
                        format!("Max retries reached after {} attempts: {}", attempt, err),
                    );
                }
                if cancel.is_cancelled() {
                    return WriteOutcome::failed(
                        &batch,
                        attempt,
                        BatchErrorKind::Cancelled,
                        "Cancelled while waiting to retry",
                    );
                }
                debug!(batch = batch.index, attempt, "Backend overloaded, backing off");
                backoff.wait(attempt + 1).await;
                if cancel.is_cancelled() {
                    return WriteOutcome::failed(
                        &batch,
                        attempt,
                        BatchErrorKind::Cancelled,
                        "Cancelled during retry backoff",
                    );
                }
            }
            Err(err) => {
                warn!(batch = batch.index, attempt, error = %err, "Batch write failed");
                return WriteOutcome::failed(
                    &batch,
                    attempt,
                    BatchErrorKind::from_store_error(&err),
                    err.to_string(),
                );
            }
        }
    }
}
