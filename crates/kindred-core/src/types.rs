//! Data model shared by the guard, the pipeline and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// =============================================================================
// PROFILES AND BATCHES
// =============================================================================

/// A user profile document as stored in the search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique identifier, also used as the backend document id.
    pub id: String,
    pub name: String,
    pub email: String,
    /// Category tags, compared by the similarity query.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Category tags, compared by the similarity query.
    #[serde(default)]
    pub hobbies: Vec<String>,
    pub age: u32,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// A contiguous, size-bounded slice of the records being imported.
///
/// Batches own their records; a batch is consumed by exactly one write
/// sequence (initial attempt plus retries).
#[derive(Debug, Clone)]
pub struct Batch {
    /// Zero-based position of this batch in the import.
    pub index: usize,
    /// Offset of the first record within the full record set.
    pub start: usize,
    pub records: Vec<UserProfile>,
}

impl Batch {
    /// Exclusive end offset within the full record set.
    pub fn end(&self) -> usize {
        self.start + self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// WRITE OUTCOMES
// =============================================================================

/// Classification of a failed batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorKind {
    /// The backend kept signalling overload until the attempt budget ran out.
    RetriesExhausted,
    /// A record could not be serialized into the bulk payload.
    Serialization,
    /// The backend refused the batch (malformed request, server error).
    Rejected,
    /// The backend could not be reached.
    Transport,
    /// The backend answered with something that could not be read.
    MalformedResponse,
    /// The run was cancelled before this batch finished.
    Cancelled,
    /// The task carrying the batch panicked or was aborted.
    TaskFailed,
}

impl BatchErrorKind {
    /// Map a non-overload store failure onto a batch classification.
    pub fn from_store_error(err: &StoreError) -> Self {
        match err {
            StoreError::Overloaded { .. } => BatchErrorKind::RetriesExhausted,
            StoreError::Rejected { .. } => BatchErrorKind::Rejected,
            StoreError::Transport(_) => BatchErrorKind::Transport,
            StoreError::MissingField { .. } | StoreError::UnexpectedShape(_) => {
                BatchErrorKind::MalformedResponse
            }
            StoreError::Serialization(_) => BatchErrorKind::Serialization,
        }
    }
}

/// Failure detail attached to an unsuccessful [`WriteOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub kind: BatchErrorKind,
    pub message: String,
}

/// Result of writing one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub batch_index: usize,
    pub start: usize,
    pub end: usize,
    pub success: bool,
    /// Number of submissions made, including the first one.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchFailure>,
}

impl WriteOutcome {
    pub fn succeeded(batch: &Batch, attempts: u32) -> Self {
        Self {
            batch_index: batch.index,
            start: batch.start,
            end: batch.end(),
            success: true,
            attempts,
            error: None,
        }
    }

    pub fn failed(
        batch: &Batch,
        attempts: u32,
        kind: BatchErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            batch_index: batch.index,
            start: batch.start,
            end: batch.end(),
            success: false,
            attempts,
            error: Some(BatchFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Retries consumed beyond the first submission.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Whether an ingestion run wrote anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// The collection already held data; no writes were issued.
    Skipped,
    /// Every batch was dispatched and has finished (successfully or not).
    Completed,
}

/// Aggregate result of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    pub collection: String,
    pub total_records: usize,
    pub batches_attempted: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    /// Outcomes of failed batches, ordered by batch index.
    pub failures: Vec<WriteOutcome>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn skipped(collection: &str, total_records: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            status: IngestStatus::Skipped,
            collection: collection.to_string(),
            total_records,
            batches_attempted: 0,
            batches_succeeded: 0,
            batches_failed: 0,
            failures: Vec::new(),
            started_at,
            elapsed_ms: 0,
        }
    }

    /// Fold per-batch outcomes into a completed report.
    pub fn from_outcomes(
        collection: &str,
        total_records: usize,
        outcomes: Vec<WriteOutcome>,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let batches_attempted = outcomes.len();
        let mut failures: Vec<WriteOutcome> =
            outcomes.into_iter().filter(|o| !o.success).collect();
        failures.sort_by_key(|o| o.batch_index);
        let batches_failed = failures.len();

        Self {
            status: IngestStatus::Completed,
            collection: collection.to_string(),
            total_records,
            batches_attempted,
            batches_succeeded: batches_attempted - batches_failed,
            batches_failed,
            failures,
            started_at,
            elapsed_ms,
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.status == IngestStatus::Completed && self.batches_failed == 0
    }
}

// =============================================================================
// QUERIES AND RESULTS
// =============================================================================

/// "More like this document" query over named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityQuery {
    /// Identifier of the reference document; excluded from the candidates.
    pub subject_id: String,
    pub fields: Vec<String>,
    pub min_term_freq: u32,
    pub max_query_terms: u32,
    pub size: usize,
}

/// Unranked query returning any documents except one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackQuery {
    pub exclude_id: String,
    pub size: usize,
}

/// One document returned by a query, in backend ranking order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: Option<f64>,
}

/// Which query produced a recommendation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Similarity,
    Fallback,
}

/// Ranked candidate ids for one subject. Never contains the subject itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub user_id: String,
    pub recommendations: Vec<String>,
    pub source: RecommendationSource,
}

impl RecommendationResult {
    pub fn len(&self) -> usize {
        self.recommendations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}
