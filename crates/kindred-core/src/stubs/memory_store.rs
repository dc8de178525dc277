//! In-memory profile store (TEST ONLY).

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::bulk::BulkPayload;
use crate::error::{StoreError, StoreResult};
use crate::traits::ProfileStore;
use crate::types::{FallbackQuery, SearchHit, SimilarityQuery, UserProfile};

/// Failure injected into bulk writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkFault {
    /// Signal overload on the next `times` submissions, then accept.
    Overload { times: usize },
    /// Signal overload on every submission.
    OverloadForever,
    /// Refuse with the given status on every submission.
    Reject { status: u16 },
    /// Fail as if the connection dropped.
    Transport,
}

/// In-memory [`ProfileStore`] for tests.
///
/// Documents are kept per collection in insertion order; writes upsert by id.
/// Similarity scoring sums, for every selected subject term the candidate
/// shares, `ln(1 + N / df)` where `N` is the collection size and `df` the
/// number of documents holding the term in that field. Candidates with no
/// shared term are not returned.
pub struct InMemoryProfileStore {
    collections: RwLock<HashMap<String, Vec<UserProfile>>>,
    /// Faults keyed by document id; applied to any payload carrying that id.
    document_faults: Mutex<HashMap<String, BulkFault>>,
    global_fault: Mutex<Option<BulkFault>>,
    /// Remaining overload responses per fault key.
    overload_budget: Mutex<HashMap<String, usize>>,
    probe_failure: Mutex<Option<StoreError>>,
    query_failure: Mutex<Option<StoreError>>,
    scripted_similarity: Mutex<Option<Vec<SearchHit>>>,
    write_latency: Mutex<Option<Duration>>,
    /// Submissions per payload, keyed by the payload's first document id.
    attempts_by_payload: Mutex<HashMap<String, usize>>,
    probe_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    similarity_calls: AtomicUsize,
    fallback_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        info!("Creating new InMemoryProfileStore (TEST ONLY - O(n) search, no persistence)");
        Self {
            collections: RwLock::new(HashMap::new()),
            document_faults: Mutex::new(HashMap::new()),
            global_fault: Mutex::new(None),
            overload_budget: Mutex::new(HashMap::new()),
            probe_failure: Mutex::new(None),
            query_failure: Mutex::new(None),
            scripted_similarity: Mutex::new(None),
            write_latency: Mutex::new(None),
            attempts_by_payload: Mutex::new(HashMap::new()),
            probe_calls: AtomicUsize::new(0),
            bulk_calls: AtomicUsize::new(0),
            similarity_calls: AtomicUsize::new(0),
            fallback_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    /// Insert documents directly, bypassing the bulk path and its counters.
    pub fn seed(&self, collection: &str, profiles: Vec<UserProfile>) {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        for profile in profiles {
            upsert(docs, profile);
        }
    }

    /// Fault applied to every payload that carries `document_id`.
    pub fn inject_bulk_fault(&self, document_id: &str, fault: BulkFault) {
        if let BulkFault::Overload { times } = fault {
            self.overload_budget.lock().insert(document_id.to_string(), times);
        }
        self.document_faults.lock().insert(document_id.to_string(), fault);
    }

    /// Fault applied to every payload. `Overload { times }` counts per payload.
    pub fn inject_global_bulk_fault(&self, fault: BulkFault) {
        *self.global_fault.lock() = Some(fault);
    }

    /// Every existence probe fails with a copy of `err`.
    pub fn fail_probe(&self, err: StoreError) {
        *self.probe_failure.lock() = Some(err);
    }

    /// Every similarity and fallback query fails with a copy of `err`.
    pub fn fail_queries(&self, err: StoreError) {
        *self.query_failure.lock() = Some(err);
    }

    /// Return `hits` verbatim from every similarity query.
    pub fn script_similarity_hits(&self, hits: Vec<SearchHit>) {
        *self.scripted_similarity.lock() = Some(hits);
    }

    /// Hold each bulk submission for `latency` before answering.
    pub fn set_write_latency(&self, latency: Duration) {
        *self.write_latency.lock() = Some(latency);
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn documents(&self, collection: &str) -> Vec<UserProfile> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn similarity_calls(&self) -> usize {
        self.similarity_calls.load(Ordering::SeqCst)
    }

    pub fn fallback_calls(&self) -> usize {
        self.fallback_calls.load(Ordering::SeqCst)
    }

    /// Submissions seen for the payload whose first document is `first_id`.
    pub fn attempts_for(&self, first_id: &str) -> usize {
        self.attempts_by_payload
            .lock()
            .get(first_id)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of bulk submissions observed in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn active_fault(&self, docs: &[(String, UserProfile)]) -> Option<(String, BulkFault)> {
        let faults = self.document_faults.lock();
        let by_document = docs
            .iter()
            .find_map(|(_, p)| faults.get(&p.id).map(|f| (p.id.clone(), *f)));
        drop(faults);

        by_document.or_else(|| {
            let first = docs.first().map(|(_, p)| p.id.clone()).unwrap_or_default();
            (*self.global_fault.lock()).map(|f| (format!("global:{}", first), f))
        })
    }

    fn apply_fault(&self, key: &str, fault: BulkFault) -> StoreResult<()> {
        match fault {
            BulkFault::OverloadForever => Err(StoreError::Overloaded { status: 429 }),
            BulkFault::Reject { status } => Err(StoreError::Rejected {
                status,
                body: "injected rejection".to_string(),
            }),
            BulkFault::Transport => Err(StoreError::Transport("injected transport failure".into())),
            BulkFault::Overload { times } => {
                let mut budget = self.overload_budget.lock();
                let remaining = budget.entry(key.to_string()).or_insert(times);
                if *remaining > 0 {
                    *remaining -= 1;
                    Err(StoreError::Overloaded { status: 429 })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn scripted_error(slot: &Mutex<Option<StoreError>>) -> Option<StoreError> {
        slot.lock().as_ref().map(replicate)
    }

    fn score_candidates(
        &self,
        docs: &[UserProfile],
        subject: &UserProfile,
        query: &SimilarityQuery,
    ) -> Vec<SearchHit> {
        let total = docs.len() as f64;
        let mut weighted_terms: Vec<(&str, String, f64)> = Vec::new();

        for field in &query.fields {
            let mut freq: HashMap<&str, u32> = HashMap::new();
            for term in field_terms(subject, field) {
                *freq.entry(term.as_str()).or_default() += 1;
            }

            let mut terms: Vec<(String, f64)> = freq
                .into_iter()
                .filter(|(_, tf)| *tf >= query.min_term_freq)
                .map(|(term, _)| {
                    let df = docs
                        .iter()
                        .filter(|d| field_terms(d, field).iter().any(|t| t == term))
                        .count()
                        .max(1) as f64;
                    (term.to_string(), (1.0 + total / df).ln())
                })
                .collect();
            terms.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(CmpOrdering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            terms.truncate(query.max_query_terms as usize);

            weighted_terms.extend(terms.into_iter().map(|(t, w)| (field.as_str(), t, w)));
        }

        let mut hits: Vec<SearchHit> = docs
            .iter()
            .filter(|d| d.id != subject.id)
            .filter_map(|candidate| {
                let score: f64 = weighted_terms
                    .iter()
                    .filter(|(field, term, _)| field_terms(candidate, field).contains(term))
                    .map(|(_, _, w)| *w)
                    .sum();
                (score > 0.0).then(|| SearchHit {
                    id: candidate.id.clone(),
                    score: Some(score),
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(CmpOrdering::Equal)
        });
        hits.truncate(query.size);
        hits
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::scripted_error(&self.probe_failure) {
            return Err(err);
        }
        Ok(self.document_count(collection) as u64)
    }

    async fn bulk_write(&self, collection: &str, payload: &BulkPayload) -> StoreResult<()> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let latency = *self.write_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let result = self.accept_bulk(collection, payload);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn similar_to(
        &self,
        collection: &str,
        query: &SimilarityQuery,
    ) -> StoreResult<Vec<SearchHit>> {
        self.similarity_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::scripted_error(&self.query_failure) {
            return Err(err);
        }
        if let Some(hits) = self.scripted_similarity.lock().clone() {
            return Ok(hits);
        }

        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let Some(subject) = docs.iter().find(|d| d.id == query.subject_id) else {
            debug!(subject = %query.subject_id, "Subject not found, no similarity hits");
            return Ok(Vec::new());
        };

        Ok(self.score_candidates(docs, subject, query))
    }

    async fn excluding(
        &self,
        collection: &str,
        query: &FallbackQuery,
    ) -> StoreResult<Vec<SearchHit>> {
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::scripted_error(&self.query_failure) {
            return Err(err);
        }

        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|d| d.id != query.exclude_id)
            .take(query.size)
            .map(|d| SearchHit {
                id: d.id,
                score: None,
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

impl InMemoryProfileStore {
    fn accept_bulk(&self, collection: &str, payload: &BulkPayload) -> StoreResult<()> {
        let docs = payload.decode().map_err(|e| StoreError::Rejected {
            status: 400,
            body: format!("malformed bulk body: {}", e),
        })?;

        if let Some((_, first)) = docs.first() {
            *self
                .attempts_by_payload
                .lock()
                .entry(first.id.clone())
                .or_default() += 1;
        }

        if let Some((key, fault)) = self.active_fault(&docs) {
            self.apply_fault(&key, fault)?;
        }

        let targets: HashSet<&str> = docs.iter().map(|(c, _)| c.as_str()).collect();
        if targets.iter().any(|c| *c != collection) {
            return Err(StoreError::Rejected {
                status: 400,
                body: format!("payload targets {:?}, request targets '{}'", targets, collection),
            });
        }

        let mut collections = self.collections.write();
        let stored = collections.entry(collection.to_string()).or_default();
        for (_, profile) in docs {
            upsert(stored, profile);
        }
        Ok(())
    }
}

fn upsert(docs: &mut Vec<UserProfile>, profile: UserProfile) {
    match docs.iter_mut().find(|d| d.id == profile.id) {
        Some(existing) => *existing = profile,
        None => docs.push(profile),
    }
}

fn field_terms<'a>(profile: &'a UserProfile, field: &str) -> &'a [String] {
    match field {
        "interests" => &profile.interests,
        "hobbies" => &profile.hobbies,
        _ => &[],
    }
}

/// StoreError is not Clone (it can wrap serde_json::Error); rebuild an equivalent.
fn replicate(err: &StoreError) -> StoreError {
    match err {
        StoreError::Overloaded { status } => StoreError::Overloaded { status: *status },
        StoreError::Rejected { status, body } => StoreError::Rejected {
            status: *status,
            body: body.clone(),
        },
        StoreError::Transport(msg) => StoreError::Transport(msg.clone()),
        StoreError::MissingField { field } => StoreError::MissingField { field },
        StoreError::UnexpectedShape(msg) => StoreError::UnexpectedShape(msg.clone()),
        StoreError::Serialization(e) => StoreError::UnexpectedShape(e.to_string()),
    }
}
