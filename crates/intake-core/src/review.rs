//! Human review queue entries and their storage seam

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::stable_id;

use crate::error::IntakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    LowConfidence,
    NoCandidate,
    NoMatchingJobRow,
    /// Terminal record for a document that merged without waiting on a human
    AutoMerged,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::LowConfidence => "low_confidence",
            ReasonCode::NoCandidate => "no_candidate",
            ReasonCode::NoMatchingJobRow => "no_matching_job_row",
            ReasonCode::AutoMerged => "auto_merged",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed document waiting for (or past) a human decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub review_id: String,
    /// Normalized issuer key
    pub fm_key: String,
    pub document_fingerprint: String,
    pub candidate_number: Option<String>,
    pub confidence_raw: Option<f64>,
    pub reason_code: ReasonCode,
    pub resolved: bool,
    pub manual_number: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    #[serde(default)]
    pub manually_overridden: bool,
    pub signed_pdf_ref: Option<String>,
    /// Repeat extractions that arrived after the entry was resolved
    #[serde(default)]
    pub conflict_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewEntry {
    pub fn open(
        fm_key: &str,
        document_fingerprint: &str,
        reason_code: ReasonCode,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            review_id: review_id_for(fm_key, document_fingerprint),
            fm_key: fm_key.to_string(),
            document_fingerprint: document_fingerprint.to_string(),
            candidate_number: None,
            confidence_raw: None,
            reason_code,
            resolved: false,
            manual_number: None,
            resolved_at: None,
            note: None,
            manually_overridden: false,
            signed_pdf_ref: None,
            conflict_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark terminal. Resolution is sticky: nothing in this crate clears it.
    pub fn mark_resolved(&mut self, now: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_at = Some(now);
        self.updated_at = now;
    }
}

/// Deterministic id, so re-processing the same document addresses the same entry
pub fn review_id_for(fm_key: &str, document_fingerprint: &str) -> String {
    stable_id("rev_", &[fm_key, document_fingerprint])
}

/// Review-entry storage supplied by the host
pub trait ReviewStore: Send + Sync {
    /// Insert or replace by `review_id`.
    ///
    /// Must never downgrade `resolved`: when the stored entry is resolved and the
    /// incoming copy is not, the stored resolution (`resolved`, `resolved_at`,
    /// `manual_number`, `manually_overridden`) wins. A park that loaded the entry
    /// before a concurrent resolve otherwise reopens it.
    fn persist_review_entry(&self, entry: &ReviewEntry) -> Result<(), IntakeError>;

    fn load_review_entry(&self, review_id: &str) -> Result<Option<ReviewEntry>, IntakeError>;
}

impl<T: ReviewStore + ?Sized> ReviewStore for &T {
    fn persist_review_entry(&self, entry: &ReviewEntry) -> Result<(), IntakeError> {
        (**self).persist_review_entry(entry)
    }

    fn load_review_entry(&self, review_id: &str) -> Result<Option<ReviewEntry>, IntakeError> {
        (**self).load_review_entry(review_id)
    }
}

impl<T: ReviewStore + ?Sized> ReviewStore for Arc<T> {
    fn persist_review_entry(&self, entry: &ReviewEntry) -> Result<(), IntakeError> {
        (**self).persist_review_entry(entry)
    }

    fn load_review_entry(&self, review_id: &str) -> Result<Option<ReviewEntry>, IntakeError> {
        (**self).load_review_entry(review_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    entries: Mutex<BTreeMap<String, ReviewEntry>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, ReviewEntry>>, IntakeError> {
        self.entries
            .lock()
            .map_err(|_| IntakeError::ReviewStore("review store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries still waiting on a human
    pub fn pending(&self) -> Vec<ReviewEntry> {
        self.lock()
            .map(|entries| {
                entries
                    .values()
                    .filter(|entry| !entry.resolved)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ReviewStore for MemoryReviewStore {
    fn persist_review_entry(&self, entry: &ReviewEntry) -> Result<(), IntakeError> {
        let mut entries = self.lock()?;
        let mut incoming = entry.clone();
        if let Some(stored) = entries.get(&entry.review_id) {
            if stored.resolved && !incoming.resolved {
                incoming.resolved = true;
                incoming.resolved_at = stored.resolved_at;
                incoming.manual_number = stored.manual_number.clone();
                incoming.manually_overridden = stored.manually_overridden;
            }
        }
        entries.insert(incoming.review_id.clone(), incoming);
        Ok(())
    }

    fn load_review_entry(&self, review_id: &str) -> Result<Option<ReviewEntry>, IntakeError> {
        Ok(self.lock()?.get(review_id).cloned())
    }
}
