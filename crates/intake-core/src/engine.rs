//! Confidence decision engine and the review lifecycle
//!
//! A signed document's extraction is either merged into the ledger straight
//! away (HIGH and MEDIUM bands) or parked as a review entry for a human
//! (LOW band, no candidate, or no job row to merge into). Humans then resolve
//! or override those entries.
//!
//! ```text
//! extraction ─┬─ HIGH/MEDIUM + job row ──► AUTO_MERGED
//!             └─ otherwise ──────────────► PENDING_REVIEW
//!                                            ├─ resolve, row exists ──► RESOLVED_UPDATED
//!                                            ├─ resolve, no row ──────► RESOLVED_NO_MATCH
//!                                            └─ override, row exists ─► OVERRIDDEN
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::confidence::{classify_confidence, BandThreshold, ConfidenceBand, DEFAULT_BANDS};
use crate::config::IntakeConfig;
use crate::error::IntakeError;
use crate::events::IntakeEvent;
use crate::identity::{normalize_issuer, record_key};
use crate::ledger::{JobStatus, Ledger, LedgerFields, LedgerRow};
use crate::review::{review_id_for, ReasonCode, ReviewEntry, ReviewStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    AutoMerged,
    PendingReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionOutcome {
    ResolvedUpdated,
    ResolvedNoMatch,
    Overridden,
}

/// Per-document facts the engine needs besides the extraction itself
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionContext {
    /// Raw issuer (sender address or platform name)
    pub issuer: String,
    pub document_fingerprint: String,
    pub signed_pdf_ref: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl DecisionContext {
    pub fn new(issuer: impl Into<String>, document_fingerprint: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            document_fingerprint: document_fingerprint.into(),
            signed_pdf_ref: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_signed_pdf_ref(mut self, signed_pdf_ref: impl Into<String>) -> Self {
        self.signed_pdf_ref = Some(signed_pdf_ref.into());
        self
    }

    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub outcome: DecisionOutcome,
    pub band: ConfidenceBand,
    /// Key of the row written, or the row a pending candidate would land on
    pub record_key: Option<String>,
    pub review_id: Option<String>,
    pub reason: Option<ReasonCode>,
    pub events: Vec<IntakeEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    pub review_id: String,
    pub record_key: String,
    pub events: Vec<IntakeEvent>,
}

/// Decision engine over a host ledger and review store.
///
/// Stateless between calls apart from what the two stores hold, so one engine
/// can serve concurrent requests when the stores can.
pub struct DecisionEngine<L, R> {
    ledger: L,
    reviews: R,
    bands: Vec<BandThreshold>,
    require_existing_job: bool,
}

impl<L: Ledger, R: ReviewStore> DecisionEngine<L, R> {
    /// Engine with the default band table and merge policy
    pub fn new(ledger: L, reviews: R) -> Self {
        Self {
            ledger,
            reviews,
            bands: DEFAULT_BANDS.to_vec(),
            require_existing_job: true,
        }
    }

    pub fn from_config(ledger: L, reviews: R, config: &IntakeConfig) -> Self {
        Self {
            ledger,
            reviews,
            bands: config.confidence.bands.clone(),
            require_existing_job: config.merge.require_existing_job,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn reviews(&self) -> &R {
        &self.reviews
    }

    /// Decide what happens to one extraction and apply it.
    ///
    /// Confidence must be finite and within `[0, 1]`; anything else is
    /// `MalformedConfidence`. LOW confidence, a missing candidate and a missing
    /// job row are outcomes, not errors.
    pub fn decide_and_merge(
        &self,
        candidate_number: Option<&str>,
        confidence_raw: f64,
        context: &DecisionContext,
    ) -> Result<Decision, IntakeError> {
        let band = classify_confidence(confidence_raw, &self.bands)?;
        let fm_key = normalize_issuer(&context.issuer);
        let candidate = candidate_number
            .map(str::trim)
            .filter(|number| !number.is_empty());
        let mut events = Vec::new();

        let Some(candidate) = candidate else {
            return self.park(
                None,
                confidence_raw,
                band,
                ReasonCode::NoCandidate,
                context,
                events,
            );
        };
        let key = record_key(&context.issuer, candidate);

        if !band.auto_merges() {
            return self.park(
                Some(candidate),
                confidence_raw,
                band,
                ReasonCode::LowConfidence,
                context,
                events,
            );
        }

        if self.require_existing_job && self.find_job_row(&key, candidate, &mut events)?.is_none() {
            return self.park(
                Some(candidate),
                confidence_raw,
                band,
                ReasonCode::NoMatchingJobRow,
                context,
                events,
            );
        }

        // An open review for this document is closed by the merge
        let review_id = review_id_for(&fm_key, &context.document_fingerprint);
        let stored_review = self.reviews.load_review_entry(&review_id)?;
        let open_review = stored_review.as_ref().filter(|entry| !entry.resolved);

        let fields = LedgerFields {
            work_order_number: Some(candidate.to_string()),
            issuer: Some(fm_key.clone()),
            status: Some(JobStatus::Signed),
            signed_at: Some(context.received_at),
            signed_pdf_ref: context.signed_pdf_ref.clone(),
            confidence_band: Some(band),
            confidence_raw: Some(confidence_raw),
            low_confidence: Some(band.is_flagged()),
            review_id: open_review.map(|entry| entry.review_id.clone()),
            ..Default::default()
        };
        self.ledger.upsert_row(&key, fields)?;

        info!(
            record_key = %key,
            band = %band,
            confidence = confidence_raw,
            "Signed document merged"
        );
        events.push(IntakeEvent::Merged {
            record_key: key.clone(),
            band,
            low_confidence: band.is_flagged(),
        });

        let mut closed_review = None;
        match stored_review {
            Some(mut entry) if !entry.resolved => {
                entry.candidate_number = Some(candidate.to_string());
                entry.confidence_raw = Some(confidence_raw);
                entry.mark_resolved(context.received_at);
                self.reviews.persist_review_entry(&entry)?;
                debug!(review_id = %entry.review_id, "Open review closed by auto-merge");
                events.push(IntakeEvent::ReviewResolved {
                    review_id: entry.review_id.clone(),
                    record_key: key.clone(),
                });
                closed_review = Some(entry.review_id);
            }
            Some(_) => {}
            None => {
                // Every merged document leaves a resolved entry; a later weak read
                // of it counts as a conflict
                let mut entry = ReviewEntry::open(
                    &fm_key,
                    &context.document_fingerprint,
                    ReasonCode::AutoMerged,
                    context.received_at,
                );
                entry.candidate_number = Some(candidate.to_string());
                entry.confidence_raw = Some(confidence_raw);
                entry.signed_pdf_ref = context.signed_pdf_ref.clone();
                entry.mark_resolved(context.received_at);
                self.reviews.persist_review_entry(&entry)?;
                debug!(review_id = %entry.review_id, "Merge recorded as resolved");
            }
        }

        Ok(Decision {
            outcome: DecisionOutcome::AutoMerged,
            band,
            record_key: Some(key),
            review_id: closed_review,
            reason: None,
            events,
        })
    }

    /// Apply a human-supplied work-order number to a pending review.
    ///
    /// Merges and resolves when the job row exists; otherwise records the
    /// number and leaves the entry open so the call can be retried once the
    /// job has been created.
    pub fn resolve_review(
        &self,
        review_id: &str,
        manual_number: &str,
        note: Option<&str>,
    ) -> Result<Resolution, IntakeError> {
        let manual = manual_number.trim();
        if manual.is_empty() {
            return Err(IntakeError::EmptyManualNumber);
        }
        let mut entry = self.load_entry(review_id)?;
        let mut events = Vec::new();

        if entry.resolved {
            debug!(review_id, "Review already resolved, nothing to do");
            events.push(IntakeEvent::AlreadyResolved {
                review_id: review_id.to_string(),
            });
            // Report the row the earlier resolution wrote, not the one asked for now
            let merged_number = entry
                .manual_number
                .as_deref()
                .or(entry.candidate_number.as_deref())
                .unwrap_or(manual);
            return Ok(Resolution {
                outcome: ResolutionOutcome::ResolvedUpdated,
                review_id: review_id.to_string(),
                record_key: record_key(&entry.fm_key, merged_number),
                events,
            });
        }

        let key = record_key(&entry.fm_key, manual);

        let now = Utc::now();
        entry.manual_number = Some(manual.to_string());
        if let Some(note) = note {
            entry.note = Some(note.to_string());
        }

        if self.find_job_row(&key, manual, &mut events)?.is_none() {
            return self.leave_unmatched(entry, key, now, events);
        }

        let fields = LedgerFields {
            work_order_number: Some(manual.to_string()),
            issuer: Some(entry.fm_key.clone()),
            status: Some(JobStatus::Signed),
            signed_at: Some(now),
            signed_pdf_ref: entry.signed_pdf_ref.clone(),
            review_id: Some(entry.review_id.clone()),
            ..Default::default()
        };
        self.ledger.upsert_row(&key, fields)?;

        entry.mark_resolved(now);
        self.reviews.persist_review_entry(&entry)?;

        info!(review_id, record_key = %key, "Review resolved");
        events.push(IntakeEvent::ReviewResolved {
            review_id: review_id.to_string(),
            record_key: key.clone(),
        });

        Ok(Resolution {
            outcome: ResolutionOutcome::ResolvedUpdated,
            review_id: review_id.to_string(),
            record_key: key,
            events,
        })
    }

    /// Force a merge with a known-good signed PDF, bypassing confidence.
    ///
    /// Still requires the job row to exist; without one this behaves like an
    /// unmatched resolve. An empty `signed_pdf_ref` falls back to the one
    /// recorded on the entry.
    pub fn override_review(
        &self,
        review_id: &str,
        manual_number: &str,
        signed_pdf_ref: &str,
        note: Option<&str>,
    ) -> Result<Resolution, IntakeError> {
        let manual = manual_number.trim();
        if manual.is_empty() {
            return Err(IntakeError::EmptyManualNumber);
        }
        let mut entry = self.load_entry(review_id)?;
        let key = record_key(&entry.fm_key, manual);
        let mut events = Vec::new();
        let now = Utc::now();

        let pdf_ref = Some(signed_pdf_ref.trim())
            .filter(|pdf_ref| !pdf_ref.is_empty())
            .map(str::to_string)
            .or_else(|| entry.signed_pdf_ref.clone());

        entry.manual_number = Some(manual.to_string());
        entry.signed_pdf_ref = pdf_ref.clone();
        if let Some(note) = note {
            entry.note = Some(note.to_string());
        }

        if self.find_job_row(&key, manual, &mut events)?.is_none() {
            return self.leave_unmatched(entry, key, now, events);
        }

        let fields = LedgerFields {
            work_order_number: Some(manual.to_string()),
            issuer: Some(entry.fm_key.clone()),
            status: Some(JobStatus::Signed),
            signed_at: Some(now),
            signed_pdf_ref: pdf_ref,
            manually_overridden: Some(true),
            review_id: Some(entry.review_id.clone()),
            ..Default::default()
        };
        self.ledger.upsert_row(&key, fields)?;

        entry.manually_overridden = true;
        entry.mark_resolved(now);
        self.reviews.persist_review_entry(&entry)?;

        info!(review_id, record_key = %key, "Review manually overridden");
        events.push(IntakeEvent::ManualOverride {
            review_id: review_id.to_string(),
            record_key: key.clone(),
        });

        Ok(Resolution {
            outcome: ResolutionOutcome::Overridden,
            review_id: review_id.to_string(),
            record_key: key,
            events,
        })
    }

    fn load_entry(&self, review_id: &str) -> Result<ReviewEntry, IntakeError> {
        self.reviews
            .load_review_entry(review_id)?
            .ok_or_else(|| IntakeError::ReviewNotFound(review_id.to_string()))
    }

    /// Job row for `key`. A row carrying the same work-order number under a
    /// different issuer is reported but never merged into.
    fn find_job_row(
        &self,
        key: &str,
        wo_number: &str,
        events: &mut Vec<IntakeEvent>,
    ) -> Result<Option<LedgerRow>, IntakeError> {
        if let Some(row) = self.ledger.get_row(key)? {
            return Ok(Some(row));
        }
        if let Some(other) = self.ledger.find_row_by_wo_number(wo_number)? {
            if other.record_key != key {
                warn!(
                    expected_key = %key,
                    found_key = %other.record_key,
                    "Work order exists under a different issuer"
                );
                events.push(IntakeEvent::IssuerMismatch {
                    expected_key: key.to_string(),
                    found_key: other.record_key,
                });
            }
        }
        Ok(None)
    }

    /// Record a human-supplied number that has no job row yet.
    /// Resolution is sticky, so an already-resolved entry keeps its reason.
    fn leave_unmatched(
        &self,
        mut entry: ReviewEntry,
        key: String,
        now: DateTime<Utc>,
        mut events: Vec<IntakeEvent>,
    ) -> Result<Resolution, IntakeError> {
        if !entry.resolved {
            entry.reason_code = ReasonCode::NoMatchingJobRow;
        }
        entry.updated_at = now;
        self.reviews.persist_review_entry(&entry)?;

        info!(review_id = %entry.review_id, record_key = %key, "No job row for manual number");
        events.push(IntakeEvent::ReviewStillUnmatched {
            review_id: entry.review_id.clone(),
            record_key: key.clone(),
        });

        Ok(Resolution {
            outcome: ResolutionOutcome::ResolvedNoMatch,
            review_id: entry.review_id,
            record_key: key,
            events,
        })
    }

    /// Open, refresh, or conflict-mark the review entry for this document
    fn park(
        &self,
        candidate: Option<&str>,
        confidence_raw: f64,
        band: ConfidenceBand,
        reason: ReasonCode,
        context: &DecisionContext,
        mut events: Vec<IntakeEvent>,
    ) -> Result<Decision, IntakeError> {
        let fm_key = normalize_issuer(&context.issuer);
        let review_id = review_id_for(&fm_key, &context.document_fingerprint);
        let now = context.received_at;

        match self.reviews.load_review_entry(&review_id)? {
            Some(mut entry) if entry.resolved => {
                entry.conflict_count += 1;
                entry.updated_at = now;
                self.reviews.persist_review_entry(&entry)?;
                warn!(
                    review_id = %review_id,
                    conflict_count = entry.conflict_count,
                    "Repeat extraction for a resolved review"
                );
                events.push(IntakeEvent::ReviewConflict {
                    review_id: review_id.clone(),
                    conflict_count: entry.conflict_count,
                });
            }
            Some(mut entry) => {
                entry.candidate_number = candidate.map(str::to_string);
                entry.confidence_raw = Some(confidence_raw);
                entry.reason_code = reason;
                if context.signed_pdf_ref.is_some() {
                    entry.signed_pdf_ref = context.signed_pdf_ref.clone();
                }
                entry.updated_at = now;
                self.reviews.persist_review_entry(&entry)?;
                debug!(review_id = %review_id, reason = %reason, "Review refreshed");
                events.push(IntakeEvent::ReviewUpdated {
                    review_id: review_id.clone(),
                    reason,
                });
            }
            None => {
                let mut entry =
                    ReviewEntry::open(&fm_key, &context.document_fingerprint, reason, now);
                entry.candidate_number = candidate.map(str::to_string);
                entry.confidence_raw = Some(confidence_raw);
                entry.signed_pdf_ref = context.signed_pdf_ref.clone();
                self.reviews.persist_review_entry(&entry)?;
                info!(
                    review_id = %review_id,
                    reason = %reason,
                    confidence = confidence_raw,
                    "Review opened"
                );
                events.push(IntakeEvent::ReviewOpened {
                    review_id: review_id.clone(),
                    reason,
                });
            }
        }

        Ok(Decision {
            outcome: DecisionOutcome::PendingReview,
            band,
            record_key: candidate.map(|number| record_key(&context.issuer, number)),
            review_id: Some(review_id),
            reason: Some(reason),
            events,
        })
    }
}
