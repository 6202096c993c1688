//! Work-order ledger model and the record-store seam
//!
//! Rows are addressed only by record key. Writes are upserts that merge per
//! field: a later write that leaves a field `None` never erases what an
//! earlier write stored.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceBand;
use crate::error::IntakeError;
use crate::identity::{normalize_issuer, normalize_work_order, record_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Open,
    Signed,
}

/// Per-field values written to a ledger row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_pdf_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_band: Option<ConfidenceBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_raw: Option<f64>,
    /// Set on MEDIUM-band merges for downstream audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manually_overridden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

fn overwrite<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

impl LedgerFields {
    /// Last-write-wins per field
    pub fn merge_from(&mut self, incoming: LedgerFields) {
        overwrite(&mut self.work_order_number, incoming.work_order_number);
        overwrite(&mut self.issuer, incoming.issuer);
        overwrite(&mut self.status, incoming.status);
        overwrite(&mut self.signed_at, incoming.signed_at);
        overwrite(&mut self.signed_pdf_ref, incoming.signed_pdf_ref);
        overwrite(&mut self.confidence_band, incoming.confidence_band);
        overwrite(&mut self.confidence_raw, incoming.confidence_raw);
        overwrite(&mut self.low_confidence, incoming.low_confidence);
        overwrite(&mut self.manually_overridden, incoming.manually_overridden);
        overwrite(&mut self.review_id, incoming.review_id);
        self.extra.extend(incoming.extra);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub record_key: String,
    pub fields: LedgerFields,
}

impl LedgerRow {
    /// Rows without an explicit status are open jobs
    pub fn status(&self) -> JobStatus {
        self.fields.status.unwrap_or(JobStatus::Open)
    }
}

/// Record-store adapter supplied by the host.
///
/// `upsert_row` must be insert-or-update by key. Stores that can only do
/// read-modify-write must merge per field and tolerate a row appearing between
/// their read and their write.
pub trait Ledger: Send + Sync {
    fn upsert_row(&self, record_key: &str, fields: LedgerFields) -> Result<(), IntakeError>;

    fn get_row(&self, record_key: &str) -> Result<Option<LedgerRow>, IntakeError>;

    fn find_row_by_wo_number(&self, wo_number: &str) -> Result<Option<LedgerRow>, IntakeError>;
}

impl<T: Ledger + ?Sized> Ledger for &T {
    fn upsert_row(&self, record_key: &str, fields: LedgerFields) -> Result<(), IntakeError> {
        (**self).upsert_row(record_key, fields)
    }

    fn get_row(&self, record_key: &str) -> Result<Option<LedgerRow>, IntakeError> {
        (**self).get_row(record_key)
    }

    fn find_row_by_wo_number(&self, wo_number: &str) -> Result<Option<LedgerRow>, IntakeError> {
        (**self).find_row_by_wo_number(wo_number)
    }
}

impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn upsert_row(&self, record_key: &str, fields: LedgerFields) -> Result<(), IntakeError> {
        (**self).upsert_row(record_key, fields)
    }

    fn get_row(&self, record_key: &str) -> Result<Option<LedgerRow>, IntakeError> {
        (**self).get_row(record_key)
    }

    fn find_row_by_wo_number(&self, wo_number: &str) -> Result<Option<LedgerRow>, IntakeError> {
        (**self).find_row_by_wo_number(wo_number)
    }
}

/// In-process ledger; each upsert is atomic under one lock
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<BTreeMap<String, LedgerRow>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, LedgerRow>>, IntakeError> {
        self.rows
            .lock()
            .map_err(|_| IntakeError::Ledger("ledger lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every row, ordered by record key
    pub fn rows(&self) -> Vec<LedgerRow> {
        self.lock()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Ledger for MemoryLedger {
    fn upsert_row(&self, record_key: &str, fields: LedgerFields) -> Result<(), IntakeError> {
        let mut rows = self.lock()?;
        rows.entry(record_key.to_string())
            .or_insert_with(|| LedgerRow {
                record_key: record_key.to_string(),
                fields: LedgerFields::default(),
            })
            .fields
            .merge_from(fields);
        Ok(())
    }

    fn get_row(&self, record_key: &str) -> Result<Option<LedgerRow>, IntakeError> {
        Ok(self.lock()?.get(record_key).cloned())
    }

    fn find_row_by_wo_number(&self, wo_number: &str) -> Result<Option<LedgerRow>, IntakeError> {
        let wanted = normalize_work_order(wo_number);
        Ok(self
            .lock()?
            .values()
            .find(|row| {
                row.fields
                    .work_order_number
                    .as_deref()
                    .map(normalize_work_order)
                    .as_deref()
                    == Some(wanted.as_str())
            })
            .cloned())
    }
}

/// Initial-extraction write path: create or refresh the job row for a work order.
///
/// Status is left untouched so re-running extraction never reopens a signed job.
pub fn record_work_order(
    ledger: &dyn Ledger,
    issuer: &str,
    wo_number: &str,
    mut fields: LedgerFields,
) -> Result<String, IntakeError> {
    let key = record_key(issuer, wo_number);
    fields.work_order_number = Some(wo_number.trim().to_string());
    fields.issuer = Some(normalize_issuer(issuer));
    ledger.upsert_row(&key, fields)?;
    Ok(key)
}
