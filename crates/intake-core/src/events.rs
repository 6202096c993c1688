//! Structured events returned from engine calls
//!
//! The engine logs through `tracing`, but every call also hands its events
//! back to the caller so a host can persist or forward them as it sees fit.

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceBand;
use crate::review::ReasonCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IntakeEvent {
    /// Ledger row written as signed
    Merged {
        record_key: String,
        band: ConfidenceBand,
        low_confidence: bool,
    },
    ReviewOpened {
        review_id: String,
        reason: ReasonCode,
    },
    /// An unresolved entry was refreshed by a repeat extraction
    ReviewUpdated {
        review_id: String,
        reason: ReasonCode,
    },
    /// A repeat extraction hit an entry that is already resolved
    ReviewConflict {
        review_id: String,
        conflict_count: u32,
    },
    ReviewResolved {
        review_id: String,
        record_key: String,
    },
    /// Human supplied a number but no job row exists for it yet
    ReviewStillUnmatched {
        review_id: String,
        record_key: String,
    },
    ManualOverride {
        review_id: String,
        record_key: String,
    },
    AlreadyResolved {
        review_id: String,
    },
    /// The work-order number exists, but under a different issuer
    IssuerMismatch {
        expected_key: String,
        found_key: String,
    },
    /// Non-standard page extracted over the whole page
    NonStandardFallback {
        width_pt: f64,
        height_pt: f64,
    },
}
