//! Signed work-order intake
//!
//! Decides what happens to a signed document once its work-order number has
//! been read: merge it into the job ledger, or park it for a human. Also owns
//! the record-key scheme every ledger write goes through, the review lifecycle
//! (resolve, override) and a pipeline that wires host-supplied rendering and
//! extraction to the geometry in `region-core`.
//!
//! No I/O happens here. Ledger, review storage, rendering and extraction are
//! traits the host implements; in-memory versions are provided for tests and
//! small deployments.

pub mod config;
pub mod confidence;
pub mod engine;
pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod pipeline;
pub mod ports;
pub mod review;

pub use config::IntakeConfig;
pub use confidence::{classify_confidence, BandThreshold, ConfidenceBand, DEFAULT_BANDS};
pub use engine::{
    Decision, DecisionContext, DecisionEngine, DecisionOutcome, Resolution, ResolutionOutcome,
};
pub use error::IntakeError;
pub use events::IntakeEvent;
pub use identity::{normalize_issuer, normalize_work_order, record_key};
pub use ledger::{record_work_order, JobStatus, Ledger, LedgerFields, LedgerRow, MemoryLedger};
pub use pipeline::{
    CropSource, DocumentRequest, PipelineReport, RegionSource, SignedDocumentPipeline,
};
pub use ports::{CandidateExtractor, Extraction, MemoryTemplateStore, PageRenderer, TemplateStore};
pub use review::{review_id_for, MemoryReviewStore, ReasonCode, ReviewEntry, ReviewStore};
