use region_core::RegionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Confidence must be a finite value in [0, 1], got {0}")]
    MalformedConfidence(f64),

    #[error("Manual work order number must not be empty")]
    EmptyManualNumber,

    #[error("Review entry not found: {0}")]
    ReviewNotFound(String),

    #[error("No template stored for issuer: {0}")]
    TemplateNotFound(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Review store error: {0}")]
    ReviewStore(String),

    #[error("Template store error: {0}")]
    TemplateStore(String),

    #[error("Page render failed: {0}")]
    Render(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Region(#[from] RegionError),
}
