use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    /// Geometry or containment violation. Never silently corrected.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Caller bug: non-finite numbers, zero dimensions, negative crop sizes
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Non-standard page size: {width_pt}x{height_pt}pt")]
    NonStandardPage { width_pt: f64, height_pt: f64 },

    #[error("Template was authored on {expected} but page is {actual}")]
    PageSizeMismatch { expected: String, actual: String },

    #[error("Unsupported coordinate system: {0}")]
    UnsupportedCoordinateSystem(String),

    #[error("Template rule violated for {issuer}: {reason}")]
    TemplateRuleViolation { issuer: String, reason: String },
}

impl RegionError {
    /// True when the error indicates a programming error in the caller rather
    /// than a bad crop or page.
    pub fn is_caller_bug(&self) -> bool {
        matches!(self, RegionError::MalformedInput(_))
    }
}
