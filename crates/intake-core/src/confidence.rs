//! Confidence bands for extracted work-order numbers

use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Bands that merge without a human in the loop
    pub fn auto_merges(&self) -> bool {
        matches!(self, ConfidenceBand::High | ConfidenceBand::Medium)
    }

    /// Merges in this band are flagged on the ledger row for later audit
    pub fn is_flagged(&self) -> bool {
        matches!(self, ConfidenceBand::Medium)
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceBand::High => write!(f, "HIGH"),
            ConfidenceBand::Medium => write!(f, "MEDIUM"),
            ConfidenceBand::Low => write!(f, "LOW"),
        }
    }
}

/// Scores at or above `threshold` fall into `band`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThreshold {
    pub threshold: f64,
    pub band: ConfidenceBand,
}

/// Checked in order; anything below every entry is LOW.
///
/// With this table 0.899 is MEDIUM and merges flagged. To send every score
/// below 0.90 to review, configure a single `HIGH >= 0.90` entry (or raise the
/// MEDIUM threshold to 0.90 or above). Thresholds are monotone, so no table
/// reviews 0.899 while still merging 0.60.
pub const DEFAULT_BANDS: [BandThreshold; 2] = [
    BandThreshold {
        threshold: 0.90,
        band: ConfidenceBand::High,
    },
    BandThreshold {
        threshold: 0.60,
        band: ConfidenceBand::Medium,
    },
];

/// Classify a raw score in `[0, 1]`.
///
/// Non-finite or out-of-range scores are a caller bug, not a LOW band.
pub fn classify_confidence(
    confidence_raw: f64,
    bands: &[BandThreshold],
) -> Result<ConfidenceBand, IntakeError> {
    if !confidence_raw.is_finite() || !(0.0..=1.0).contains(&confidence_raw) {
        return Err(IntakeError::MalformedConfidence(confidence_raw));
    }
    Ok(bands
        .iter()
        .find(|entry| confidence_raw >= entry.threshold)
        .map(|entry| entry.band)
        .unwrap_or(ConfidenceBand::Low))
}

/// Band table sanity: thresholds in `[0, 1]` and strictly descending
pub fn validate_bands(bands: &[BandThreshold]) -> Result<(), IntakeError> {
    for entry in bands {
        if !entry.threshold.is_finite() || !(0.0..=1.0).contains(&entry.threshold) {
            return Err(IntakeError::Config(format!(
                "Band threshold {} is outside [0, 1]",
                entry.threshold
            )));
        }
    }
    if bands.windows(2).any(|pair| pair[0].threshold <= pair[1].threshold) {
        return Err(IntakeError::Config(
            "Band thresholds must be strictly descending".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        let cases = [
            (1.0, ConfidenceBand::High),
            (0.90, ConfidenceBand::High),
            (0.899, ConfidenceBand::Medium),
            (0.60, ConfidenceBand::Medium),
            (0.59, ConfidenceBand::Low),
            (0.0, ConfidenceBand::Low),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                classify_confidence(raw, &DEFAULT_BANDS).unwrap(),
                expected,
                "score {}",
                raw
            );
        }
    }

    #[test]
    fn test_table_boundaries_enumerated() {
        // Every threshold in the table is inclusive and the value just below falls through
        for (i, entry) in DEFAULT_BANDS.iter().enumerate() {
            assert_eq!(
                classify_confidence(entry.threshold, &DEFAULT_BANDS).unwrap(),
                entry.band
            );
            let below = classify_confidence(entry.threshold - 1e-9, &DEFAULT_BANDS).unwrap();
            let expected = DEFAULT_BANDS
                .get(i + 1)
                .map(|next| next.band)
                .unwrap_or(ConfidenceBand::Low);
            assert_eq!(below, expected);
        }
    }

    #[test]
    fn test_high_only_table_sends_sub_high_scores_low() {
        let high_only = [BandThreshold {
            threshold: 0.90,
            band: ConfidenceBand::High,
        }];
        assert!(validate_bands(&high_only).is_ok());
        assert_eq!(classify_confidence(0.90, &high_only).unwrap(), ConfidenceBand::High);
        for raw in [0.899, 0.60, 0.0] {
            assert_eq!(
                classify_confidence(raw, &high_only).unwrap(),
                ConfidenceBand::Low,
                "score {}",
                raw
            );
        }
    }

    #[test]
    fn test_malformed_scores() {
        for raw in [f64::NAN, f64::INFINITY, -0.01, 1.01, 90.0] {
            assert!(matches!(
                classify_confidence(raw, &DEFAULT_BANDS),
                Err(IntakeError::MalformedConfidence(_))
            ));
        }
    }

    #[test]
    fn test_band_flags() {
        assert!(ConfidenceBand::High.auto_merges());
        assert!(!ConfidenceBand::High.is_flagged());
        assert!(ConfidenceBand::Medium.auto_merges());
        assert!(ConfidenceBand::Medium.is_flagged());
        assert!(!ConfidenceBand::Low.auto_merges());
    }

    #[test]
    fn test_validate_bands() {
        assert!(validate_bands(&DEFAULT_BANDS).is_ok());
        assert!(validate_bands(&[]).is_ok());

        let ascending = [
            BandThreshold {
                threshold: 0.5,
                band: ConfidenceBand::Medium,
            },
            BandThreshold {
                threshold: 0.9,
                band: ConfidenceBand::High,
            },
        ];
        assert!(validate_bands(&ascending).is_err());

        let out_of_range = [BandThreshold {
            threshold: 1.5,
            band: ConfidenceBand::High,
        }];
        assert!(validate_bands(&out_of_range).is_err());
    }
}
