//! Configuration parsing for the intake engine
//!
//! TOML-based configuration for confidence bands, page-size tolerance,
//! per-issuer template rules and the merge policy.

use std::fs;
use std::path::Path;

use anyhow::Context;
use region_core::{TemplateRule, DEFAULT_TOLERANCE_PT};
use serde::{Deserialize, Serialize};

use crate::confidence::{validate_bands, BandThreshold, DEFAULT_BANDS};
use crate::error::IntakeError;
use crate::identity::normalize_issuer;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Confidence band table
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    /// Standard page-size matching
    #[serde(default)]
    pub pages: PagesConfig,
    /// Per-issuer guards applied when a template is captured
    #[serde(default)]
    pub template_rules: Vec<TemplateRule>,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl IntakeConfig {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - The band table or tolerance is out of range
    ///
    /// # Example
    ///
    /// ```no_run
    /// use intake_core::config::IntakeConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = IntakeConfig::from_file("intake.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use intake_core::config::IntakeConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [pages]
    ///     tolerance_pt = 4.0
    ///
    ///     [[template_rules]]
    ///     issuer = "superclean.com"
    ///     x_min_pt = 300.0
    ///     x_max_pt = 612.0
    /// "#;
    /// let config = IntakeConfig::from_str(toml)?;
    /// assert_eq!(config.template_rules[0].issuer, "superclean_com");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.normalize_rules();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IntakeError> {
        validate_bands(&self.confidence.bands)?;
        let tolerance = self.pages.tolerance_pt;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(IntakeError::Config(format!(
                "tolerance_pt must be positive, got {}",
                tolerance
            )));
        }
        for rule in &self.template_rules {
            let ranges = [
                (rule.x_min_pt, rule.x_max_pt, "x"),
                (rule.y_min_pt, rule.y_max_pt, "y"),
            ];
            for (min, max, axis) in ranges {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(IntakeError::Config(format!(
                            "template rule for {}: {} range {}..{} is empty",
                            rule.issuer, axis, min, max
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Rule issuers go through the same normalization as record keys, so
    /// `Superclean.com` in a config file matches issuer key `superclean_com`.
    fn normalize_rules(&mut self) {
        for rule in &mut self.template_rules {
            rule.issuer = normalize_issuer(&rule.issuer);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Checked in order, highest threshold first
    #[serde(default = "default_bands")]
    pub bands: Vec<BandThreshold>,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

fn default_bands() -> Vec<BandThreshold> {
    DEFAULT_BANDS.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Inclusive per-side tolerance against the catalogue (default: 5.0)
    #[serde(default = "default_tolerance_pt")]
    pub tolerance_pt: f64,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            tolerance_pt: default_tolerance_pt(),
        }
    }
}

fn default_tolerance_pt() -> f64 {
    DEFAULT_TOLERANCE_PT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Only auto-merge into a job row that already exists (default: true)
    #[serde(default = "default_true")]
    pub require_existing_job: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            require_existing_job: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extract over the whole page when a non-standard page has no usable crop
    #[serde(default = "default_true")]
    pub fallback_to_full_page: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_to_full_page: true,
        }
    }
}

fn default_true() -> bool {
    true
}
