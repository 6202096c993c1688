//! Reusable per-issuer capture templates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::PageGeometry;
use tracing::debug;

use crate::error::RegionError;
use crate::page_size::require_standard_page;
use crate::region::Region;

/// Extra geometric guard for one issuer's templates.
///
/// Some issuers always print the work-order number in a known band of the
/// page; a template for them that lands elsewhere is almost certainly a
/// mis-drawn crop. Bounds are inclusive and apply to the whole box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRule {
    /// Normalized issuer key the rule applies to
    pub issuer: String,
    #[serde(default)]
    pub x_min_pt: Option<f64>,
    #[serde(default)]
    pub x_max_pt: Option<f64>,
    #[serde(default)]
    pub y_min_pt: Option<f64>,
    #[serde(default)]
    pub y_max_pt: Option<f64>,
}

impl TemplateRule {
    pub fn for_issuer(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            x_min_pt: None,
            x_max_pt: None,
            y_min_pt: None,
            y_max_pt: None,
        }
    }

    pub fn with_x_range(mut self, min_pt: f64, max_pt: f64) -> Self {
        self.x_min_pt = Some(min_pt);
        self.x_max_pt = Some(max_pt);
        self
    }

    pub fn with_y_range(mut self, min_pt: f64, max_pt: f64) -> Self {
        self.y_min_pt = Some(min_pt);
        self.y_max_pt = Some(max_pt);
        self
    }

    pub fn check(&self, region: &Region) -> Result<(), RegionError> {
        let violation = |reason: String| RegionError::TemplateRuleViolation {
            issuer: self.issuer.clone(),
            reason,
        };

        let left = region.x_pt();
        let right = region.x_pt() + region.w_pt();
        let top = region.y_pt();
        let bottom = region.y_pt() + region.h_pt();

        if let Some(min) = self.x_min_pt {
            if left < min {
                return Err(violation(format!("x {:.1}pt is left of {:.1}pt", left, min)));
            }
        }
        if let Some(max) = self.x_max_pt {
            if right > max {
                return Err(violation(format!(
                    "right edge {:.1}pt is past {:.1}pt",
                    right, max
                )));
            }
        }
        if let Some(min) = self.y_min_pt {
            if top < min {
                return Err(violation(format!("y {:.1}pt is above {:.1}pt", top, min)));
            }
        }
        if let Some(max) = self.y_max_pt {
            if bottom > max {
                return Err(violation(format!(
                    "bottom edge {:.1}pt is below {:.1}pt",
                    bottom, max
                )));
            }
        }
        Ok(())
    }
}

/// Stored crop for an issuer, reused on every document from that issuer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub issuer_key: String,
    pub region: Region,
    /// Catalogue name of the page the template was authored on
    pub page_size: String,
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// Build a template from a freshly converted region.
    ///
    /// Fails with `NonStandardPage` when the region's page is not in the
    /// catalogue and with `TemplateRuleViolation` when a rule for this issuer
    /// rejects the box.
    pub fn capture(
        issuer_key: &str,
        region: Region,
        rules: &[TemplateRule],
        tolerance_pt: f64,
    ) -> Result<Self, RegionError> {
        let size = require_standard_page(region.page(), tolerance_pt)?;

        for rule in rules.iter().filter(|rule| rule.issuer == issuer_key) {
            rule.check(&region)?;
        }

        debug!(
            issuer = issuer_key,
            page_size = size.name,
            x_pt = region.x_pt(),
            y_pt = region.y_pt(),
            "Template captured"
        );

        Ok(Self {
            issuer_key: issuer_key.to_string(),
            region,
            page_size: size.name.to_string(),
            created_at: Utc::now(),
        })
    }

    /// The template's region re-anchored to a document page.
    ///
    /// The page has to be the same standard size the template was authored on;
    /// proportional math does not carry over between physical sizes.
    pub fn region_for_page(
        &self,
        page: PageGeometry,
        tolerance_pt: f64,
    ) -> Result<Region, RegionError> {
        let size = require_standard_page(page.points(), tolerance_pt)?;
        if size.name != self.page_size {
            return Err(RegionError::PageSizeMismatch {
                expected: self.page_size.clone(),
                actual: size.name.to_string(),
            });
        }
        self.region.on_page(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_size::DEFAULT_TOLERANCE_PT;
    use crate::region::{make_region, RawRegion};
    use shared_types::PagePoints;

    fn region_on(page: PagePoints, x: f64, y: f64, w: f64, h: f64) -> Region {
        make_region(RawRegion::new(x, y, w, h, page)).unwrap()
    }

    #[test]
    fn test_capture_on_letter() {
        let region = region_on(PagePoints::letter(), 400.0, 40.0, 150.0, 30.0);
        let template = Template::capture("acme_com", region, &[], DEFAULT_TOLERANCE_PT).unwrap();
        assert_eq!(template.page_size, "Letter");
        assert_eq!(template.issuer_key, "acme_com");
    }

    #[test]
    fn test_capture_rejects_non_standard_page() {
        let photo = PagePoints::new(756.0, 1008.0 + 40.0);
        let region = region_on(photo, 10.0, 10.0, 100.0, 20.0);
        let err = Template::capture("acme_com", region, &[], DEFAULT_TOLERANCE_PT).unwrap_err();
        assert!(matches!(err, RegionError::NonStandardPage { .. }));
    }

    #[test]
    fn test_rule_only_applies_to_its_issuer() {
        let rules = vec![TemplateRule::for_issuer("superclean").with_x_range(300.0, 612.0)];
        let left_side = region_on(PagePoints::letter(), 20.0, 40.0, 150.0, 30.0);

        let err = Template::capture("superclean", left_side, &rules, DEFAULT_TOLERANCE_PT)
            .unwrap_err();
        assert!(matches!(err, RegionError::TemplateRuleViolation { .. }));

        assert!(Template::capture("acme_com", left_side, &rules, DEFAULT_TOLERANCE_PT).is_ok());
    }

    #[test]
    fn test_rule_checks_whole_box() {
        let rule = TemplateRule::for_issuer("superclean")
            .with_x_range(300.0, 500.0)
            .with_y_range(0.0, 200.0);
        let inside = region_on(PagePoints::letter(), 320.0, 20.0, 100.0, 30.0);
        assert!(rule.check(&inside).is_ok());

        let spills_right = region_on(PagePoints::letter(), 450.0, 20.0, 100.0, 30.0);
        assert!(rule.check(&spills_right).is_err());

        let too_low = region_on(PagePoints::letter(), 320.0, 190.0, 100.0, 30.0);
        assert!(rule.check(&too_low).is_err());
    }

    #[test]
    fn test_region_for_page_requires_same_size() {
        let region = region_on(PagePoints::letter(), 400.0, 40.0, 150.0, 30.0);
        let template = Template::capture("acme_com", region, &[], DEFAULT_TOLERANCE_PT).unwrap();

        let slightly_off = PageGeometry::new(614.0, 790.0);
        let reused = template
            .region_for_page(slightly_off, DEFAULT_TOLERANCE_PT)
            .unwrap();
        assert_eq!(reused.x_pt(), 400.0);
        assert_eq!(reused.page(), PagePoints::new(614.0, 790.0));

        let err = template
            .region_for_page(PageGeometry::new(595.28, 841.89), DEFAULT_TOLERANCE_PT)
            .unwrap_err();
        assert_eq!(
            err,
            RegionError::PageSizeMismatch {
                expected: "Letter".to_string(),
                actual: "A4".to_string(),
            }
        );
    }

    #[test]
    fn test_template_serde_round_trip() {
        let region = region_on(PagePoints::letter(), 400.0, 40.0, 150.0, 30.0);
        let template = Template::capture("acme_com", region, &[], DEFAULT_TOLERANCE_PT).unwrap();
        let json = serde_json::to_string(&template).unwrap();
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
    }
}
