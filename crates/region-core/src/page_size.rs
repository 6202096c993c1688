//! Standard page size catalogue and classification
//!
//! Template capture only makes sense when the page a crop was measured against
//! is the same physical page the template was authored on. Phone photos and
//! other odd-sized scans are rejected here, before any geometry work.

use serde::Serialize;
use shared_types::PagePoints;

use crate::error::RegionError;

/// Default matching tolerance in points
pub const DEFAULT_TOLERANCE_PT: f64 = 5.0;

/// Pages whose sides differ by less than this are treated as square
const SQUARE_EPSILON_PT: f64 = 1.0;

/// Catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardPageSize {
    pub name: &'static str,
    pub width_pt: f64,
    pub height_pt: f64,
    pub tolerance_pt: f64,
}

impl StandardPageSize {
    const fn portrait(name: &'static str, width_pt: f64, height_pt: f64) -> Self {
        Self {
            name,
            width_pt,
            height_pt,
            tolerance_pt: DEFAULT_TOLERANCE_PT,
        }
    }

    /// Same entry with width and height swapped
    const fn landscape(self, name: &'static str) -> Self {
        Self {
            name,
            width_pt: self.height_pt,
            height_pt: self.width_pt,
            tolerance_pt: self.tolerance_pt,
        }
    }

    /// Inclusive match: a distance exactly equal to the tolerance still matches
    pub fn matches(&self, width_pt: f64, height_pt: f64, tolerance_pt: f64) -> bool {
        (width_pt - self.width_pt).abs() <= tolerance_pt
            && (height_pt - self.height_pt).abs() <= tolerance_pt
    }
}

const LETTER: StandardPageSize = StandardPageSize::portrait("Letter", 612.0, 792.0);
const A4: StandardPageSize = StandardPageSize::portrait("A4", 595.28, 841.89);
const LEGAL: StandardPageSize = StandardPageSize::portrait("Legal", 612.0, 1008.0);
const TABLOID: StandardPageSize = StandardPageSize::portrait("Tabloid", 792.0, 1224.0);
const A3: StandardPageSize = StandardPageSize::portrait("A3", 841.89, 1190.55);
const A5: StandardPageSize = StandardPageSize::portrait("A5", 419.53, 595.28);
const EXECUTIVE: StandardPageSize = StandardPageSize::portrait("Executive", 522.0, 756.0);

/// All recognized sizes in match order: portrait entries first, then landscape.
pub const STANDARD_PAGE_SIZES: [StandardPageSize; 14] = [
    LETTER,
    A4,
    LEGAL,
    TABLOID,
    A3,
    A5,
    EXECUTIVE,
    LETTER.landscape("Letter Landscape"),
    A4.landscape("A4 Landscape"),
    LEGAL.landscape("Legal Landscape"),
    TABLOID.landscape("Tabloid Landscape"),
    A3.landscape("A3 Landscape"),
    A5.landscape("A5 Landscape"),
    EXECUTIVE.landscape("Executive Landscape"),
];

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageOrientation {
    fn of(width_pt: f64, height_pt: f64) -> Self {
        if (width_pt - height_pt).abs() < SQUARE_EPSILON_PT {
            PageOrientation::Square
        } else if width_pt > height_pt {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    }
}

/// Result of [`classify_page_size`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageClassification {
    pub is_standard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_size: Option<&'static str>,
    /// `None` when the dimensions are not a usable page at all
    pub orientation: Option<PageOrientation>,
}

/// Classify a page against the catalogue using each entry's own tolerance
pub fn classify_page_size(width_pt: f64, height_pt: f64) -> PageClassification {
    classify(width_pt, height_pt, None)
}

/// Classify with a caller-supplied tolerance applied to every entry
pub fn classify_page_size_with(
    width_pt: f64,
    height_pt: f64,
    tolerance_pt: f64,
) -> PageClassification {
    classify(width_pt, height_pt, Some(tolerance_pt))
}

fn classify(width_pt: f64, height_pt: f64, tolerance_pt: Option<f64>) -> PageClassification {
    if !PagePoints::new(width_pt, height_pt).is_valid() {
        return PageClassification {
            is_standard: false,
            matched_size: None,
            orientation: None,
        };
    }

    let matched = STANDARD_PAGE_SIZES.iter().find(|entry| {
        entry.matches(
            width_pt,
            height_pt,
            tolerance_pt.unwrap_or(entry.tolerance_pt),
        )
    });

    PageClassification {
        is_standard: matched.is_some(),
        matched_size: matched.map(|entry| entry.name),
        orientation: Some(PageOrientation::of(width_pt, height_pt)),
    }
}

/// Look up the catalogue entry for a page or fail with `NonStandardPage`
pub fn require_standard_page(
    page: PagePoints,
    tolerance_pt: f64,
) -> Result<&'static StandardPageSize, RegionError> {
    if !page.is_valid() {
        return Err(RegionError::NonStandardPage {
            width_pt: page.width_pt,
            height_pt: page.height_pt,
        });
    }
    STANDARD_PAGE_SIZES
        .iter()
        .find(|entry| entry.matches(page.width_pt, page.height_pt, tolerance_pt))
        .ok_or(RegionError::NonStandardPage {
            width_pt: page.width_pt,
            height_pt: page.height_pt,
        })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn catalogue_index() -> impl Strategy<Value = usize> {
        0..STANDARD_PAGE_SIZES.len()
    }

    proptest! {
        /// Property: any point inside an entry's tolerance box classifies as that entry
        #[test]
        fn within_tolerance_matches_entry(
            idx in catalogue_index(),
            dw in -4.99f64..=4.99,
            dh in -4.99f64..=4.99,
        ) {
            let entry = STANDARD_PAGE_SIZES[idx];
            let result = classify_page_size(entry.width_pt + dw, entry.height_pt + dh);
            prop_assert_eq!(result.matched_size, Some(entry.name));
        }

        /// Property: one axis beyond tolerance never matches that entry
        #[test]
        fn beyond_tolerance_does_not_match_entry(
            idx in catalogue_index(),
            excess in 5.01f64..40.0,
            negative in any::<bool>(),
        ) {
            let entry = STANDARD_PAGE_SIZES[idx];
            let dw = if negative { -excess } else { excess };
            let result = classify_page_size(entry.width_pt + dw, entry.height_pt);
            prop_assert_ne!(result.matched_size, Some(entry.name));
        }

        /// Property: non-positive dimensions never match
        #[test]
        fn non_positive_never_matches(w in -2000.0f64..=0.0, h in -2000.0f64..2000.0) {
            prop_assert!(!classify_page_size(w, h).is_standard);
            prop_assert!(!classify_page_size(h, w).is_standard);
        }
    }
}
