//! Canonical crop rectangle in PDF point space
//!
//! A [`Region`] is always top-left origin, always in points, and always lies
//! inside its page. The only way to obtain one is through [`make_region`]
//! (directly or via deserialization), so every holder of a `Region` can rely on
//! those invariants. Regions are values: a correction produces a new `Region`.

use serde::{Deserialize, Serialize};
use shared_types::{BoundsOffset, PageGeometry, PagePoints};

use crate::error::RegionError;

/// Containment slack for rounding at the page edge
pub const CONTAINMENT_TOLERANCE_PT: f64 = 1.0;

/// Coordinate system tag carried on the wire.
///
/// Only one system is accepted. Legacy string tags are migrated at the
/// deserialization boundary by [`CoordinateSystem::migrate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateSystem {
    #[default]
    #[serde(rename = "PDF_POINTS_TOP_LEFT")]
    PdfPointsTopLeft,
}

impl CoordinateSystem {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CoordinateSystem::PdfPointsTopLeft => "PDF_POINTS_TOP_LEFT",
        }
    }

    /// Map a stored tag, including legacy aliases, onto the closed set.
    ///
    /// Percentage tags are rejected outright: percentages drift across
    /// re-renders at different resolutions and hide the bounds-offset problem.
    pub fn migrate(tag: &str) -> Result<Self, RegionError> {
        let normalized = tag.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pdf_points_top_left" | "pdf_points" | "points" | "pt" | "pdf_pt" => {
                Ok(CoordinateSystem::PdfPointsTopLeft)
            }
            _ => Err(RegionError::UnsupportedCoordinateSystem(tag.to_string())),
        }
    }
}

/// Untrusted region shape as it arrives from a caller or from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawRegion {
    pub x_pt: f64,
    pub y_pt: f64,
    pub w_pt: f64,
    pub h_pt: f64,
    pub page_width_pt: f64,
    pub page_height_pt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_offset: Option<BoundsOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_system: Option<String>,
}

impl RawRegion {
    pub fn new(x_pt: f64, y_pt: f64, w_pt: f64, h_pt: f64, page: PagePoints) -> Self {
        Self {
            x_pt,
            y_pt,
            w_pt,
            h_pt,
            page_width_pt: page.width_pt,
            page_height_pt: page.height_pt,
            bounds_offset: None,
            coordinate_system: None,
        }
    }

    pub fn with_bounds_offset(mut self, offset: Option<BoundsOffset>) -> Self {
        self.bounds_offset = offset;
        self
    }
}

/// Validated rectangle in PDF point space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegion", into = "RawRegion")]
pub struct Region {
    x_pt: f64,
    y_pt: f64,
    w_pt: f64,
    h_pt: f64,
    page_width_pt: f64,
    page_height_pt: f64,
    bounds_offset: Option<BoundsOffset>,
}

/// Validate a raw region.
///
/// Checks run in order: coordinate-system tag, finiteness, positivity,
/// containment (with [`CONTAINMENT_TOLERANCE_PT`]), then bounds offset.
pub fn make_region(raw: RawRegion) -> Result<Region, RegionError> {
    if let Some(tag) = raw.coordinate_system.as_deref() {
        CoordinateSystem::migrate(tag)?;
    }

    let fields = [
        ("xPt", raw.x_pt),
        ("yPt", raw.y_pt),
        ("wPt", raw.w_pt),
        ("hPt", raw.h_pt),
        ("pageWidthPt", raw.page_width_pt),
        ("pageHeightPt", raw.page_height_pt),
    ];
    if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(RegionError::InvalidRegion(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }

    if raw.w_pt <= 0.0 || raw.h_pt <= 0.0 {
        return Err(RegionError::InvalidRegion(format!(
            "Region dimensions must be positive, got {}x{}",
            raw.w_pt, raw.h_pt
        )));
    }
    if raw.page_width_pt <= 0.0 || raw.page_height_pt <= 0.0 {
        return Err(RegionError::InvalidRegion(format!(
            "Page dimensions must be positive, got {}x{}",
            raw.page_width_pt, raw.page_height_pt
        )));
    }

    if raw.x_pt < 0.0 {
        return Err(RegionError::InvalidRegion(format!(
            "Region X must be non-negative, got {}",
            raw.x_pt
        )));
    }
    if raw.y_pt < 0.0 {
        return Err(RegionError::InvalidRegion(format!(
            "Region Y must be non-negative, got {}",
            raw.y_pt
        )));
    }
    if raw.x_pt + raw.w_pt > raw.page_width_pt + CONTAINMENT_TOLERANCE_PT {
        return Err(RegionError::InvalidRegion(format!(
            "Region extends beyond page right edge: {} > {}",
            raw.x_pt + raw.w_pt,
            raw.page_width_pt
        )));
    }
    if raw.y_pt + raw.h_pt > raw.page_height_pt + CONTAINMENT_TOLERANCE_PT {
        return Err(RegionError::InvalidRegion(format!(
            "Region extends beyond page bottom edge: {} > {}",
            raw.y_pt + raw.h_pt,
            raw.page_height_pt
        )));
    }

    if let Some(offset) = raw.bounds_offset {
        check_bounds_offset(&raw, offset)?;
    }

    Ok(Region {
        x_pt: raw.x_pt,
        y_pt: raw.y_pt,
        w_pt: raw.w_pt,
        h_pt: raw.h_pt,
        page_width_pt: raw.page_width_pt,
        page_height_pt: raw.page_height_pt,
        bounds_offset: raw.bounds_offset,
    })
}

fn check_bounds_offset(raw: &RawRegion, offset: BoundsOffset) -> Result<(), RegionError> {
    if !offset.is_finite() {
        return Err(RegionError::InvalidRegion(
            "Bounds offset must be finite".to_string(),
        ));
    }
    let page = PagePoints::new(raw.page_width_pt, raw.page_height_pt);
    if !offset.matches_page(page, CONTAINMENT_TOLERANCE_PT) {
        return Err(RegionError::InvalidRegion(format!(
            "Bounds offset spans {}x{} but page is {}x{}",
            offset.width(),
            offset.height(),
            raw.page_width_pt,
            raw.page_height_pt
        )));
    }

    // Back in renderer space the box must still sit inside [x0, x1] x [y0, y1]
    let left = offset.x0 + raw.x_pt;
    let top = offset.y0 + raw.y_pt;
    if left + raw.w_pt > offset.x1 + CONTAINMENT_TOLERANCE_PT
        || top + raw.h_pt > offset.y1 + CONTAINMENT_TOLERANCE_PT
    {
        return Err(RegionError::InvalidRegion(
            "Region falls outside the offset page box".to_string(),
        ));
    }
    Ok(())
}

/// Total predicate for values of unknown provenance
pub fn is_region(value: &serde_json::Value) -> bool {
    serde_json::from_value::<Region>(value.clone()).is_ok()
}

impl TryFrom<RawRegion> for Region {
    type Error = RegionError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        make_region(raw)
    }
}

impl From<Region> for RawRegion {
    fn from(region: Region) -> Self {
        RawRegion {
            x_pt: region.x_pt,
            y_pt: region.y_pt,
            w_pt: region.w_pt,
            h_pt: region.h_pt,
            page_width_pt: region.page_width_pt,
            page_height_pt: region.page_height_pt,
            bounds_offset: region.bounds_offset,
            coordinate_system: Some(CoordinateSystem::PdfPointsTopLeft.as_str().to_string()),
        }
    }
}

impl Region {
    /// Region covering the whole page
    pub fn full_page(page: PageGeometry) -> Result<Self, RegionError> {
        make_region(
            RawRegion::new(0.0, 0.0, page.width_pt, page.height_pt, page.points())
                .with_bounds_offset(page.bounds_offset),
        )
    }

    pub fn x_pt(&self) -> f64 {
        self.x_pt
    }

    pub fn y_pt(&self) -> f64 {
        self.y_pt
    }

    pub fn w_pt(&self) -> f64 {
        self.w_pt
    }

    pub fn h_pt(&self) -> f64 {
        self.h_pt
    }

    pub fn page(&self) -> PagePoints {
        PagePoints::new(self.page_width_pt, self.page_height_pt)
    }

    pub fn bounds_offset(&self) -> Option<BoundsOffset> {
        self.bounds_offset
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        CoordinateSystem::PdfPointsTopLeft
    }

    pub fn area_pt(&self) -> f64 {
        self.w_pt * self.h_pt
    }

    /// Same rectangle in PDF user space (bottom-left origin) as `[x, y, w, h]`.
    ///
    /// The bounds offset, when present, is added back so the result addresses
    /// the page's own media box.
    pub fn to_pdf_user_space(&self) -> [f64; 4] {
        let (x0, y0) = self
            .bounds_offset
            .map(|offset| (offset.x0, offset.y0))
            .unwrap_or((0.0, 0.0));
        let x = x0 + self.x_pt;
        let y = y0 + (self.page_height_pt - self.y_pt - self.h_pt);
        [x, y, self.w_pt, self.h_pt]
    }

    /// Same coordinates re-anchored to another page (e.g. a Template applied to
    /// a new document). Re-validated against the new page.
    pub fn on_page(&self, page: PageGeometry) -> Result<Self, RegionError> {
        make_region(
            RawRegion::new(self.x_pt, self.y_pt, self.w_pt, self.h_pt, page.points())
                .with_bounds_offset(page.bounds_offset),
        )
    }
}
