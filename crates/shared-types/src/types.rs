use serde::{Deserialize, Serialize};

/// Width/height pair in pixels.
///
/// Used both for the on-screen (CSS) size of a preview image and for the
/// full-resolution canvas the preview was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
}

impl PixelSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Rectangle in pixels, top-left origin.
///
/// Only lives for the duration of a single capture interaction; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

/// A crop in on-screen pixels, measured against the displayed preview
pub type CssRect = PixelRect;

/// A crop in rendered-canvas pixels
pub type CanvasRect = PixelRect;

/// Physical page size in PDF points (1 point = 1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePoints {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PagePoints {
    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    /// Both dimensions finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.width_pt.is_finite()
            && self.height_pt.is_finite()
            && self.width_pt > 0.0
            && self.height_pt > 0.0
    }
}

/// Page bounding box as reported by a renderer.
///
/// Some renderers report boxes that do not start at (0, 0); the origin has to
/// be subtracted before coordinates are comparable across documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsOffset {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundsOffset {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// Whether the box spans exactly the given page, within `tolerance_pt`
    pub fn matches_page(&self, page: PagePoints, tolerance_pt: f64) -> bool {
        (self.width() - page.width_pt).abs() <= tolerance_pt
            && (self.height() - page.height_pt).abs() <= tolerance_pt
    }
}

/// One rendered page's physical size, computed once per render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    pub width_pt: f64,
    pub height_pt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_offset: Option<BoundsOffset>,
}

impl PageGeometry {
    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
            bounds_offset: None,
        }
    }

    pub fn with_bounds_offset(mut self, offset: BoundsOffset) -> Self {
        self.bounds_offset = Some(offset);
        self
    }

    pub fn points(&self) -> PagePoints {
        PagePoints::new(self.width_pt, self.height_pt)
    }
}

/// Output of a page rasterization: canvas size plus the page it represents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub canvas_pixels: PixelSize,
    pub page: PageGeometry,
}
