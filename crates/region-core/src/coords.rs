//! Coordinate transformation between on-screen pixels and PDF points
//!
//! Four spaces are involved:
//! - CSS pixels: the crop as the user drew it on a (possibly scaled) preview
//! - canvas pixels: the full-resolution rendered page behind the preview
//! - PDF points: the page's physical size, top-left origin
//! - the renderer's bounding box, which may not start at (0, 0)
//!
//! All scaling is proportional; no DPI is assumed anywhere.

use shared_types::{BoundsOffset, CanvasRect, CssRect, PagePoints, PixelRect, PixelSize};

use crate::error::RegionError;
use crate::region::{make_region, RawRegion, Region};

fn check_size(label: &str, size: PixelSize) -> Result<(), RegionError> {
    if !size.width.is_finite() || !size.height.is_finite() {
        return Err(RegionError::MalformedInput(format!(
            "{} size must be finite, got {}x{}",
            label, size.width, size.height
        )));
    }
    if size.width <= 0.0 || size.height <= 0.0 {
        return Err(RegionError::MalformedInput(format!(
            "{} size must be positive, got {}x{}",
            label, size.width, size.height
        )));
    }
    Ok(())
}

fn check_page(page: PagePoints) -> Result<(), RegionError> {
    if !page.is_valid() {
        return Err(RegionError::MalformedInput(format!(
            "Page size must be finite and positive, got {}x{}pt",
            page.width_pt, page.height_pt
        )));
    }
    Ok(())
}

fn check_crop(crop: &PixelRect) -> Result<(), RegionError> {
    if !crop.is_finite() {
        return Err(RegionError::MalformedInput(format!(
            "Crop must be finite, got {:?}",
            crop
        )));
    }
    if crop.width < 0.0 || crop.height < 0.0 {
        return Err(RegionError::MalformedInput(format!(
            "Crop size must not be negative, got {}x{}",
            crop.width, crop.height
        )));
    }
    Ok(())
}

fn check_offset(offset: Option<BoundsOffset>) -> Result<(), RegionError> {
    match offset {
        Some(offset) if !offset.is_finite() => Err(RegionError::MalformedInput(
            "Bounds offset must be finite".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Scale a rectangle from one pixel space into another
fn scale_rect(rect: PixelRect, from: PixelSize, to: PixelSize) -> PixelRect {
    let scale_x = to.width / from.width;
    let scale_y = to.height / from.height;
    PixelRect {
        x: rect.x * scale_x,
        y: rect.y * scale_y,
        width: rect.width * scale_x,
        height: rect.height * scale_y,
    }
}

/// Convert a CSS-pixel crop into canvas pixels
pub fn css_to_canvas(
    crop_css: CssRect,
    displayed: PixelSize,
    canvas: PixelSize,
) -> Result<CanvasRect, RegionError> {
    check_size("Displayed", displayed)?;
    check_size("Canvas", canvas)?;
    check_crop(&crop_css)?;
    Ok(scale_rect(crop_css, displayed, canvas))
}

/// Convert a canvas-pixel rectangle back into CSS pixels
pub fn canvas_to_css(
    rect: CanvasRect,
    canvas: PixelSize,
    displayed: PixelSize,
) -> Result<CssRect, RegionError> {
    check_size("Displayed", displayed)?;
    check_size("Canvas", canvas)?;
    Ok(scale_rect(rect, canvas, displayed))
}

/// Convert a crop drawn on a preview image into a validated [`Region`].
///
/// Steps: CSS pixels to canvas pixels, canvas pixels to points proportionally
/// against the page size, subtract the bounds offset origin if present, then
/// validate. Out-of-page results are rejected, never clamped.
pub fn css_to_pdf_points(
    crop_css: CssRect,
    displayed: PixelSize,
    canvas: PixelSize,
    page: PagePoints,
    bounds_offset: Option<BoundsOffset>,
) -> Result<Region, RegionError> {
    check_page(page)?;
    check_offset(bounds_offset)?;
    let canvas_rect = css_to_canvas(crop_css, displayed, canvas)?;

    let mut x_pt = (canvas_rect.x / canvas.width) * page.width_pt;
    let mut y_pt = (canvas_rect.y / canvas.height) * page.height_pt;
    let w_pt = (canvas_rect.width / canvas.width) * page.width_pt;
    let h_pt = (canvas_rect.height / canvas.height) * page.height_pt;

    if let Some(offset) = bounds_offset {
        x_pt -= offset.x0;
        y_pt -= offset.y0;
    }

    make_region(RawRegion::new(x_pt, y_pt, w_pt, h_pt, page).with_bounds_offset(bounds_offset))
}

/// Inverse of [`css_to_pdf_points`]: where a stored region lands on a preview.
pub fn pdf_points_to_css(
    region: &Region,
    page: PagePoints,
    canvas: PixelSize,
    displayed: PixelSize,
    bounds_offset: Option<BoundsOffset>,
) -> Result<CssRect, RegionError> {
    check_page(page)?;
    check_offset(bounds_offset)?;
    check_size("Displayed", displayed)?;
    check_size("Canvas", canvas)?;

    let (x0, y0) = bounds_offset
        .map(|offset| (offset.x0, offset.y0))
        .unwrap_or((0.0, 0.0));

    let canvas_rect = PixelRect {
        x: ((region.x_pt() + x0) / page.width_pt) * canvas.width,
        y: ((region.y_pt() + y0) / page.height_pt) * canvas.height,
        width: (region.w_pt() / page.width_pt) * canvas.width,
        height: (region.h_pt() / page.height_pt) * canvas.height,
    };

    canvas_to_css(canvas_rect, canvas, displayed)
}

impl Region {
    /// Project this region onto a preview using its own page and bounds offset
    pub fn to_css(&self, canvas: PixelSize, displayed: PixelSize) -> Result<CssRect, RegionError> {
        pdf_points_to_css(self, self.page(), canvas, displayed, self.bounds_offset())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        50.0f64..4000.0
    }

    fn page_dimension() -> impl Strategy<Value = f64> {
        100.0f64..2000.0
    }

    proptest! {
        // =========================================================================
        // Round trip: screen -> points -> screen within 2px
        // =========================================================================

        #[test]
        fn roundtrip_css_points_css(
            displayed_w in dimension(),
            displayed_h in dimension(),
            canvas_w in dimension(),
            canvas_h in dimension(),
            page_w in page_dimension(),
            page_h in page_dimension(),
            x_pct in 0.0f64..0.8,
            y_pct in 0.0f64..0.8,
            w_pct in 0.01f64..0.2,
            h_pct in 0.01f64..0.2,
        ) {
            let displayed = PixelSize::new(displayed_w, displayed_h);
            let canvas = PixelSize::new(canvas_w, canvas_h);
            let page = PagePoints::new(page_w, page_h);
            let crop = PixelRect::new(
                x_pct * displayed_w,
                y_pct * displayed_h,
                w_pct * displayed_w,
                h_pct * displayed_h,
            );

            let region = css_to_pdf_points(crop, displayed, canvas, page, None).unwrap();
            let back = pdf_points_to_css(&region, page, canvas, displayed, None).unwrap();

            prop_assert!((back.x - crop.x).abs() <= 2.0, "x: {} vs {}", back.x, crop.x);
            prop_assert!((back.y - crop.y).abs() <= 2.0, "y: {} vs {}", back.y, crop.y);
            prop_assert!((back.width - crop.width).abs() <= 2.0);
            prop_assert!((back.height - crop.height).abs() <= 2.0);
        }

        /// Same round trip with a renderer box that starts away from the origin
        #[test]
        fn roundtrip_with_bounds_offset(
            displayed_w in dimension(),
            displayed_h in dimension(),
            page_w in page_dimension(),
            page_h in page_dimension(),
            offset_x in 0.0f64..20.0,
            offset_y in 0.0f64..20.0,
            x_pct in 0.1f64..0.8,
            y_pct in 0.1f64..0.8,
            w_pct in 0.01f64..0.1,
            h_pct in 0.01f64..0.1,
        ) {
            let displayed = PixelSize::new(displayed_w, displayed_h);
            let canvas = PixelSize::new(displayed_w * 2.0, displayed_h * 2.0);
            let page = PagePoints::new(page_w, page_h);
            let offset = BoundsOffset::new(offset_x, offset_y, offset_x + page_w, offset_y + page_h);

            // Keep the crop clear of the offset so the shifted box stays on the page
            prop_assume!(x_pct * page_w > offset_x && y_pct * page_h > offset_y);

            let crop = PixelRect::new(
                x_pct * displayed_w,
                y_pct * displayed_h,
                w_pct * displayed_w,
                h_pct * displayed_h,
            );
            let region = css_to_pdf_points(crop, displayed, canvas, page, Some(offset)).unwrap();
            let back = pdf_points_to_css(&region, page, canvas, displayed, Some(offset)).unwrap();

            prop_assert!((back.x - crop.x).abs() <= 2.0);
            prop_assert!((back.y - crop.y).abs() <= 2.0);
            prop_assert!((back.width - crop.width).abs() <= 2.0);
            prop_assert!((back.height - crop.height).abs() <= 2.0);
        }

        // =========================================================================
        // Scale preservation: the same relative crop on any preview size
        // =========================================================================

        #[test]
        fn preview_scale_does_not_change_points(
            scale in 0.25f64..4.0,
            x_pct in 0.0f64..0.8,
            y_pct in 0.0f64..0.8,
        ) {
            let canvas = PixelSize::new(1836.0, 2376.0);
            let page = PagePoints::letter();
            let small = PixelSize::new(918.0, 1188.0);
            let scaled = PixelSize::new(918.0 * scale, 1188.0 * scale);

            let a = css_to_pdf_points(
                PixelRect::new(x_pct * small.width, y_pct * small.height, 20.0, 10.0),
                small, canvas, page, None,
            ).unwrap();
            let b = css_to_pdf_points(
                PixelRect::new(x_pct * scaled.width, y_pct * scaled.height, 20.0 * scale, 10.0 * scale),
                scaled, canvas, page, None,
            ).unwrap();

            prop_assert!((a.x_pt() - b.x_pt()).abs() < 0.0001);
            prop_assert!((a.y_pt() - b.y_pt()).abs() < 0.0001);
            prop_assert!((a.w_pt() - b.w_pt()).abs() < 0.0001);
            prop_assert!((a.h_pt() - b.h_pt()).abs() < 0.0001);
        }

        /// Canvas resolution must not matter either: points depend only on proportions
        #[test]
        fn canvas_resolution_does_not_change_points(
            density in 0.5f64..4.0,
            x_pct in 0.0f64..0.8,
            y_pct in 0.0f64..0.8,
        ) {
            let displayed = PixelSize::new(612.0, 792.0);
            let page = PagePoints::letter();
            let crop = PixelRect::new(x_pct * 612.0, y_pct * 792.0, 40.0, 12.0);

            let base = css_to_pdf_points(crop, displayed, PixelSize::new(612.0, 792.0), page, None).unwrap();
            let dense = css_to_pdf_points(
                crop,
                displayed,
                PixelSize::new(612.0 * density, 792.0 * density),
                page,
                None,
            ).unwrap();

            prop_assert!((base.x_pt() - dense.x_pt()).abs() < 0.0001);
            prop_assert!((base.h_pt() - dense.h_pt()).abs() < 0.0001);
        }
    }
}
