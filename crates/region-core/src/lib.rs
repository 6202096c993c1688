//! Crop geometry for signed-document capture
//!
//! This crate turns a rectangle drawn on a scaled preview into a stable,
//! device-independent [`Region`] in PDF point space, and decides whether a
//! page is a recognized standard size at all.
//!
//! Everything here is pure: no I/O, no shared state, safe to call from any
//! number of requests concurrently.

pub mod coords;
pub mod error;
pub mod page_size;
pub mod region;
pub mod template;

pub use coords::{canvas_to_css, css_to_canvas, css_to_pdf_points, pdf_points_to_css};
pub use error::RegionError;
pub use page_size::{
    classify_page_size, classify_page_size_with, require_standard_page, PageClassification,
    PageOrientation, StandardPageSize, DEFAULT_TOLERANCE_PT, STANDARD_PAGE_SIZES,
};
pub use region::{
    is_region, make_region, CoordinateSystem, RawRegion, Region, CONTAINMENT_TOLERANCE_PT,
};
pub use template::{Template, TemplateRule};
