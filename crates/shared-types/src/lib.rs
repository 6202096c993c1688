pub mod fingerprint;
pub mod types;

pub use fingerprint::{hash_document, stable_id};
pub use types::{
    BoundsOffset, CanvasRect, CssRect, PageGeometry, PagePoints, PixelRect, PixelSize,
    RenderedPage,
};
