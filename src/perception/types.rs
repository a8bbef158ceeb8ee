use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// A point in page space (viewport coordinates plus scroll offset) or, where
/// documented, in viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

impl PagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

impl ScrollOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Viewport point → page point.
    pub fn to_page(&self, client: PagePoint) -> PagePoint {
        PagePoint::new(client.x + self.x, client.y + self.y)
    }
}

/// Viewport-relative rectangle used to draw the selection box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Page-relative, scroll-independent selection rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub origin: PagePoint,
    pub width: f64,
    pub height: f64,
}

impl CaptureRegion {
    /// Normalize two opposite corners in any drag direction.
    pub fn from_corners(a: PagePoint, b: PagePoint) -> Self {
        Self {
            origin: PagePoint::new(a.x.min(b.x), a.y.min(b.y)),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn is_at_least(&self, min_extent: f64) -> bool {
        self.width >= min_extent && self.height >= min_extent
    }

    pub fn to_viewport(&self, scroll: ScrollOffset) -> ViewportRect {
        ViewportRect {
            left: self.origin.x - scroll.x,
            top: self.origin.y - scroll.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// A rendered surface. Pixel (0, 0) corresponds to page point `origin`;
/// `scale` is device pixels per page unit.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub pixels: RgbaImage,
    pub origin: PagePoint,
    pub scale: f64,
}

impl RasterImage {
    /// A raster of the whole page at 1:1 scale.
    pub fn page(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            origin: PagePoint::default(),
            scale: 1.0,
        }
    }
}

/// An encoded crop ready to be sent to the Controller.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
    pub jpeg_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
