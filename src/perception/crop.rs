/// Region crop: cut the selected page rectangle out of a rendered surface and
/// encode it as a JPEG data URL for the multimodal request.
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::errors::{EduCopyError, EduCopyResult};
use crate::perception::types::{CaptureRegion, CapturedImage, RasterImage};

pub const JPEG_QUALITY: u8 = 90;
const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Crop `region` (page space) out of `raster` and encode it.
///
/// The region is mapped through the raster's origin and scale, then clamped
/// to the raster bounds. A region entirely outside the raster is an error.
pub fn crop_region(raster: &RasterImage, region: &CaptureRegion) -> EduCopyResult<CapturedImage> {
    let (w, h) = raster.pixels.dimensions();
    let scale = if raster.scale > 0.0 { raster.scale } else { 1.0 };

    let to_px = |page: f64, origin: f64, limit: u32| -> u32 {
        ((page - origin) * scale).round().clamp(0.0, limit as f64) as u32
    };
    let x1 = to_px(region.origin.x, raster.origin.x, w);
    let y1 = to_px(region.origin.y, raster.origin.y, h);
    let x2 = to_px(region.origin.x + region.width, raster.origin.x, w);
    let y2 = to_px(region.origin.y + region.height, raster.origin.y, h);
    let cw = x2.saturating_sub(x1);
    let ch = y2.saturating_sub(y1);

    if cw == 0 || ch == 0 {
        return Err(EduCopyError::CaptureFailure(
            "selected region lies outside the rendered surface".into(),
        ));
    }

    let cropped = image::imageops::crop_imm(&raster.pixels, x1, y1, cw, ch).to_image();
    // JPEG carries no alpha channel.
    let rgb = DynamicImage::ImageRgba8(cropped).to_rgb8();

    let mut jpeg_bytes = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY))
        .map_err(|e| EduCopyError::CaptureFailure(format!("JPEG encode: {e}")))?;

    let b64 = base64::engine::general_purpose::STANDARD.encode(&jpeg_bytes);
    tracing::debug!(width = cw, height = ch, bytes = jpeg_bytes.len(), "region cropped");

    Ok(CapturedImage {
        data_url: format!("{DATA_URL_PREFIX}{b64}"),
        jpeg_bytes,
        width: cw,
        height: ch,
    })
}

/// Decode the payload of a `data:image/...;base64,` URL.
pub fn decode_data_url(data_url: &str) -> EduCopyResult<Vec<u8>> {
    let (_, payload) = data_url
        .split_once(";base64,")
        .ok_or_else(|| EduCopyError::CaptureFailure("not a base64 data URL".into()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| EduCopyError::CaptureFailure(format!("base64 decode: {e}")))
}
