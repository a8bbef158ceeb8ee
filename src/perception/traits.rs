use async_trait::async_trait;

use crate::errors::EduCopyResult;
use crate::perception::types::RasterImage;

/// Renders the visible page surface to pixels.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn capture(&self) -> EduCopyResult<RasterImage>;
}
