//! Template rescaling for multi-scale search.

use crate::image::{owned_from_gray_image, ImageView, OwnedImage};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use image::imageops::{self, FilterType};
use image::GrayImage;

/// Returns the target size for `scale`, rounded to the nearest pixel and at
/// least one pixel along each axis.
pub fn scaled_size(width: usize, height: usize, scale: f32) -> (usize, usize) {
    let scaled = |len: usize| ((len as f32 * scale).round() as usize).max(1);
    (scaled(width), scaled(height))
}

/// Resizes a grayscale template by `scale` using cubic (Catmull-Rom)
/// resampling.
///
/// A scale that leaves the size unchanged returns an exact copy.
pub fn scale_u8_cubic(src: ImageView<'_, u8>, scale: f32) -> ScreenMatchResult<OwnedImage> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ScreenMatchError::InvalidConfig {
            reason: "scale must be finite and positive",
        });
    }
    let (width, height) = scaled_size(src.width(), src.height(), scale);
    let copy = OwnedImage::from_view(src);
    if (width, height) == (src.width(), src.height()) {
        return Ok(copy);
    }

    let gray = copy.into_gray_image();
    let resized: GrayImage =
        imageops::resize(&gray, width as u32, height as u32, FilterType::CatmullRom);
    owned_from_gray_image(&resized)
}
