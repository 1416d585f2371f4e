//! Loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::util::{ScreenMatchError, ScreenMatchResult};
use image::RgbImage;
use std::path::Path;

/// Loads an image from disk as 8-bit RGB.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> ScreenMatchResult<RgbImage> {
    let img = image::open(path).map_err(|err| ScreenMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    Ok(img.to_rgb8())
}

/// Writes an RGB image to disk; the format follows the file extension.
pub fn save_rgb_image<P: AsRef<Path>>(img: &RgbImage, path: P) -> ScreenMatchResult<()> {
    img.save(path).map_err(|err| ScreenMatchError::ImageIo {
        reason: err.to_string(),
    })
}
