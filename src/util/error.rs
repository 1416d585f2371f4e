//! Error types for screenmatch.

use thiserror::Error;

/// Result alias for screenmatch operations.
pub type ScreenMatchResult<T> = std::result::Result<T, ScreenMatchError>;

/// Errors that can occur when running screenmatch algorithms.
///
/// `EmptyImage`, `TargetTooLarge` and `InvalidConfig` reject a search before
/// any work is done. The remaining variants describe malformed buffers and
/// out-of-range regions; inside the pipeline they are recovered locally.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScreenMatchError {
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("stride {stride} is smaller than width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer cannot hold the described image.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Requested region does not lie inside the image.
    #[error(
        "roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Source or target image has no pixels.
    #[error("{which} image is empty")]
    EmptyImage { which: &'static str },
    /// The unscaled target does not fit inside the source.
    #[error("target {target_width}x{target_height} does not fit in source {source_width}x{source_height}")]
    TargetTooLarge {
        target_width: usize,
        target_height: usize,
        source_width: usize,
        source_height: usize,
    },
    /// A configuration value is out of its valid range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Loading or writing an image file failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
