//! Locally adaptive binarization.
//!
//! Each pixel is compared against a Gaussian-weighted mean of its
//! `(2r + 1) x (2r + 1)` neighbourhood minus a fixed offset, which keeps the
//! result stable when the background brightness differs between the screen
//! region and the reference target. Borders replicate the edge pixel.

use crate::image::{ImageView, OwnedImage};
use crate::util::{ScreenMatchError, ScreenMatchResult};

/// Foreground value of a binarized image.
pub(crate) const FOREGROUND: u8 = 255;

/// Binarizes `src`: pixels brighter than `local_mean - offset` become 255,
/// all others 0.
pub(crate) fn adaptive_threshold(
    src: ImageView<'_, u8>,
    block_radius: usize,
    offset: f32,
) -> ScreenMatchResult<OwnedImage> {
    if block_radius == 0 {
        return Err(ScreenMatchError::InvalidConfig {
            reason: "adaptive threshold block radius must be at least 1",
        });
    }
    let width = src.width();
    let height = src.height();
    let kernel = gaussian_kernel(block_radius);
    let radius = block_radius as isize;
    let rows: Vec<&[u8]> = src.rows().collect();

    let mut horizontal = vec![0.0f64; width * height];
    for (y, row) in rows.iter().enumerate() {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = clamp_index(x as isize + k as isize - radius, width);
                acc += weight * f64::from(row[sx]);
            }
            horizontal[y * width + x] = acc;
        }
    }

    let mut out = Vec::with_capacity(width * height);
    for (y, row) in rows.iter().enumerate() {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = clamp_index(y as isize + k as isize - radius, height);
                acc += weight * horizontal[sy * width + x];
            }
            let threshold = acc.round() - f64::from(offset);
            let value = if f64::from(row[x]) > threshold {
                FOREGROUND
            } else {
                0
            };
            out.push(value);
        }
    }

    OwnedImage::new(out, width, height)
}

/// Normalized 1D Gaussian with the sigma conventionally paired with a
/// `2r + 1` aperture.
fn gaussian_kernel(radius: usize) -> Vec<f64> {
    let size = 2 * radius + 1;
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

fn clamp_index(index: isize, len: usize) -> usize {
    index.clamp(0, len as isize - 1) as usize
}
