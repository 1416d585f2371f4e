//! 3x3 Gaussian smoothing.
//!
//! Uses the separable binomial kernel `[1, 2, 1] / 4` in both directions with
//! integer arithmetic and round-half-up, so results are exact and
//! platform-independent. Borders mirror without repeating the edge pixel.

use crate::image::{ImageView, OwnedImage};
use crate::util::ScreenMatchResult;

/// Blurs a grayscale image with a 3x3 Gaussian kernel.
pub(crate) fn gaussian_blur_3x3(src: ImageView<'_, u8>) -> ScreenMatchResult<OwnedImage> {
    let width = src.width();
    let height = src.height();

    let mut horizontal = vec![0u16; width * height];
    for (y, row) in src.rows().enumerate() {
        let out_row = &mut horizontal[y * width..(y + 1) * width];
        for (x, slot) in out_row.iter_mut().enumerate() {
            let left = row[reflect_101(x as isize - 1, width)];
            let right = row[reflect_101(x as isize + 1, width)];
            *slot = u16::from(left) + 2 * u16::from(row[x]) + u16::from(right);
        }
    }

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let above = reflect_101(y as isize - 1, height) * width;
        let center = y * width;
        let below = reflect_101(y as isize + 1, height) * width;
        for x in 0..width {
            let sum = horizontal[above + x] + 2 * horizontal[center + x] + horizontal[below + x];
            out.push(((sum + 8) / 16) as u8);
        }
    }

    OwnedImage::new(out, width, height)
}

/// Mirrors an index that is at most one step outside `0..len`.
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mirrored = if index < 0 {
        -index
    } else if index > last {
        2 * last - index
    } else {
        index
    };
    mirrored as usize
}
