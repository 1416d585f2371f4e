//! Contrast-limited adaptive histogram equalization.
//!
//! The image is split into a grid of equally sized tiles, mirrored past the
//! right and bottom edges when the size is not a multiple of the grid. Each
//! tile gets its own equalization lookup table built from a clipped
//! histogram; the clipped excess is spread evenly over all bins (remainder
//! distributed with a fixed stride). Output pixels blend the four nearest
//! tile tables bilinearly by distance to the tile centers, which hides the
//! tile seams.

use crate::image::{ImageView, OwnedImage};
use crate::util::{ScreenMatchError, ScreenMatchResult};

const BINS: usize = 256;

/// Applies CLAHE with a `tiles = (columns, rows)` grid.
///
/// `clip_limit` is relative to a flat histogram: a bin may hold at most
/// `clip_limit * tile_area / 256` samples (at least one). A limit of zero
/// disables clipping, which degrades to plain per-tile equalization. The grid
/// is shrunk when the image has fewer pixels than tiles along an axis.
pub(crate) fn clahe(
    src: ImageView<'_, u8>,
    tiles: (usize, usize),
    clip_limit: f32,
) -> ScreenMatchResult<OwnedImage> {
    let (grid_x, grid_y) = tiles;
    if grid_x == 0 || grid_y == 0 {
        return Err(ScreenMatchError::InvalidConfig {
            reason: "clahe tile grid must be non-zero",
        });
    }
    if !clip_limit.is_finite() || clip_limit < 0.0 {
        return Err(ScreenMatchError::InvalidConfig {
            reason: "clahe clip limit must be finite and non-negative",
        });
    }

    let width = src.width();
    let height = src.height();
    let tiles_x = grid_x.min(width);
    let tiles_y = grid_y.min(height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);
    let rows: Vec<&[u8]> = src.rows().collect();

    // Every tile has the same area, so equal inputs map to equal outputs.
    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let row = rows[mirror(y, height)];
                for x in tx * tile_w..(tx + 1) * tile_w {
                    hist[row[mirror(x, width)] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut hist, tile_w * tile_h, clip_limit));
        }
    }

    let col_weights = axis_weights(width, tiles_x, tile_w);
    let row_weights = axis_weights(height, tiles_y, tile_h);

    let mut out = Vec::with_capacity(width * height);
    for (y, row) in rows.iter().enumerate() {
        let (ty0, ty1, wy) = row_weights[y];
        for (x, &value) in row.iter().enumerate() {
            let (tx0, tx1, wx) = col_weights[x];
            let v = value as usize;
            let top = blend(luts[ty0 * tiles_x + tx0][v], luts[ty0 * tiles_x + tx1][v], wx);
            let bottom = blend(luts[ty1 * tiles_x + tx0][v], luts[ty1 * tiles_x + tx1][v], wx);
            let mixed = top * (1.0 - wy) + bottom * wy;
            out.push(mixed.round().clamp(0.0, 255.0) as u8);
        }
    }

    OwnedImage::new(out, width, height)
}

fn blend(a: u8, b: u8, weight: f32) -> f32 {
    f32::from(a) * (1.0 - weight) + f32::from(b) * weight
}

/// Builds the equalization table for one tile histogram.
fn tile_lut(hist: &mut [u32; BINS], area: usize, clip_limit: f32) -> [u8; BINS] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        let mut clipped = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                clipped += *bin - limit;
                *bin = limit;
            }
        }

        let batch = clipped / BINS as u32;
        let mut residual = clipped - batch * BINS as u32;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (BINS / residual as usize).max(1);
            for bin in hist.iter_mut().step_by(step) {
                if residual == 0 {
                    break;
                }
                *bin += 1;
                residual -= 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; BINS];
    let mut cdf = 0u32;
    for (slot, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *slot = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Reflects an index past the end of `0..len` back inside, without repeating
/// the edge sample. Padding never exceeds `len - 1`.
fn mirror(index: usize, len: usize) -> usize {
    if index < len {
        index
    } else {
        2 * (len - 1) - index
    }
}

/// For every pixel along one axis: the two neighbouring tile indices and the
/// weight of the second one.
fn axis_weights(len: usize, tiles: usize, tile_len: usize) -> Vec<(usize, usize, f32)> {
    let tile_size = tile_len as f32;
    let last = tiles as isize - 1;
    (0..len)
        .map(|i| {
            let pos = (i as f32 + 0.5) / tile_size - 0.5;
            let lower = pos.floor();
            let weight = pos - lower;
            let lower = lower as isize;
            let a = lower.clamp(0, last) as usize;
            let b = (lower + 1).clamp(0, last) as usize;
            (a, b, weight)
        })
        .collect()
}
