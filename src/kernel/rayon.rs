//! Rayon-parallel surface fill (feature-gated).
//!
//! Rows of the score surface are filled independently with the same
//! per-placement kernel as the scalar path, so the result is bit-identical to
//! [`scan_surface`](crate::kernel::scalar::scan_surface).

use crate::kernel::{placement_range, Kernel, ScanParams, ScoreSurface};
use crate::template::TemplatePlan;
use crate::util::ScreenMatchResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel full surface for kernel `K`.
pub fn scan_surface_par<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    params: ScanParams,
) -> ScreenMatchResult<ScoreSurface> {
    let (max_x, max_y) = placement_range(image, plan)?;
    let width = max_x + 1;
    let height = max_y + 1;
    let mut scores = vec![f32::NEG_INFINITY; width * height];

    scores
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = K::score_at(image, plan, x, y, params.min_var_i);
            }
        });

    Ok(ScoreSurface::from_vec(width, height, scores))
}
