//! Correlation kernel implementations.
//!
//! Every kernel reports scores oriented so that higher is better; the
//! squared-difference family is inverted (`1 - score`) inside its kernel.
//! Placements whose window is flat (variance at or below
//! [`ScanParams::min_var_i`]) are reported as `f32::NEG_INFINITY` under every
//! kernel and never pass a floor.

use crate::template::TemplatePlan;
use crate::util::{ScreenMatchError, ScreenMatchResult};
use crate::ImageView;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Window variance (sum of squared deviations from the window mean) at
    /// or below which a placement has no score.
    pub min_var_i: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self { min_var_i: 1.0 }
    }
}

/// Kernel trait for scoring a single placement.
pub trait Kernel {
    /// Computes the normalized score at a single placement (top-left
    /// coordinates), or `f32::NEG_INFINITY` where it is undefined.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32;
}

/// Dense score surface of size `(source - template + 1)` per axis.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreSurface {
    width: usize,
    height: usize,
    scores: Vec<f32>,
}

impl ScoreSurface {
    pub(crate) fn from_vec(width: usize, height: usize, scores: Vec<f32>) -> Self {
        debug_assert_eq!(scores.len(), width * height);
        Self {
            width,
            height,
            scores,
        }
    }

    /// Returns the number of placements along x.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of placements along y.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the score at placement `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.scores.get(y * self.width + x).copied()
    }

    /// Returns all scores in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.scores
    }

    /// Iterates over `(x, y, score)` for every placement scoring at least
    /// `floor`, in row-major order.
    pub fn above(&self, floor: f32) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let width = self.width;
        self.scores
            .iter()
            .enumerate()
            .filter(move |&(_, &score)| score >= floor)
            .map(move |(idx, &score)| (idx % width, idx / width, score))
    }
}

/// Returns the placement range `(max_x, max_y)` or an error when the
/// template does not fit.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> ScreenMatchResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(ScreenMatchError::RoiOutOfBounds {
            x: 0,
            y: 0,
            width: tpl_width,
            height: tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;
