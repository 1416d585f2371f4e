//! Quality scoring of candidate regions against the target.
//!
//! Both regions are binarized with a locally adaptive threshold, then
//! compared four ways: structural correlation (optionally blended with blob
//! structure), Canny edge overlap, mean absolute difference and histogram
//! correlation. Every signal lies in `[0, 1]`. Scoring never fails: a region
//! that cannot be scored yields [`MatchQuality::ZERO`] and a warning.

mod binarize;
mod shape;

use crate::image::{to_gray, OwnedImage};
use crate::trace::trace_warn;
use crate::util::math::{clamp_unit, pearson};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::borrow::Cow;

use binarize::adaptive_threshold;

/// Added to the edge-union size so edgeless regions do not divide by zero.
const EDGE_EPSILON: f64 = 1e-6;

/// Four independent similarity signals for one candidate region.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MatchQuality {
    /// Correlation of the binarized regions, optionally blended 50/50 with
    /// blob-structure agreement.
    pub structural_similarity: f32,
    /// `1 - mean(|a - b|) / 255` over the binarized regions.
    pub pixel_difference: f32,
    /// Intersection over union of the Canny edge maps.
    pub edge_similarity: f32,
    /// Correlation of the binarized histograms, clamped at zero.
    pub histogram_similarity: f32,
}

impl MatchQuality {
    /// All signals zero: no evidence of a match.
    pub const ZERO: Self = Self {
        structural_similarity: 0.0,
        pixel_difference: 0.0,
        edge_similarity: 0.0,
        histogram_similarity: 0.0,
    };

    /// Returns `true` if every signal lies in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        [
            self.structural_similarity,
            self.pixel_difference,
            self.edge_similarity,
            self.histogram_similarity,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}

/// Configuration for quality scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityConfig {
    /// Adaptive threshold neighbourhood radius; the block is `2r + 1` wide.
    pub block_radius: usize,
    /// Subtracted from the local mean before thresholding.
    pub offset: f32,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Histogram bin count, 1..=256. Two bins suit binarized regions.
    pub histogram_bins: usize,
    /// Blend blob-structure agreement into the structural signal.
    pub contour_blend: bool,
    /// Skip the remaining signals when structural similarity falls below
    /// this value.
    pub early_exit_below: Option<f32>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            block_radius: 5,
            offset: 2.0,
            canny_low: 100.0,
            canny_high: 200.0,
            histogram_bins: 2,
            contour_blend: true,
            early_exit_below: None,
        }
    }
}

impl QualityConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> ScreenMatchResult<()> {
        if self.block_radius == 0 {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "quality block_radius must be at least 1",
            });
        }
        if !self.offset.is_finite() {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "quality offset must be finite",
            });
        }
        if !(self.canny_low.is_finite() && self.canny_high.is_finite())
            || self.canny_low > self.canny_high
        {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "canny thresholds must be finite with low <= high",
            });
        }
        if !(1..=256).contains(&self.histogram_bins) {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "histogram_bins must be within 1..=256",
            });
        }
        Ok(())
    }
}

/// Scores a source region against the target.
///
/// The target is resized to the region's dimensions when they differ.
pub fn score(region: &RgbImage, target: &RgbImage, cfg: &QualityConfig) -> MatchQuality {
    match try_score(region, target, cfg) {
        Ok(quality) => quality,
        Err(err) => {
            trace_warn!("quality scoring failed, reporting zero quality: {err}");
            MatchQuality::ZERO
        }
    }
}

fn try_score(
    region: &RgbImage,
    target: &RgbImage,
    cfg: &QualityConfig,
) -> ScreenMatchResult<MatchQuality> {
    if target.width() == 0 || target.height() == 0 {
        return Err(ScreenMatchError::EmptyImage { which: "target" });
    }
    let region_gray = to_gray(region)?;
    let target = if target.dimensions() == region.dimensions() {
        Cow::Borrowed(target)
    } else {
        Cow::Owned(imageops::resize(
            target,
            region.width(),
            region.height(),
            FilterType::Triangle,
        ))
    };
    let target_gray = to_gray(&target)?;

    let region_bin = adaptive_threshold(region_gray.view(), cfg.block_radius, cfg.offset)?;
    let target_bin = adaptive_threshold(target_gray.view(), cfg.block_radius, cfg.offset)?;

    let region_mask = region_bin.clone().into_gray_image();
    let target_mask = target_bin.clone().into_gray_image();

    let correlation = binary_correlation(&region_bin, &target_bin);
    let structural = if cfg.contour_blend {
        let blobs = shape::shape_similarity(
            &shape::blob_stats(&region_mask),
            &shape::blob_stats(&target_mask),
        );
        0.5 * correlation + 0.5 * blobs
    } else {
        correlation
    };
    let structural = clamp_unit(structural);

    if let Some(bar) = cfg.early_exit_below {
        if structural < bar {
            return Ok(MatchQuality {
                structural_similarity: structural,
                ..MatchQuality::ZERO
            });
        }
    }

    Ok(MatchQuality {
        structural_similarity: structural,
        pixel_difference: pixel_similarity(&region_bin, &target_bin),
        edge_similarity: edge_overlap(&region_mask, &target_mask, cfg.canny_low, cfg.canny_high),
        histogram_similarity: histogram_similarity(&region_bin, &target_bin, cfg.histogram_bins)?,
    })
}

fn as_f64(img: &OwnedImage) -> Vec<f64> {
    img.data().iter().map(|&v| f64::from(v)).collect()
}

/// Pearson correlation of two binary images, clamped into `[0, 1]`.
///
/// Two uniform images correlate perfectly when they are equal and not at all
/// otherwise.
fn binary_correlation(a: &OwnedImage, b: &OwnedImage) -> f32 {
    match pearson(&as_f64(a), &as_f64(b)) {
        Some(r) => clamp_unit(r as f32),
        None if a.data() == b.data() => 1.0,
        None => 0.0,
    }
}

fn pixel_similarity(a: &OwnedImage, b: &OwnedImage) -> f32 {
    let total: u64 = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    let n = a.data().len().max(1) as f64;
    clamp_unit((1.0 - total as f64 / (n * 255.0)) as f32)
}

fn edge_overlap(a: &image::GrayImage, b: &image::GrayImage, low: f32, high: f32) -> f32 {
    let edges_a = imageproc::edges::canny(a, low, high);
    let edges_b = imageproc::edges::canny(b, low, high);
    let mut intersection = 0usize;
    let mut union = 0usize;
    for (pa, pb) in edges_a.as_raw().iter().zip(edges_b.as_raw()) {
        let (ea, eb) = (*pa > 0, *pb > 0);
        if ea && eb {
            intersection += 1;
        }
        if ea || eb {
            union += 1;
        }
    }
    clamp_unit((intersection as f64 / (union as f64 + EDGE_EPSILON)) as f32)
}

fn histogram(img: &OwnedImage, bins: usize) -> Vec<f64> {
    let mut counts = vec![0.0f64; bins];
    for &v in img.data() {
        counts[usize::from(v) * bins / 256] += 1.0;
    }
    counts
}

/// Correlation of the two histograms; degenerate (flat) histograms compare
/// as identical.
fn histogram_similarity(a: &OwnedImage, b: &OwnedImage, bins: usize) -> ScreenMatchResult<f32> {
    if bins == 0 || bins > 256 {
        return Err(ScreenMatchError::InvalidConfig {
            reason: "histogram_bins must be within 1..=256",
        });
    }
    let similarity = pearson(&histogram(a, bins), &histogram(b, bins)).unwrap_or(1.0);
    Ok(clamp_unit(similarity as f32))
}
