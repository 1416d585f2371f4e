//! Scalar reference kernels for score evaluation.

use crate::kernel::{placement_range, Kernel, ScanParams, ScoreSurface};
use crate::template::TemplatePlan;
use crate::util::ScreenMatchResult;
use crate::ImageView;

/// Templates with less centered energy than this cannot be correlated.
const MIN_TEMPLATE_ENERGY: f64 = 1e-8;

/// Zero-mean normalized cross-correlation, in `[-1, 1]`.
pub struct ZnccScalar;

/// Normalized cross-correlation without mean removal, in `[0, 1]` for
/// non-negative intensities.
pub struct NccScalar;

/// Normalized squared difference of the mean-centered window and template,
/// reported as `1 - sqdiff` so that a perfect match scores 1.
///
/// Centering keeps flat or slowly shaded backgrounds from scoring close to a
/// textured template. Unlike ZNCC the score also drops when the window
/// contrast differs from the template contrast.
pub struct SqDiffNormedScalar;

/// Sums over one window: `(sum(t' * i), sum(i), sum(i^2))` where `t'` is the
/// template buffer passed in.
fn window_sums(
    image: ImageView<'_, u8>,
    weights: &[f64],
    tpl_width: usize,
    tpl_height: usize,
    x: usize,
    y: usize,
) -> (f64, f64, f64) {
    let mut dot = 0.0f64;
    let mut sum_i = 0.0f64;
    let mut sum_i2 = 0.0f64;
    for ty in 0..tpl_height {
        let img_row = image.row(y + ty).expect("row within bounds for score");
        let base = ty * tpl_width;
        for tx in 0..tpl_width {
            let value = f64::from(img_row[x + tx]);
            dot += weights[base + tx] * value;
            sum_i += value;
            sum_i2 += value * value;
        }
    }
    (dot, sum_i, sum_i2)
}

fn fits(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> bool {
    image.width() >= plan.width()
        && image.height() >= plan.height()
        && x <= image.width() - plan.width()
        && y <= image.height() - plan.height()
}

/// Sum of squared deviations from the window mean.
fn window_variance(sum_i: f64, sum_i2: f64, count: usize) -> f64 {
    sum_i2 - (sum_i * sum_i) / count as f64
}

fn finite_or_neg_inf(score: f64) -> f32 {
    if score.is_finite() {
        score as f32
    } else {
        f32::NEG_INFINITY
    }
}

impl Kernel for ZnccScalar {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32 {
        if !fits(image, plan, x, y) || plan.var_t() <= MIN_TEMPLATE_ENERGY {
            return f32::NEG_INFINITY;
        }
        let (dot, sum_i, sum_i2) =
            window_sums(image, plan.zero_mean(), plan.width(), plan.height(), x, y);
        let var_i = window_variance(sum_i, sum_i2, plan.len());
        if var_i <= min_var_i {
            return f32::NEG_INFINITY;
        }
        finite_or_neg_inf(dot / (plan.var_t() * var_i).sqrt())
    }
}

impl Kernel for NccScalar {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32 {
        if !fits(image, plan, x, y) || plan.energy() <= MIN_TEMPLATE_ENERGY {
            return f32::NEG_INFINITY;
        }
        let (dot, sum_i, sum_i2) =
            window_sums(image, plan.values(), plan.width(), plan.height(), x, y);
        if window_variance(sum_i, sum_i2, plan.len()) <= min_var_i {
            return f32::NEG_INFINITY;
        }
        finite_or_neg_inf(dot / (plan.energy() * sum_i2).sqrt())
    }
}

impl Kernel for SqDiffNormedScalar {
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f64,
    ) -> f32 {
        if !fits(image, plan, x, y) || plan.var_t() <= MIN_TEMPLATE_ENERGY {
            return f32::NEG_INFINITY;
        }
        let (dot, sum_i, sum_i2) =
            window_sums(image, plan.zero_mean(), plan.width(), plan.height(), x, y);
        let var_i = window_variance(sum_i, sum_i2, plan.len());
        if var_i <= min_var_i {
            return f32::NEG_INFINITY;
        }
        // sum((t' - i')^2) = var_t - 2 * sum(t' * i) + var_i for centered t', i'.
        let sqdiff = (plan.var_t() - 2.0 * dot + var_i).max(0.0);
        finite_or_neg_inf(1.0 - sqdiff / (plan.var_t() * var_i).sqrt())
    }
}

/// Fills the full score surface for kernel `K`.
pub fn scan_surface<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    params: ScanParams,
) -> ScreenMatchResult<ScoreSurface> {
    let (max_x, max_y) = placement_range(image, plan)?;
    let width = max_x + 1;
    let height = max_y + 1;
    let mut scores = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            scores.push(K::score_at(image, plan, x, y, params.min_var_i));
        }
    }
    Ok(ScoreSurface::from_vec(width, height, scores))
}

#[cfg(test)]
mod tests {
    use super::{scan_surface, NccScalar, SqDiffNormedScalar, ZnccScalar};
    use crate::kernel::{Kernel, ScanParams};
    use crate::template::TemplatePlan;
    use crate::ImageView;

    fn make_image(width: usize, height: usize) -> Vec<u8> {
        let mut image = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                image.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        image
    }

    fn extract(image: &[u8], img_width: usize, x0: usize, y0: usize, w: usize, h: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(w * h);
        for y in 0..h {
            let start = (y0 + y) * img_width + x0;
            out.extend_from_slice(&image[start..start + w]);
        }
        out
    }

    #[test]
    fn every_kernel_peaks_at_exact_copy() {
        let (img_width, img_height) = (12, 10);
        let image = make_image(img_width, img_height);
        let tpl = extract(&image, img_width, 4, 3, 4, 3);
        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 4, 3).unwrap());

        let zncc = ZnccScalar::score_at(image_view, &plan, 4, 3, 1e-8);
        let ncc = NccScalar::score_at(image_view, &plan, 4, 3, 1e-8);
        let sqdiff = SqDiffNormedScalar::score_at(image_view, &plan, 4, 3, 1e-8);
        assert!((zncc - 1.0).abs() < 1e-5);
        assert!((ncc - 1.0).abs() < 1e-5);
        assert!((sqdiff - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zncc_matches_bruteforce_definition() {
        let (img_width, img_height) = (6, 5);
        let image = make_image(img_width, img_height);
        let tpl: Vec<u8> = (0..6).map(|i| ((i * 5 + i * i) & 0xFF) as u8).collect();
        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 2).unwrap());

        let (x, y) = (2, 1);
        let window = extract(&image, img_width, x, y, 3, 2);
        let mean_t = tpl.iter().map(|&v| v as f64).sum::<f64>() / 6.0;
        let mean_i = window.iter().map(|&v| v as f64).sum::<f64>() / 6.0;
        let mut num = 0.0;
        let mut den_t = 0.0;
        let mut den_i = 0.0;
        for (&t, &i) in tpl.iter().zip(&window) {
            let dt = t as f64 - mean_t;
            let di = i as f64 - mean_i;
            num += dt * di;
            den_t += dt * dt;
            den_i += di * di;
        }
        let expected = (num / (den_t * den_i).sqrt()) as f32;
        let got = ZnccScalar::score_at(image_view, &plan, x, y, 1e-8);
        assert!((got - expected).abs() < 1e-5, "got {got}, expected {expected}");
    }

    #[test]
    fn flat_windows_have_no_zncc_score() {
        let image = vec![90u8; 8 * 8];
        let tpl: Vec<u8> = (0..9).map(|i| (i * 20) as u8).collect();
        let image_view = ImageView::from_slice(&image, 8, 8).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 3).unwrap());
        let surface = scan_surface::<ZnccScalar>(image_view, &plan, ScanParams::default()).unwrap();
        assert_eq!((surface.width(), surface.height()), (6, 6));
        assert!(surface.as_slice().iter().all(|s| *s == f32::NEG_INFINITY));
    }

    #[test]
    fn flat_windows_have_no_score_under_any_kernel() {
        let tpl: Vec<u8> = (0..9).map(|i| (40 + i * 20) as u8).collect();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 3).unwrap());
        for fill in [25u8, 128, 160, 200, 255] {
            let image = vec![fill; 8 * 8];
            let image_view = ImageView::from_slice(&image, 8, 8).unwrap();
            let params = ScanParams::default();
            let ncc = scan_surface::<NccScalar>(image_view, &plan, params).unwrap();
            let sqdiff = scan_surface::<SqDiffNormedScalar>(image_view, &plan, params).unwrap();
            assert!(ncc.as_slice().iter().all(|s| *s == f32::NEG_INFINITY), "ncc on {fill}");
            assert!(
                sqdiff.as_slice().iter().all(|s| *s == f32::NEG_INFINITY),
                "sqdiff on {fill}"
            );
        }
    }

    #[test]
    fn sqdiff_penalizes_contrast_that_zncc_ignores() {
        let tpl: Vec<u8> = (0..16).map(|i| if (i * 7) % 5 < 2 { 200 } else { 60 }).collect();
        // Same pattern at half the contrast around the same mean.
        let image: Vec<u8> = tpl.iter().map(|&v| if v == 200 { 165 } else { 95 }).collect();
        let image_view = ImageView::from_slice(&image, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 4, 4).unwrap());
        let zncc = ZnccScalar::score_at(image_view, &plan, 0, 0, 1e-8);
        let sqdiff = SqDiffNormedScalar::score_at(image_view, &plan, 0, 0, 1e-8);
        assert!((zncc - 1.0).abs() < 1e-5);
        assert!((sqdiff - 0.5).abs() < 1e-5, "sqdiff {sqdiff}");
    }

    #[test]
    fn sqdiff_is_inverted_so_higher_is_better() {
        let (img_width, img_height) = (12, 10);
        let image = make_image(img_width, img_height);
        let tpl = extract(&image, img_width, 5, 5, 4, 4);
        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 4, 4).unwrap());
        let exact = SqDiffNormedScalar::score_at(image_view, &plan, 5, 5, 1e-8);
        let off = SqDiffNormedScalar::score_at(image_view, &plan, 1, 2, 1e-8);
        assert!(exact > off);
    }

    #[test]
    fn template_larger_than_image_is_an_error() {
        let image = vec![0u8; 4];
        let tpl = vec![0u8; 9];
        let image_view = ImageView::from_slice(&image, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 3).unwrap());
        assert!(scan_surface::<NccScalar>(image_view, &plan, ScanParams::default()).is_err());
    }
}
