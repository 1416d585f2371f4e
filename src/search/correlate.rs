//! Multi-scale, multi-method correlation.
//!
//! Every (scale, method) pair produces a full score surface; every placement
//! at or above the floor becomes a [`Candidate`]. Nearby candidates are kept
//! on purpose, the consensus stage needs all of them.

use crate::candidate::Candidate;
#[cfg(feature = "rayon")]
use crate::kernel::rayon::scan_surface_par;
use crate::kernel::scalar::{scan_surface, NccScalar, SqDiffNormedScalar, ZnccScalar};
use crate::kernel::{ScanParams, ScoreSurface};
use crate::search::MatchMethod;
use crate::template::{ScaledTemplate, TemplateBank, TemplatePlan};
use crate::trace::{trace_event, trace_span};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use crate::ImageView;

/// Settings shared by every surface of one correlation pass.
#[derive(Clone, Copy, Debug)]
pub struct CorrelateParams {
    /// Minimum normalized score for a placement to become a candidate.
    pub min_score: f32,
    /// Kernel scan settings.
    pub scan: ScanParams,
    /// Fill surfaces row-parallel when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl Default for CorrelateParams {
    fn default() -> Self {
        Self {
            min_score: 0.8,
            scan: ScanParams::default(),
            parallel: false,
        }
    }
}

impl MatchMethod {
    /// Computes the score surface of `plan` over `image` for this method.
    pub fn surface(
        self,
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        scan: ScanParams,
        parallel: bool,
    ) -> ScreenMatchResult<ScoreSurface> {
        if parallel {
            return self.surface_par(image, plan, scan);
        }
        match self {
            MatchMethod::Zncc => scan_surface::<ZnccScalar>(image, plan, scan),
            MatchMethod::Ncc => scan_surface::<NccScalar>(image, plan, scan),
            MatchMethod::SqDiffNormed => scan_surface::<SqDiffNormedScalar>(image, plan, scan),
        }
    }

    #[cfg(feature = "rayon")]
    fn surface_par(
        self,
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        scan: ScanParams,
    ) -> ScreenMatchResult<ScoreSurface> {
        match self {
            MatchMethod::Zncc => scan_surface_par::<ZnccScalar>(image, plan, scan),
            MatchMethod::Ncc => scan_surface_par::<NccScalar>(image, plan, scan),
            MatchMethod::SqDiffNormed => scan_surface_par::<SqDiffNormedScalar>(image, plan, scan),
        }
    }

    // Without rayon the parallel request falls back to the scalar fill.
    #[cfg(not(feature = "rayon"))]
    fn surface_par(
        self,
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        scan: ScanParams,
    ) -> ScreenMatchResult<ScoreSurface> {
        self.surface(image, plan, scan, false)
    }
}

fn fits(source: ImageView<'_, u8>, variant: &ScaledTemplate) -> bool {
    variant.width() <= source.width() && variant.height() <= source.height()
}

/// Correlates every variant of `bank` with `source` under every method.
///
/// Variants that no longer fit inside the source are skipped.
pub fn correlate_bank(
    source: ImageView<'_, u8>,
    bank: &TemplateBank,
    methods: &[MatchMethod],
    params: CorrelateParams,
) -> ScreenMatchResult<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for variant in bank.variants() {
        if !fits(source, variant) {
            trace_event!(
                "scale_skipped",
                scale = variant.scale(),
                width = variant.width(),
                height = variant.height()
            );
            continue;
        }
        for &method in methods {
            let _span = trace_span!("correlate", scale = variant.scale(), method = method.name()).entered();
            let surface = method.surface(source, variant.plan(), params.scan, params.parallel)?;
            let before = candidates.len();
            candidates.extend(surface.above(params.min_score).map(|(x, y, confidence)| Candidate {
                x,
                y,
                width: variant.width(),
                height: variant.height(),
                confidence,
                method,
                scale: variant.scale(),
            }));
            trace_event!("correlate_candidates", count = candidates.len() - before);
        }
    }
    Ok(candidates)
}

/// Builds the scaled variants of `target` and correlates them with `source`.
pub fn correlate(
    source: ImageView<'_, u8>,
    target: ImageView<'_, u8>,
    scales: &[f32],
    methods: &[MatchMethod],
    params: CorrelateParams,
) -> ScreenMatchResult<Vec<Candidate>> {
    if methods.is_empty() {
        return Err(ScreenMatchError::InvalidConfig {
            reason: "at least one match method is required",
        });
    }
    let bank = TemplateBank::build(target, scales)?;
    correlate_bank(source, &bank, methods, params)
}

#[cfg(test)]
mod tests {
    use super::{correlate, CorrelateParams};
    use crate::search::MatchMethod;
    use crate::ImageView;

    fn textured(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                ((x * 31 + y * 17 + x * y * 3) % 251) as u8
            })
            .collect()
    }

    fn crop(data: &[u8], width: usize, x0: usize, y0: usize, w: usize, h: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(w * h);
        for y in y0..y0 + h {
            out.extend_from_slice(&data[y * width + x0..y * width + x0 + w]);
        }
        out
    }

    #[test]
    fn exact_copy_is_found_by_each_method() {
        let source = textured(40, 30);
        let target = crop(&source, 40, 12, 9, 10, 8);
        let src = ImageView::from_slice(&source, 40, 30).unwrap();
        let tpl = ImageView::from_slice(&target, 10, 8).unwrap();
        let params = CorrelateParams {
            min_score: 0.999,
            ..CorrelateParams::default()
        };
        let methods = [MatchMethod::Zncc, MatchMethod::Ncc, MatchMethod::SqDiffNormed];
        let cands = correlate(src, tpl, &[1.0], &methods, params).unwrap();
        for method in methods {
            assert!(cands
                .iter()
                .any(|c| c.method == method && (c.x, c.y) == (12, 9) && c.width == 10));
        }
        assert!(cands.iter().all(|c| c.confidence >= 0.999));
    }

    #[test]
    fn oversized_scale_is_skipped() {
        let source = textured(20, 20);
        let target = crop(&source, 20, 0, 0, 20, 20);
        let src = ImageView::from_slice(&source, 20, 20).unwrap();
        let tpl = ImageView::from_slice(&target, 20, 20).unwrap();
        let params = CorrelateParams {
            min_score: 0.99,
            ..CorrelateParams::default()
        };
        let cands = correlate(src, tpl, &[1.0, 1.05], &[MatchMethod::Zncc], params).unwrap();
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].scale, 1.0);
    }

    #[test]
    fn empty_method_list_is_rejected() {
        let source = textured(8, 8);
        let src = ImageView::from_slice(&source, 8, 8).unwrap();
        assert!(correlate(src, src, &[1.0], &[], CorrelateParams::default()).is_err());
    }
}
