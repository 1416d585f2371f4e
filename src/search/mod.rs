//! The search engine: configuration, the match record and the [`Matcher`].
//!
//! One search runs preprocessing, correlation, quality scoring and consensus
//! reduction to completion on the calling thread. The matcher keeps no state
//! between searches other than the preprocessing memo cache.

pub mod correlate;

use crate::candidate::consensus::{reduce, ConsensusConfig};
use crate::candidate::{Candidate, ScoredCandidate};
use crate::debug::DebugSink;
use crate::image::{crop_rgb, to_gray};
use crate::kernel::ScanParams;
use crate::preprocess::{PreprocessConfig, Preprocessor};
use crate::quality::{self, MatchQuality, QualityConfig};
use crate::template::TemplateBank;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use correlate::{correlate_bank, CorrelateParams};
use image::RgbImage;
use std::collections::HashMap;

/// Correlation method used to build a score surface.
///
/// All methods report normalized scores where higher is better.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchMethod {
    /// Zero-mean normalized cross-correlation, in `[-1, 1]`.
    Zncc,
    /// Normalized cross-correlation without mean removal.
    Ncc,
    /// Normalized squared difference, inverted to `1 - sqdiff`.
    SqDiffNormed,
}

impl MatchMethod {
    /// Every supported method.
    pub const ALL: [MatchMethod; 3] = [MatchMethod::Zncc, MatchMethod::Ncc, MatchMethod::SqDiffNormed];

    /// Returns a short stable name.
    pub fn name(self) -> &'static str {
        match self {
            MatchMethod::Zncc => "zncc",
            MatchMethod::Ncc => "ncc",
            MatchMethod::SqDiffNormed => "sqdiff_normed",
        }
    }
}

/// A consensus match in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    /// Top-left x, averaged over the consensus group.
    pub x: f32,
    /// Top-left y, averaged over the consensus group.
    pub y: f32,
    /// Width of the best member's box.
    pub width: usize,
    /// Height of the best member's box.
    pub height: usize,
    /// Normalized correlation score of the best member.
    pub confidence: f32,
    /// Method of the best member.
    pub method: MatchMethod,
    /// Mean scale of the consensus group.
    pub scale: f32,
    /// Region quality of the best member.
    pub quality: MatchQuality,
    /// Number of candidates merged into this match.
    pub consensus_count: usize,
    /// Combined quality score used for ranking.
    pub score: f32,
}

impl Match {
    /// Returns the center x coordinate.
    pub fn center_x(&self) -> f32 {
        self.x + self.width as f32 / 2.0
    }

    /// Returns the center y coordinate.
    pub fn center_y(&self) -> f32 {
        self.y + self.height as f32 / 2.0
    }

    /// Returns the center as `(x, y)`.
    pub fn center(&self) -> (f32, f32) {
        (self.center_x(), self.center_y())
    }
}

/// Optional per-signal minimums applied to consensus matches.
///
/// Unset fields do not filter. The default gate admits everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QualityGate {
    pub min_confidence: Option<f32>,
    pub min_structural: Option<f32>,
    pub min_edge: Option<f32>,
    pub min_pixel: Option<f32>,
    pub min_histogram: Option<f32>,
}

impl QualityGate {
    /// Returns `true` if the match clears every configured minimum.
    pub fn admits(&self, m: &Match) -> bool {
        let q = &m.quality;
        let clears = |min: Option<f32>, value: f32| min.map_or(true, |min| value >= min);
        clears(self.min_confidence, m.confidence)
            && clears(self.min_structural, q.structural_similarity)
            && clears(self.min_edge, q.edge_similarity)
            && clears(self.min_pixel, q.pixel_difference)
            && clears(self.min_histogram, q.histogram_similarity)
    }

    /// Returns `true` if no minimum is configured.
    pub fn is_disabled(&self) -> bool {
        *self == Self::default()
    }
}

/// Search configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchConfig {
    /// Target scales, searched in order.
    pub scales: Vec<f32>,
    /// Correlation methods, searched in order for each scale.
    pub methods: Vec<MatchMethod>,
    /// Floor on the normalized correlation score.
    pub min_score: f32,
    /// Minimum window variance for a placement to be scored.
    pub min_var_i: f64,
    /// Fill score surfaces in parallel (requires the `rayon` feature).
    pub parallel: bool,
    pub preprocess: PreprocessConfig,
    pub quality: QualityConfig,
    pub consensus: ConsensusConfig,
    pub gate: QualityGate,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            scales: vec![0.95, 1.0, 1.05],
            methods: vec![MatchMethod::Zncc, MatchMethod::SqDiffNormed],
            min_score: 0.8,
            min_var_i: ScanParams::default().min_var_i,
            parallel: false,
            preprocess: PreprocessConfig::default(),
            quality: QualityConfig::default(),
            consensus: ConsensusConfig::default(),
            gate: QualityGate::default(),
        }
    }
}

impl MatchConfig {
    /// Checks every value range; searches refuse invalid configurations.
    pub fn validate(&self) -> ScreenMatchResult<()> {
        if self.scales.is_empty() {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "at least one scale is required",
            });
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "scales must be finite and positive",
            });
        }
        if self.methods.is_empty() {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "at least one match method is required",
            });
        }
        if !self.min_score.is_finite() {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "min_score must be finite",
            });
        }
        if !self.min_var_i.is_finite() || self.min_var_i < 0.0 {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "min_var_i must be finite and non-negative",
            });
        }
        self.quality.validate()?;
        self.consensus.validate()
    }

    fn correlate_params(&self) -> CorrelateParams {
        CorrelateParams {
            min_score: self.min_score,
            scan: ScanParams {
                min_var_i: self.min_var_i,
            },
            parallel: self.parallel,
        }
    }
}

/// Template matching engine.
///
/// Holds the configuration, the preprocessing cache and an optional
/// diagnostic sink. A matcher can be shared between threads.
pub struct Matcher {
    cfg: MatchConfig,
    preprocessor: Preprocessor,
    sink: Option<Box<dyn DebugSink>>,
}

impl Matcher {
    /// Creates a matcher with the given configuration.
    pub fn new(cfg: MatchConfig) -> Self {
        let preprocessor = Preprocessor::new(cfg.preprocess.clone());
        Self {
            cfg,
            preprocessor,
            sink: None,
        }
    }

    /// Replaces the configuration. The preprocessing cache is reset when the
    /// preprocessing settings change.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        if cfg.preprocess != *self.preprocessor.config() {
            self.preprocessor = Preprocessor::new(cfg.preprocess.clone());
        }
        self.cfg = cfg;
        self
    }

    /// Attaches a diagnostic sink that observes every non-empty result.
    pub fn with_debug_sink(mut self, sink: Box<dyn DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Finds consensus matches of `target` inside `source`.
    ///
    /// Fails only for invalid input: an empty image, a target larger than
    /// the source, or an invalid configuration. An empty list means nothing
    /// cleared the floor and consensus.
    pub fn find_matches(&self, source: &RgbImage, target: &RgbImage) -> ScreenMatchResult<Vec<Match>> {
        self.cfg.validate()?;
        check_inputs(source, target)?;
        let _span = trace_span!(
            "find_matches",
            source_width = source.width(),
            source_height = source.height(),
            target_width = target.width(),
            target_height = target.height()
        )
        .entered();

        let source_pre = self.preprocessor.preprocess(to_gray(source)?.view());
        let target_pre = self.preprocessor.preprocess(to_gray(target)?.view());

        let bank = TemplateBank::build(target_pre.view(), &self.cfg.scales)?;
        let candidates = correlate_bank(
            source_pre.view(),
            &bank,
            &self.cfg.methods,
            self.cfg.correlate_params(),
        )?;
        trace_event!("candidates", count = candidates.len());
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let scored = score_candidates(source, target, &candidates, &self.cfg.quality);
        let mut matches = reduce(&scored, &self.cfg.consensus);
        if !self.cfg.gate.is_disabled() {
            let before = matches.len();
            matches.retain(|m| self.cfg.gate.admits(m));
            trace_event!("quality_gate", rejected = before - matches.len());
        }
        trace_event!("matches", count = matches.len());

        if let Some(sink) = &self.sink {
            if !matches.is_empty() {
                sink.record(source, &matches);
            }
        }
        Ok(matches)
    }
}

fn check_inputs(source: &RgbImage, target: &RgbImage) -> ScreenMatchResult<()> {
    if source.width() == 0 || source.height() == 0 {
        return Err(ScreenMatchError::EmptyImage { which: "source" });
    }
    if target.width() == 0 || target.height() == 0 {
        return Err(ScreenMatchError::EmptyImage { which: "target" });
    }
    if target.width() > source.width() || target.height() > source.height() {
        return Err(ScreenMatchError::TargetTooLarge {
            target_width: target.width() as usize,
            target_height: target.height() as usize,
            source_width: source.width() as usize,
            source_height: source.height() as usize,
        });
    }
    Ok(())
}

/// Scores every candidate region of the color source against the target.
///
/// Candidates sharing a region share one quality computation.
pub fn score_candidates(
    source: &RgbImage,
    target: &RgbImage,
    candidates: &[Candidate],
    cfg: &QualityConfig,
) -> Vec<ScoredCandidate> {
    let _span = trace_span!("score_candidates", candidates = candidates.len()).entered();
    let mut memo: HashMap<(usize, usize, usize, usize), MatchQuality> = HashMap::new();
    let scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|&candidate| {
            let quality = *memo.entry(candidate.region()).or_insert_with(|| {
                let (x, y, w, h) = candidate.region();
                match crop_rgb(source, x, y, w, h) {
                    Ok(region) => quality::score(&region, target, cfg),
                    Err(err) => {
                        trace_warn!("candidate region unavailable, reporting zero quality: {err}");
                        MatchQuality::ZERO
                    }
                }
            });
            ScoredCandidate::new(candidate, quality)
        })
        .collect();
    trace_event!("scored_regions", regions = memo.len());
    scored
}

#[cfg(test)]
mod tests {
    use super::{Match, MatchConfig, MatchMethod, QualityGate};
    use crate::quality::MatchQuality;

    fn sample_match() -> Match {
        Match {
            x: 10.5,
            y: 4.0,
            width: 20,
            height: 9,
            confidence: 0.9,
            method: MatchMethod::Zncc,
            scale: 1.0,
            quality: MatchQuality {
                structural_similarity: 0.8,
                pixel_difference: 0.7,
                edge_similarity: 0.6,
                histogram_similarity: 0.5,
            },
            consensus_count: 3,
            score: 0.7,
        }
    }

    #[test]
    fn center_is_derived_from_box() {
        let m = sample_match();
        assert_eq!(m.center(), (20.5, 8.5));
    }

    #[test]
    fn default_gate_admits_everything() {
        let gate = QualityGate::default();
        assert!(gate.is_disabled());
        assert!(gate.admits(&sample_match()));
    }

    #[test]
    fn gate_rejects_below_minimum() {
        let gate = QualityGate {
            min_edge: Some(0.65),
            ..QualityGate::default()
        };
        assert!(!gate.admits(&sample_match()));
        let gate = QualityGate {
            min_structural: Some(0.8),
            ..QualityGate::default()
        };
        assert!(gate.admits(&sample_match()));
    }

    #[test]
    fn methods_order_by_declaration() {
        let mut methods = vec![MatchMethod::SqDiffNormed, MatchMethod::Zncc, MatchMethod::Ncc];
        methods.sort();
        assert_eq!(methods, MatchMethod::ALL.to_vec());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(MatchConfig::default().validate().is_ok());
        let bad = [
            MatchConfig {
                scales: vec![],
                ..MatchConfig::default()
            },
            MatchConfig {
                scales: vec![1.0, 0.0],
                ..MatchConfig::default()
            },
            MatchConfig {
                methods: vec![],
                ..MatchConfig::default()
            },
            MatchConfig {
                min_score: f32::NAN,
                ..MatchConfig::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err());
        }
    }
}
