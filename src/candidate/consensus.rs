//! Consensus reduction of scored candidates.
//!
//! Candidates are put in a fixed `(scale, method, x, y)` order and then
//! partitioned greedily: the first ungrouped candidate anchors a group and
//! absorbs every ungrouped candidate whose center lies strictly closer than
//! the distance threshold to the anchor's center. This is a partition, not a
//! transitive clustering, so chains of near-miss candidates can under-merge.
//!
//! Groups smaller than the consensus minimum (never below 2) are dropped.
//! Each surviving group collapses into one [`Match`]: position and scale are
//! member means, everything else comes from the member with the highest
//! combined score (first one wins ties). Matches are returned by combined
//! score, descending, with ties kept in group order.

use crate::candidate::ScoredCandidate;
use crate::quality::MatchQuality;
use crate::search::{Match, MatchMethod};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{euclidean, mean};
use crate::util::{ScreenMatchError, ScreenMatchResult};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Weights of the combined quality score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreWeights {
    pub structural: f32,
    pub edge: f32,
    pub confidence: f32,
    pub histogram: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            structural: 0.35,
            edge: 0.25,
            confidence: 0.25,
            histogram: 0.15,
        }
    }
}

impl ScoreWeights {
    /// Fuses a confidence and its region quality into one ranking score.
    pub fn combined(&self, confidence: f32, quality: &MatchQuality) -> f32 {
        self.structural * quality.structural_similarity
            + self.edge * quality.edge_similarity
            + self.confidence * confidence
            + self.histogram * quality.histogram_similarity
    }

    /// Rejects negative or non-finite weights.
    pub fn validate(&self) -> ScreenMatchResult<()> {
        let all = [self.structural, self.edge, self.confidence, self.histogram];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "score weights must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Configuration for consensus reduction.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusConfig {
    /// Maximum center-to-center distance (exclusive) for grouping, in pixels.
    pub distance_threshold: f32,
    /// Minimum group size; values below 2 are treated as 2.
    pub min_consensus: usize,
    /// Also require at least two distinct methods per group.
    pub require_distinct_methods: bool,
    /// Combined score weights.
    pub weights: ScoreWeights,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 20.0,
            min_consensus: 2,
            require_distinct_methods: false,
            weights: ScoreWeights::default(),
        }
    }
}

impl ConsensusConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> ScreenMatchResult<()> {
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "distance_threshold must be finite and non-negative",
            });
        }
        self.weights.validate()
    }

    fn min_members(&self) -> usize {
        self.min_consensus.max(2)
    }
}

fn grouping_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    let (a, b) = (&a.candidate, &b.candidate);
    a.scale
        .total_cmp(&b.scale)
        .then(a.method.cmp(&b.method))
        .then(a.x.cmp(&b.x))
        .then(a.y.cmp(&b.y))
}

/// Partitions the ordered candidates around greedy anchors.
fn partition<'a>(ordered: &[&'a ScoredCandidate], threshold: f32) -> Vec<Vec<&'a ScoredCandidate>> {
    let mut used = vec![false; ordered.len()];
    let mut groups = Vec::new();
    for i in 0..ordered.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let anchor = ordered[i].candidate.center();
        let mut group = vec![ordered[i]];
        for j in (i + 1)..ordered.len() {
            if !used[j] && euclidean(anchor, ordered[j].candidate.center()) < threshold {
                used[j] = true;
                group.push(ordered[j]);
            }
        }
        groups.push(group);
    }
    groups
}

fn distinct_methods(group: &[&ScoredCandidate]) -> usize {
    group
        .iter()
        .map(|m| m.candidate.method)
        .collect::<BTreeSet<MatchMethod>>()
        .len()
}

/// Collapses one group; `None` only for an empty group.
fn collapse(group: &[&ScoredCandidate], weights: &ScoreWeights) -> Option<Match> {
    let first = group.first()?;
    let mut best = *first;
    let mut best_score = weights.combined(first.candidate.confidence, &first.quality);
    for member in &group[1..] {
        let score = weights.combined(member.candidate.confidence, &member.quality);
        if score > best_score {
            best = *member;
            best_score = score;
        }
    }

    let x = mean(group.iter().map(|m| m.candidate.x as f32))?;
    let y = mean(group.iter().map(|m| m.candidate.y as f32))?;
    let scale = mean(group.iter().map(|m| m.candidate.scale))?;
    Some(Match {
        x,
        y,
        width: best.candidate.width,
        height: best.candidate.height,
        confidence: best.candidate.confidence,
        method: best.candidate.method,
        scale,
        quality: best.quality,
        consensus_count: group.len(),
        score: best_score,
    })
}

/// Reduces scored candidates to ranked consensus matches.
pub fn reduce(candidates: &[ScoredCandidate], cfg: &ConsensusConfig) -> Vec<Match> {
    let _span = trace_span!("reduce", candidates = candidates.len()).entered();

    let mut ordered: Vec<&ScoredCandidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| grouping_order(a, b));

    let groups = partition(&ordered, cfg.distance_threshold);
    let min_members = cfg.min_members();
    let mut matches: Vec<Match> = groups
        .iter()
        .filter(|group| group.len() >= min_members)
        .filter(|group| !cfg.require_distinct_methods || distinct_methods(group) >= 2)
        .filter_map(|group| collapse(group, &cfg.weights))
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    trace_event!("reduce_done", groups = groups.len(), matches = matches.len());
    matches
}
