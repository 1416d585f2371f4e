//! Raw correlation hits and their reduction into consensus matches.
//!
//! A [`Candidate`] is one placement that cleared the floor for one
//! (scale, method) pair. Nothing is deduplicated before the consensus stage,
//! which groups candidates across every scale and method jointly.

pub mod consensus;

use crate::quality::MatchQuality;
use crate::search::MatchMethod;

/// A single raw correlation hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Top-left x in source pixels.
    pub x: usize,
    /// Top-left y in source pixels.
    pub y: usize,
    /// Width of the scaled target.
    pub width: usize,
    /// Height of the scaled target.
    pub height: usize,
    /// Normalized correlation score, higher is better.
    pub confidence: f32,
    /// Method that produced the hit.
    pub method: MatchMethod,
    /// Target scale that produced the hit.
    pub scale: f32,
}

impl Candidate {
    /// Returns the box center in source pixels.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Returns the `(x, y, width, height)` region key.
    pub fn region(&self) -> (usize, usize, usize, usize) {
        (self.x, self.y, self.width, self.height)
    }
}

/// A candidate annotated with the quality of its source region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub quality: MatchQuality,
}

impl ScoredCandidate {
    /// Pairs a candidate with its quality.
    pub fn new(candidate: Candidate, quality: MatchQuality) -> Self {
        Self { candidate, quality }
    }
}
