//! Diagnostic output for search results.
//!
//! A [`DebugSink`] observes the source image and the final matches of every
//! search that found something. Sinks are write-only: the engine never reads
//! anything back from them.

use crate::search::Match;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

/// Receives the result of each successful search.
pub trait DebugSink: Send + Sync {
    /// Called once per search with a non-empty match list.
    fn record(&self, source: &RgbImage, matches: &[Match]);
}

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTER_RADIUS: i32 = 3;

/// Returns a copy of `source` with each match box outlined and its center
/// marked.
///
/// No text is drawn: confidence and structural similarity are not overlaid,
/// since text rendering would need a font dependency. Pair the image with the
/// [`Match`] list when those values are needed.
pub fn annotate(source: &RgbImage, matches: &[Match]) -> RgbImage {
    let mut canvas = source.clone();
    for m in matches {
        let width = m.width.max(1) as u32;
        let height = m.height.max(1) as u32;
        let rect = Rect::at(m.x.round() as i32, m.y.round() as i32).of_size(width, height);
        draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        let (cx, cy) = m.center();
        draw_filled_circle_mut(
            &mut canvas,
            (cx.round() as i32, cy.round() as i32),
            CENTER_RADIUS,
            CENTER_COLOR,
        );
    }
    canvas
}

#[cfg(feature = "image-io")]
pub use annotated::AnnotatedImageSink;

#[cfg(feature = "image-io")]
mod annotated {
    use super::{annotate, DebugSink};
    use crate::image::io::save_rgb_image;
    use crate::search::Match;
    use crate::trace::trace_warn;
    use image::RgbImage;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Writes an annotated PNG per search into a directory.
    ///
    /// Files are numbered `matches_0000.png`, `matches_0001.png`, ... in
    /// search order. Write failures are logged and otherwise ignored.
    ///
    /// Images carry boxes and center dots only (see [`annotate`]); the
    /// per-match confidence and structural similarity are not rendered as
    /// text.
    pub struct AnnotatedImageSink {
        dir: PathBuf,
        counter: AtomicUsize,
    }

    impl AnnotatedImageSink {
        /// Creates a sink writing into `dir`, which must already exist.
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self {
                dir: dir.into(),
                counter: AtomicUsize::new(0),
            }
        }

        /// Returns the number of images attempted so far.
        pub fn written(&self) -> usize {
            self.counter.load(Ordering::Relaxed)
        }
    }

    impl DebugSink for AnnotatedImageSink {
        fn record(&self, source: &RgbImage, matches: &[Match]) {
            let index = self.counter.fetch_add(1, Ordering::Relaxed);
            let path = self.dir.join(format!("matches_{index:04}.png"));
            if let Err(err) = save_rgb_image(&annotate(source, matches), &path) {
                trace_warn!("failed to write debug image {}: {err}", path.display());
            }
        }
    }
}
