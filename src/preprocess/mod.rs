//! Grayscale normalization applied to both source and target before
//! correlation.
//!
//! Preprocessing runs CLAHE (local contrast normalization against theme and
//! lighting drift) followed by a 3x3 Gaussian blur (suppresses single-pixel
//! rendering noise). It is a pure function of the input pixels and the
//! configuration. A failing step never aborts a search: the input is returned
//! unchanged and a warning is emitted.
//!
//! `Preprocessor` adds a small memo cache keyed by image content. The cache is
//! cleared wholesale once it reaches capacity and lives behind a mutex so one
//! preprocessor can serve concurrent searches.

mod blur;
mod clahe;

use crate::image::{ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::ScreenMatchResult;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use blur::gaussian_blur_3x3;

/// Configuration for the preprocessing stage.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessConfig {
    /// CLAHE clip limit relative to a flat histogram (0 disables clipping).
    pub clip_limit: f32,
    /// CLAHE tile grid as `(columns, rows)`.
    pub tile_grid: (usize, usize),
    /// Apply the 3x3 Gaussian blur after equalization.
    pub blur: bool,
    /// Maximum number of memoized images (0 disables the cache).
    pub cache_capacity: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: (8, 8),
            blur: true,
            cache_capacity: 10,
        }
    }
}

/// Runs the preprocessing steps without caching or fallback.
fn try_preprocess(
    image: ImageView<'_, u8>,
    cfg: &PreprocessConfig,
) -> ScreenMatchResult<OwnedImage> {
    let equalized = clahe::clahe(image, cfg.tile_grid, cfg.clip_limit)?;
    if !cfg.blur {
        return Ok(equalized);
    }
    gaussian_blur_3x3(equalized.view())
}

/// Preprocesses a grayscale image.
///
/// Returns a copy of the input when any step fails.
pub fn preprocess(image: ImageView<'_, u8>, cfg: &PreprocessConfig) -> OwnedImage {
    let _span = trace_span!("preprocess", width = image.width(), height = image.height()).entered();
    match try_preprocess(image, cfg) {
        Ok(out) => out,
        Err(err) => {
            trace_warn!("preprocessing failed, using unprocessed image: {err}");
            OwnedImage::from_view(image)
        }
    }
}

struct CacheEntry {
    input: OwnedImage,
    output: OwnedImage,
}

/// Memoizing wrapper around [`preprocess`].
pub struct Preprocessor {
    cfg: PreprocessConfig,
    cache: Mutex<HashMap<u64, CacheEntry>>,
}

impl Preprocessor {
    /// Creates a preprocessor with an empty cache.
    pub fn new(cfg: PreprocessConfig) -> Self {
        Self {
            cfg,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &PreprocessConfig {
        &self.cfg
    }

    /// Returns the number of memoized images.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Preprocesses an image, reusing a memoized result for identical input.
    pub fn preprocess(&self, image: ImageView<'_, u8>) -> OwnedImage {
        if self.cfg.cache_capacity == 0 {
            return preprocess(image, &self.cfg);
        }

        let key = content_key(image);
        if let Ok(cache) = self.cache.lock() {
            // Hash hits are confirmed against the stored input.
            if let Some(entry) = cache.get(&key) {
                if same_pixels(&entry.input, image) {
                    trace_event!("preprocess_cache_hit", key = key);
                    return entry.output.clone();
                }
            }
        }

        let output = preprocess(image, &self.cfg);
        match self.cache.lock() {
            Ok(mut cache) => {
                if cache.len() >= self.cfg.cache_capacity {
                    cache.clear();
                }
                cache.insert(
                    key,
                    CacheEntry {
                        input: OwnedImage::from_view(image),
                        output: output.clone(),
                    },
                );
            }
            Err(_) => {
                trace_warn!("preprocess cache lock poisoned, result not memoized");
            }
        }
        output
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

fn content_key(image: ImageView<'_, u8>) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.width().hash(&mut hasher);
    image.height().hash(&mut hasher);
    for row in image.rows() {
        row.hash(&mut hasher);
    }
    hasher.finish()
}

fn same_pixels(stored: &OwnedImage, image: ImageView<'_, u8>) -> bool {
    stored.width() == image.width()
        && stored.height() == image.height()
        && stored
            .data()
            .chunks(stored.width())
            .zip(image.rows())
            .all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::{preprocess, PreprocessConfig, Preprocessor};
    use crate::image::ImageView;

    fn pattern(width: usize, height: usize, seed: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| (((i % width) * 7 + (i / width) * 13 + seed * 31) % 251) as u8)
            .collect()
    }

    #[test]
    fn preprocess_is_deterministic() {
        let data = pattern(40, 30, 1);
        let view = ImageView::from_slice(&data, 40, 30).unwrap();
        let cfg = PreprocessConfig::default();
        assert_eq!(preprocess(view, &cfg), preprocess(view, &cfg));
    }

    #[test]
    fn invalid_config_falls_back_to_input() {
        let data = pattern(16, 16, 2);
        let view = ImageView::from_slice(&data, 16, 16).unwrap();
        let cfg = PreprocessConfig {
            tile_grid: (0, 0),
            ..PreprocessConfig::default()
        };
        assert_eq!(preprocess(view, &cfg).data(), data.as_slice());
    }

    #[test]
    fn cache_returns_same_result_as_uncached() {
        let data = pattern(32, 24, 3);
        let view = ImageView::from_slice(&data, 32, 24).unwrap();
        let pre = Preprocessor::default();
        let first = pre.preprocess(view);
        let second = pre.preprocess(view);
        assert_eq!(first, second);
        assert_eq!(first, preprocess(view, pre.config()));
        assert_eq!(pre.cached_len(), 1);
    }

    #[test]
    fn cache_is_cleared_when_full() {
        let pre = Preprocessor::new(PreprocessConfig {
            cache_capacity: 2,
            ..PreprocessConfig::default()
        });
        let images: Vec<Vec<u8>> = (0..3).map(|seed| pattern(12, 12, seed)).collect();
        for data in &images {
            let view = ImageView::from_slice(data, 12, 12).unwrap();
            pre.preprocess(view);
        }
        assert_eq!(pre.cached_len(), 1);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let pre = Preprocessor::new(PreprocessConfig {
            cache_capacity: 0,
            ..PreprocessConfig::default()
        });
        let data = pattern(12, 12, 4);
        let view = ImageView::from_slice(&data, 12, 12).unwrap();
        pre.preprocess(view);
        assert_eq!(pre.cached_len(), 0);
    }
}
