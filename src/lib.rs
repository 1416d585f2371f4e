//! ScreenMatch finds a small reference image inside a screen capture and
//! reports de-duplicated, quality-annotated matches.
//!
//! A search runs four stages: contrast normalization of both images,
//! multi-scale multi-method correlation, per-candidate quality scoring, and
//! consensus reduction that only keeps locations confirmed by at least two
//! independent observations. Row-parallel correlation is available via the
//! `rayon` feature, structured logging via `tracing`, and file IO plus
//! annotated debug images via `image-io`.

pub mod candidate;
pub mod debug;
pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod preprocess;
pub mod quality;
pub mod search;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use candidate::consensus::{ConsensusConfig, ScoreWeights};
pub use debug::DebugSink;
#[cfg(feature = "image-io")]
pub use debug::AnnotatedImageSink;
pub use crate::image::{ImageView, OwnedImage};
pub use preprocess::{PreprocessConfig, Preprocessor};
pub use quality::{MatchQuality, QualityConfig};
pub use search::{Match, MatchConfig, MatchMethod, Matcher, QualityGate};
pub use util::{ScreenMatchError, ScreenMatchResult};
