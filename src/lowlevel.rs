//! Low-level building blocks for custom matching pipelines.
//!
//! Each search stage is exposed as a plain function so callers can run,
//! inspect or replace stages individually. Most users should prefer
//! [`Matcher`](crate::Matcher).

pub use crate::candidate::consensus::reduce;
pub use crate::candidate::{Candidate, ScoredCandidate};
pub use crate::debug::annotate;
pub use crate::image::{owned_from_gray_image, to_gray, view_from_gray_image};
pub use crate::kernel::scalar::{scan_surface, NccScalar, SqDiffNormedScalar, ZnccScalar};
#[cfg(feature = "rayon")]
pub use crate::kernel::rayon::scan_surface_par;
pub use crate::kernel::{Kernel, ScanParams, ScoreSurface};
pub use crate::preprocess::preprocess;
pub use crate::quality::score;
pub use crate::search::correlate::{correlate, correlate_bank, CorrelateParams};
pub use crate::search::score_candidates;
pub use crate::template::scale::{scale_u8_cubic, scaled_size};
pub use crate::template::{ScaledTemplate, TemplateBank, TemplatePlan};
