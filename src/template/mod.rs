//! Scaled template variants for multi-scale correlation.
//!
//! Building the scaled variants once per search amortizes the resampling and
//! plan statistics across every correlation method.

use crate::image::{ImageView, OwnedImage};
use crate::util::{ScreenMatchError, ScreenMatchResult};

mod plan;
pub mod scale;

pub use plan::TemplatePlan;

/// One preprocessed template resampled to a single scale.
pub struct ScaledTemplate {
    scale: f32,
    img: OwnedImage,
    plan: TemplatePlan,
}

impl ScaledTemplate {
    /// Resamples `tpl` by `scale` and precomputes its plan.
    pub fn build(tpl: ImageView<'_, u8>, scale: f32) -> ScreenMatchResult<Self> {
        let img = scale::scale_u8_cubic(tpl, scale)?;
        let plan = TemplatePlan::from_view(img.view());
        Ok(Self { scale, img, plan })
    }

    /// Returns the scale factor relative to the original target.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the resampled template.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Returns the precomputed kernel statistics.
    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }
}

/// The set of scaled variants used by one search, in configuration order.
pub struct TemplateBank {
    variants: Vec<ScaledTemplate>,
}

impl TemplateBank {
    /// Builds one variant per scale.
    pub fn build(tpl: ImageView<'_, u8>, scales: &[f32]) -> ScreenMatchResult<Self> {
        if scales.is_empty() {
            return Err(ScreenMatchError::InvalidConfig {
                reason: "at least one scale is required",
            });
        }
        let variants = scales
            .iter()
            .map(|&scale| ScaledTemplate::build(tpl, scale))
            .collect::<ScreenMatchResult<Vec<_>>>()?;
        Ok(Self { variants })
    }

    /// Returns the variants in configuration order.
    pub fn variants(&self) -> &[ScaledTemplate] {
        &self.variants
    }

    /// Returns the number of variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns `true` if the bank holds no variants.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
