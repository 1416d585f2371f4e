//! Template plan precomputation for the correlation kernels.

use crate::image::ImageView;

/// Precomputed template statistics shared by all correlation kernels.
///
/// Holds the raw intensities (for NCC and normalized squared difference) and
/// the zero-mean intensities (for ZNCC), together with the template energy
/// `sum(t^2)` and centered energy `sum((t - mean)^2)`.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f64,
    values: Vec<f64>,
    zero_mean: Vec<f64>,
    energy: f64,
    var_t: f64,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> Self {
        let width = tpl.width();
        let height = tpl.height();
        let count = width * height;

        let mut values = Vec::with_capacity(count);
        for row in tpl.rows() {
            values.extend(row.iter().map(|&v| f64::from(v)));
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let zero_mean: Vec<f64> = values.iter().map(|&v| v - mean).collect();
        let energy = values.iter().map(|&v| v * v).sum();
        let var_t = zero_mean.iter().map(|&v| v * v).sum();

        Self {
            width,
            height,
            mean,
            values,
            zero_mean,
            energy,
            var_t,
        }
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of template pixels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the plan holds no pixels (never for a built plan).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the mean template intensity.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the raw intensities in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the zero-mean intensities in row-major order.
    pub fn zero_mean(&self) -> &[f64] {
        &self.zero_mean
    }

    /// Returns `sum(t^2)`.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Returns `sum((t - mean)^2)`.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }
}

#[cfg(test)]
mod tests {
    use super::TemplatePlan;
    use crate::image::ImageView;

    #[test]
    fn plan_statistics_match_definition() {
        let data = [10u8, 20, 30, 40];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(view);
        assert_eq!(plan.len(), 4);
        assert!((plan.mean() - 25.0).abs() < 1e-12);
        assert!((plan.energy() - 3000.0).abs() < 1e-9);
        assert!((plan.var_t() - 500.0).abs() < 1e-9);
        assert!((plan.zero_mean().iter().sum::<f64>()).abs() < 1e-12);
    }
}
