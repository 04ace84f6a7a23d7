//! # Photometric error model
//!
//! Colour and magnitude uncertainties of a catalog are fitted as exponential
//! functions of the magnitude (see [`crate::fitting::exponential`]). The models give
//! representative error bars at any magnitude, independent of individual stars.
use log::debug;

use crate::{
    catalog::Catalog,
    cmd_errors::CmdError,
    constants::{Magnitude, ERROR_BAR_STEP},
    fitting::exponential::{fit_exponential, ExponentialModel, LevMarParams},
};

/// Synthetic error bar at one magnitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ErrorBar {
    pub magnitude: Magnitude,
    pub color_error: f64,
    pub magnitude_error: f64,
}

/// Exponential models of the colour and magnitude errors against magnitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CatalogErrorModel {
    pub color: ExponentialModel,
    pub magnitude: ExponentialModel,
    /// Magnitude range of the fitted stars.
    pub domain: (Magnitude, Magnitude),
}

impl CatalogErrorModel {
    /// Fit both error models on the stars of `catalog`.
    ///
    /// The colour error of each star is expected to be `sqrt(e_blue² + e_red²)`, as
    /// built by [`crate::catalog::PhotometryTable::to_catalog`].
    ///
    /// Return
    /// ----------
    /// * The models, or [`CmdError::InsufficientData`] with fewer than three usable
    ///   stars or no spread in magnitude.
    pub fn fit(catalog: &Catalog, params: &LevMarParams) -> Result<Self, CmdError> {
        let mags = catalog.magnitudes();
        let color_err: Vec<f64> = catalog.iter().map(|s| s.color_error).collect();
        let mag_err: Vec<f64> = catalog.iter().map(|s| s.magnitude_error).collect();

        let color = fit_exponential(&mags, &color_err, params)?;
        let magnitude = fit_exponential(&mags, &mag_err, params)?;
        let domain = catalog
            .magnitude_range()
            .ok_or_else(|| CmdError::InsufficientData("empty catalog".into()))?;

        debug!(
            "error model: color tau={:.3} ({} it), magnitude tau={:.3} ({} it)",
            color.tau, color.iterations, magnitude.tau, magnitude.iterations
        );
        Ok(CatalogErrorModel {
            color,
            magnitude,
            domain,
        })
    }

    pub fn at(&self, magnitude: Magnitude) -> ErrorBar {
        ErrorBar {
            magnitude,
            color_error: self.color.eval(magnitude),
            magnitude_error: self.magnitude.eval(magnitude),
        }
    }

    /// Error bars every 0.5 mag from `ceil(low)` to `floor(high)` inclusive.
    pub fn error_bars(&self, low: Magnitude, high: Magnitude) -> Vec<ErrorBar> {
        let (start, stop) = (low.ceil(), high.floor());
        if !(stop >= start) {
            return Vec::new();
        }
        let n = ((stop - start) / ERROR_BAR_STEP).round() as usize + 1;
        (0..n)
            .map(|i| self.at(start + i as f64 * ERROR_BAR_STEP))
            .collect()
    }

    /// Error bars every 0.5 mag from `ceil(low)` to `ceil(high)` inclusive, so the grid
    /// covers the faintest star.
    pub fn covering_error_bars(&self, low: Magnitude, high: Magnitude) -> Vec<ErrorBar> {
        self.error_bars(low, high.ceil())
    }

    /// [`error_bars`](CatalogErrorModel::error_bars) over the fitted magnitude range.
    pub fn default_error_bars(&self) -> Vec<ErrorBar> {
        self.error_bars(self.domain.0, self.domain.1)
    }
}

#[cfg(test)]
mod error_model_test {
    use super::*;
    use crate::catalog::{FilterSet, StarRecord};
    use approx::assert_relative_eq;

    fn catalog() -> Catalog {
        let stars = (0..120)
            .map(|i| {
                let mag = 21.3 + 0.05 * i as f64;
                let e_mag = 0.01 * ((mag - 24.0) / 1.2).exp();
                let e_col = 0.015 * ((mag - 24.0) / 1.0).exp();
                StarRecord::new(1.0, mag, e_col, e_mag, 10.0, 41.0)
            })
            .collect();
        Catalog::new(FilterSet::new("f115w", "f150w"), stars)
    }

    #[test]
    fn test_fit_and_grid() {
        let model = CatalogErrorModel::fit(&catalog(), &LevMarParams::default()).unwrap();
        assert_relative_eq!(model.magnitude.tau, 1.2, max_relative = 1e-6);
        assert_relative_eq!(model.color.tau, 1.0, max_relative = 1e-6);

        let bar = model.at(24.0);
        assert_relative_eq!(bar.magnitude_error, 0.01, max_relative = 1e-6);
        assert_relative_eq!(bar.color_error, 0.015, max_relative = 1e-6);

        // magnitudes span [21.3, 27.25]
        let bars = model.default_error_bars();
        assert_eq!(bars.len(), 11);
        assert_eq!(bars[0].magnitude, 22.0);
        assert_eq!(bars[10].magnitude, 27.0);
        assert!(bars.windows(2).all(|w| w[1].magnitude_error > w[0].magnitude_error));

        let covering = model.covering_error_bars(model.domain.0, model.domain.1);
        assert_eq!(covering.len(), 13);
        assert_eq!(covering[12].magnitude, 28.0);
        assert_eq!(model.covering_error_bars(24.2, 24.8).len(), 1);
        assert_eq!(model.covering_error_bars(24.0, 24.0).len(), 1);
    }

    #[test]
    fn test_empty_grid_and_insufficient() {
        let model = CatalogErrorModel::fit(&catalog(), &LevMarParams::default()).unwrap();
        assert!(model.error_bars(24.2, 24.8).is_empty());
        assert_eq!(model.error_bars(24.0, 24.0).len(), 1);

        let few = Catalog::new(
            FilterSet::new("f115w", "f150w"),
            vec![StarRecord::new(1.0, 24.0, 0.02, 0.01, 0.0, 0.0)],
        );
        assert!(matches!(
            CatalogErrorModel::fit(&few, &LevMarParams::default()),
            Err(CmdError::InsufficientData(_))
        ));
    }
}
