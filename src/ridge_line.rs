//! # Ridge-line fitting
//!
//! Overview
//! -----------------
//! A ridge-line is the straight central locus of a stellar branch in the CMD. It is
//! fitted by ordinary least squares either
//!
//! * on the points of an isochrone track ([`RidgeLineModel::from_isochrone`]), or
//! * empirically on a catalog ([`RidgeLineModel::from_catalog`]): the stars in a box
//!   of the CMD are reduced to a running mean or median over uniform bins, then the
//!   line is fitted through the non-empty bins.
//!
//! The [`FitMode`] decides which axis is the independent variable. Binning along
//! magnitude fits colour on magnitude; binning along colour usually fits magnitude on
//! colour for isochrones.
//!
//! The model is valid inside its fit `domain`; evaluation outside it extrapolates the
//! line without any physical guarantee.
use std::fmt;

use log::debug;

use crate::{
    catalog::Catalog,
    cmd_errors::CmdError,
    cmd_space::{CmdAxis, CmdPoint},
    constants::{LogAge, Metallicity, DEFAULT_RUNNING_BINS},
    fitting::{fit_line, running_statistic, BinAnchor, Statistic},
    isochrone::IsochroneTrack,
};

/// Axis pair of a linear fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum FitMode {
    /// `colour = slope · magnitude + intercept`
    #[default]
    ColorOnMagnitude,
    /// `magnitude = slope · colour + intercept`
    MagnitudeOnColor,
}

impl FitMode {
    pub fn independent(&self) -> CmdAxis {
        match self {
            FitMode::ColorOnMagnitude => CmdAxis::Magnitude,
            FitMode::MagnitudeOnColor => CmdAxis::Color,
        }
    }

    pub fn dependent(&self) -> CmdAxis {
        self.independent().other()
    }

    /// Mode whose independent variable is `axis`.
    pub fn with_independent(axis: CmdAxis) -> FitMode {
        match axis {
            CmdAxis::Magnitude => FitMode::ColorOnMagnitude,
            CmdAxis::Color => FitMode::MagnitudeOnColor,
        }
    }
}

/// Where a ridge-line comes from.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum RidgeSource {
    Isochrone {
        log_age: LogAge,
        metallicity: Metallicity,
        n_points: usize,
    },
    Empirical {
        n_stars: usize,
        n_bins: usize,
    },
    Points {
        n_points: usize,
    },
    Constant,
}

/// Configuration of the ridge-line fit.
///
/// Fields
/// -----------------
/// * `mode` – axis pair of the fit.
/// * `color_window`, `magnitude_window` – inclusive CMD box the fitted points must lie
///   in; `None` leaves the axis unbounded.
/// * `n_bins` – number of running bins of the empirical fit.
/// * `statistic` – running mean or median of the empirical fit.
/// * `anchor` – abscissa given to each running bin.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFitParams {
    pub mode: FitMode,
    pub color_window: Option<(f64, f64)>,
    pub magnitude_window: Option<(f64, f64)>,
    pub n_bins: usize,
    pub statistic: Statistic,
    pub anchor: BinAnchor,
}

impl Default for RidgeFitParams {
    fn default() -> Self {
        RidgeFitParams {
            mode: FitMode::default(),
            color_window: None,
            magnitude_window: None,
            n_bins: DEFAULT_RUNNING_BINS,
            statistic: Statistic::default(),
            anchor: BinAnchor::default(),
        }
    }
}

impl RidgeFitParams {
    pub fn builder() -> RidgeFitParamsBuilder {
        RidgeFitParamsBuilder::default()
    }

    fn in_window(&self, point: &CmdPoint) -> bool {
        let inside = |window: Option<(f64, f64)>, v: f64| {
            window.map_or(true, |(lo, hi)| v >= lo && v <= hi)
        };
        inside(self.color_window, point.color) && inside(self.magnitude_window, point.magnitude)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RidgeFitParamsBuilder {
    params: RidgeFitParams,
}

impl RidgeFitParamsBuilder {
    pub fn mode(mut self, v: FitMode) -> Self {
        self.params.mode = v;
        self
    }
    pub fn color_window(mut self, lo: f64, hi: f64) -> Self {
        self.params.color_window = Some((lo, hi));
        self
    }
    pub fn magnitude_window(mut self, lo: f64, hi: f64) -> Self {
        self.params.magnitude_window = Some((lo, hi));
        self
    }
    pub fn n_bins(mut self, v: usize) -> Self {
        self.params.n_bins = v;
        self
    }
    pub fn statistic(mut self, v: Statistic) -> Self {
        self.params.statistic = v;
        self
    }
    pub fn anchor(mut self, v: BinAnchor) -> Self {
        self.params.anchor = v;
        self
    }

    /// Validate and produce the [`RidgeFitParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * Windows must satisfy `lo <= hi` (NaN rejected).
    /// * `n_bins >= 1`.
    pub fn build(self) -> Result<RidgeFitParams, CmdError> {
        let p = &self.params;
        for (name, window) in [
            ("color_window", p.color_window),
            ("magnitude_window", p.magnitude_window),
        ] {
            if let Some((lo, hi)) = window {
                if !matches!(
                    lo.partial_cmp(&hi),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                ) {
                    return Err(CmdError::InvalidParameter(format!(
                        "{name} must satisfy lo <= hi, got ({lo}, {hi})"
                    )));
                }
            }
        }
        if p.n_bins == 0 {
            return Err(CmdError::InvalidParameter("n_bins must be >= 1".into()));
        }
        Ok(self.params)
    }
}

/// Linear relation between the two CMD axes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RidgeLineModel {
    pub mode: FitMode,
    pub slope: f64,
    pub intercept: f64,
    /// Range of the independent variable the model was fitted on.
    pub domain: (f64, f64),
    /// Residual sum of squares of the fit (0 for constant models).
    pub rss: f64,
    pub source: RidgeSource,
}

impl RidgeLineModel {
    /// Horizontal (or vertical) ridge: `value` on the other axis whatever the
    /// coordinate on `independent`.
    pub fn constant(independent: CmdAxis, value: f64) -> Self {
        RidgeLineModel {
            mode: FitMode::with_independent(independent),
            slope: 0.0,
            intercept: value,
            domain: (f64::NEG_INFINITY, f64::INFINITY),
            rss: 0.0,
            source: RidgeSource::Constant,
        }
    }

    /// Least-squares line through arbitrary CMD points.
    pub fn from_points(points: &[CmdPoint], mode: FitMode) -> Result<Self, CmdError> {
        let x: Vec<f64> = points.iter().map(|p| mode.independent().of_point(p)).collect();
        let y: Vec<f64> = points.iter().map(|p| mode.dependent().of_point(p)).collect();
        let fit = fit_line(&x, &y)?;
        Ok(RidgeLineModel {
            mode,
            slope: fit.slope,
            intercept: fit.intercept,
            domain: fit.domain,
            rss: fit.rss,
            source: RidgeSource::Points { n_points: fit.n_points },
        })
    }

    /// Fit the points of an isochrone track lying in the window of `params`.
    ///
    /// The track is expected to be already restricted to the wanted
    /// evolutionary-stage labels (see [`crate::isochrone::IsochroneQuery`]).
    ///
    /// Return
    /// ----------
    /// * The model, or [`CmdError::InsufficientData`] with fewer than two distinct
    ///   points in the window.
    pub fn from_isochrone(track: &IsochroneTrack, params: &RidgeFitParams) -> Result<Self, CmdError> {
        let points: Vec<CmdPoint> = track
            .cmd_points()
            .into_iter()
            .filter(|p| params.in_window(p))
            .collect();

        let mut model = RidgeLineModel::from_points(&points, params.mode).map_err(|err| match err {
            CmdError::InsufficientData(msg) => CmdError::InsufficientData(format!(
                "isochrone log_age={} Z={}: {msg}",
                track.log_age, track.metallicity
            )),
            other => other,
        })?;
        model.source = RidgeSource::Isochrone {
            log_age: track.log_age,
            metallicity: track.metallicity,
            n_points: points.len(),
        };
        debug!("isochrone ridge-line: {model}");
        Ok(model)
    }

    /// Empirical ridge-line of the stars of `catalog` lying in the window of `params`.
    ///
    /// Arguments
    /// -----------------
    /// * `catalog`: the observed stars
    /// * `params`: fit mode, CMD box and running-statistic configuration
    ///
    /// Return
    /// ----------
    /// * The model fitted through the non-empty running bins, or
    ///   [`CmdError::InsufficientData`] when the box holds no spread of stars or fewer
    ///   than two bins are populated.
    pub fn from_catalog(catalog: &Catalog, params: &RidgeFitParams) -> Result<Self, CmdError> {
        let (x, y): (Vec<f64>, Vec<f64>) = catalog
            .iter()
            .map(CmdPoint::from)
            .filter(|p| params.in_window(p))
            .map(|p| {
                (
                    params.mode.independent().of_point(&p),
                    params.mode.dependent().of_point(&p),
                )
            })
            .unzip();

        let bins = running_statistic(&x, &y, params.n_bins, params.statistic)?;
        let (bx, by): (Vec<f64>, Vec<f64>) = bins
            .iter()
            .map(|b| (b.abscissa(params.anchor), b.value))
            .unzip();
        let fit = fit_line(&bx, &by)?;

        let model = RidgeLineModel {
            mode: params.mode,
            slope: fit.slope,
            intercept: fit.intercept,
            domain: fit.domain,
            rss: fit.rss,
            source: RidgeSource::Empirical {
                n_stars: x.len(),
                n_bins: bins.len(),
            },
        };
        debug!(
            "empirical ridge-line from {} stars in {} bins: {model}",
            x.len(),
            bins.len()
        );
        Ok(model)
    }

    /// Dependent value at `x` on the independent axis.
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Independent value at which the model reaches `y`, `None` for a constant model.
    pub fn inverse(&self, y: f64) -> Option<f64> {
        (self.slope != 0.0).then(|| (y - self.intercept) / self.slope)
    }

    /// Point of the ridge-line at coordinate `x` of the independent axis.
    pub fn point_at(&self, x: f64) -> CmdPoint {
        CmdPoint::from_axes(self.mode.independent(), x, self.eval(x))
    }

    /// Derivative `d(other axis) / d(along)` of the ridge-line.
    ///
    /// `None` when the ridge-line is parallel to the `along` direction's normal, i.e.
    /// a constant model differentiated along its dependent axis.
    pub fn derivative(&self, along: CmdAxis) -> Option<f64> {
        if along == self.mode.independent() {
            Some(self.slope)
        } else if self.slope != 0.0 {
            Some(1.0 / self.slope)
        } else {
            None
        }
    }

    /// Same line expressed with the other axis as independent variable.
    pub fn inverted(&self) -> Result<Self, CmdError> {
        if self.slope == 0.0 {
            return Err(CmdError::DegenerateVector(
                "a constant ridge-line cannot be inverted".into(),
            ));
        }
        let (lo, hi) = (self.eval(self.domain.0), self.eval(self.domain.1));
        Ok(RidgeLineModel {
            mode: FitMode::with_independent(self.mode.dependent()),
            slope: 1.0 / self.slope,
            intercept: -self.intercept / self.slope,
            domain: if lo <= hi { (lo, hi) } else { (hi, lo) },
            ..*self
        })
    }

    /// `n` evenly spaced points over the fit domain, for drawing.
    pub fn sample(&self, n: usize) -> Vec<CmdPoint> {
        let (lo, hi) = self.domain;
        if n == 0 || !(lo.is_finite() && hi.is_finite()) {
            return Vec::new();
        }
        if n == 1 {
            return vec![self.point_at(0.5 * (lo + hi))];
        }
        let step = (hi - lo) / (n - 1) as f64;
        (0..n).map(|i| self.point_at(lo + i as f64 * step)).collect()
    }
}

impl fmt::Display for RidgeLineModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (dep, indep) = match self.mode {
            FitMode::ColorOnMagnitude => ("color", "mag"),
            FitMode::MagnitudeOnColor => ("mag", "color"),
        };
        write!(
            f,
            "{dep} = {:.4} * {indep} {:+.4} on [{:.3}, {:.3}]",
            self.slope, self.intercept, self.domain.0, self.domain.1
        )
    }
}
