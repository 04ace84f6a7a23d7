//! # Least-squares building blocks
//!
//! Numerical fits shared by the ridge-line and error-model fitters:
//!
//! * [`fit_line`] – ordinary least squares of `y = slope · x + intercept`,
//! * [`running_statistic`] – mean or median of `y` over uniform bins of `x`, used to
//!   turn a noisy stellar branch into a clean locus before fitting it,
//! * [`exponential`] – Levenberg–Marquardt fit of `y = a · exp(x / tau)`.
//!
//! All functions are pure and work on borrowed slices.
pub mod exponential;

use itertools::Itertools;

use crate::{catalog::min_max, cmd_errors::CmdError};

/// Result of an ordinary least-squares line fit.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Residual sum of squares of the fit.
    pub rss: f64,
    /// Number of points used.
    pub n_points: usize,
    /// Range `(min, max)` of the independent variable.
    pub domain: (f64, f64),
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Residual sum of squares of a line `y = slope · x + intercept` over a data set.
pub fn residual_sum_of_squares(x: &[f64], y: &[f64], slope: f64, intercept: f64) -> f64 {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| {
            let r = yi - (slope * xi + intercept);
            r * r
        })
        .sum()
}

/// Ordinary least-squares fit of `y` against `x`.
///
/// The sums are computed around the means of `x` and `y`, which keeps the
/// normal equations well conditioned for magnitudes around 20–30.
///
/// Arguments
/// -----------------
/// * `x`: independent variable
/// * `y`: dependent variable, same length as `x`
///
/// Return
/// ----------
/// * The fitted line, or [`CmdError::InsufficientData`] when fewer than two
///   distinct `x` values are available.
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LinearFit, CmdError> {
    if x.len() != y.len() {
        return Err(CmdError::InvalidParameter(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(CmdError::InsufficientData(format!(
            "a line fit needs at least 2 points, got {n}"
        )));
    }

    let x_mean = x.iter().sum::<f64>() / n as f64;
    let y_mean = y.iter().sum::<f64>() / n as f64;

    let (sxx, sxy) = x.iter().zip(y).fold((0.0, 0.0), |(sxx, sxy), (xi, yi)| {
        let dx = xi - x_mean;
        (sxx + dx * dx, sxy + dx * (yi - y_mean))
    });

    if !(sxx > 0.0) {
        return Err(CmdError::InsufficientData(
            "a line fit needs at least 2 distinct abscissae".into(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let domain = min_max(x.iter().copied()).unwrap_or((x_mean, x_mean));

    Ok(LinearFit {
        slope,
        intercept,
        rss: residual_sum_of_squares(x, y, slope, intercept),
        n_points: n,
        domain,
    })
}

/// Statistic reduced over each running bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum Statistic {
    Mean,
    #[default]
    Median,
}

impl Statistic {
    fn reduce(&self, values: &mut [f64]) -> f64 {
        match self {
            Statistic::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Statistic::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    0.5 * (values[mid - 1] + values[mid])
                } else {
                    values[mid]
                }
            }
        }
    }
}

/// Abscissa attached to a running bin when it is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum BinAnchor {
    /// Geometric centre of the bin.
    Center,
    /// Same statistic as the ordinate, taken over the abscissae of the bin members.
    #[default]
    Statistic,
}

/// One non-empty bin of a running statistic.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RunningBin {
    /// Geometric centre of the bin on the independent axis.
    pub center: f64,
    /// Statistic of the independent values of the members.
    pub location: f64,
    /// Statistic of the dependent values of the members.
    pub value: f64,
    pub count: usize,
}

impl RunningBin {
    pub fn abscissa(&self, anchor: BinAnchor) -> f64 {
        match anchor {
            BinAnchor::Center => self.center,
            BinAnchor::Statistic => self.location,
        }
    }
}

/// Running mean or median of `y` over `nbins` uniform bins of `x`.
///
/// The bins cover `[min(x), max(x)]`; the last one is closed so that the maximum
/// falls inside it. Empty bins are not reported.
///
/// Arguments
/// -----------------
/// * `x`: independent variable
/// * `y`: dependent variable
/// * `nbins`: number of uniform bins (≥ 1)
/// * `statistic`: mean or median
///
/// Return
/// ----------
/// * The non-empty bins in increasing `x` order, or [`CmdError::InsufficientData`]
///   if `x` has no spread.
pub fn running_statistic(
    x: &[f64],
    y: &[f64],
    nbins: usize,
    statistic: Statistic,
) -> Result<Vec<RunningBin>, CmdError> {
    if nbins == 0 {
        return Err(CmdError::InvalidParameter("nbins must be >= 1".into()));
    }
    if x.len() != y.len() {
        return Err(CmdError::InvalidParameter(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let (lo, hi) = min_max(x.iter().copied())
        .ok_or_else(|| CmdError::InsufficientData("running statistic of an empty set".into()))?;
    if !(hi > lo) {
        return Err(CmdError::InsufficientData(
            "running statistic needs a spread in the independent variable".into(),
        ));
    }

    let width = (hi - lo) / nbins as f64;
    let groups = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let k = (((xi - lo) / width).floor() as usize).min(nbins - 1);
            (k, (*xi, *yi))
        })
        .into_group_map();

    let bins = groups
        .into_iter()
        .sorted_by_key(|(k, _)| *k)
        .map(|(k, members)| {
            let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = members.into_iter().unzip();
            RunningBin {
                center: lo + (k as f64 + 0.5) * width,
                location: statistic.reduce(&mut xs),
                value: statistic.reduce(&mut ys),
                count: ys.len(),
            }
        })
        .collect();

    Ok(bins)
}
