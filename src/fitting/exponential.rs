//! Exponential growth model fitted with Levenberg–Marquardt.
//!
//! Photometric uncertainties grow roughly exponentially toward faint magnitudes:
//!
//! ```text
//! sigma(m) = a · exp((m - pivot) / tau)
//! ```
//!
//! The model is written around a `pivot` (the mean of the reference values) so that
//! the amplitude stays of order of the data even for magnitudes around 25, where
//! `exp(m / tau)` alone would be badly scaled.
//!
//! The starting point comes from a straight-line fit of `ln(sigma)` against `m`
//! (exact for noiseless data), then Levenberg–Marquardt refines it on the linear
//! residuals.
use nalgebra::{Matrix2, Vector2};

use crate::{catalog::min_max, cmd_errors::CmdError, fitting::fit_line};

/// Tuning of the Levenberg–Marquardt iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct LevMarParams {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the relative parameter change.
    pub tolerance: f64,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Damping multiplier applied after a rejected step.
    pub lambda_up: f64,
    /// Damping multiplier applied after an accepted step.
    pub lambda_down: f64,
}

impl Default for LevMarParams {
    fn default() -> Self {
        LevMarParams {
            max_iterations: 200,
            tolerance: 1e-10,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// Fitted exponential model `a · exp((x - pivot) / tau)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ExponentialModel {
    /// Model value at `pivot`.
    pub amplitude_at_pivot: f64,
    /// e-folding scale of the growth.
    pub tau: f64,
    pub pivot: f64,
    /// Root mean square of the residuals.
    pub rms: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl ExponentialModel {
    pub fn eval(&self, x: f64) -> f64 {
        self.amplitude_at_pivot * ((x - self.pivot) / self.tau).exp()
    }

    /// Amplitude in the unshifted form `amplitude · exp(x / tau)`.
    pub fn amplitude(&self) -> f64 {
        self.amplitude_at_pivot * (-self.pivot / self.tau).exp()
    }
}

fn chi2(x: &[f64], y: &[f64], pivot: f64, p: &Vector2<f64>) -> f64 {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| {
            let r = yi - p[0] * ((xi - pivot) / p[1]).exp();
            r * r
        })
        .sum()
}

/// Fit `y = a · exp((x - pivot) / tau)` by non-linear least squares.
///
/// Arguments
/// -----------------
/// * `x`: reference values (e.g. magnitudes)
/// * `y`: measured values (e.g. magnitude uncertainties), strictly positive for the
///   initial guess; non-positive and non-finite points are ignored
/// * `params`: Levenberg–Marquardt tuning
///
/// Return
/// ----------
/// * The fitted model, or [`CmdError::InsufficientData`] with fewer than three usable
///   points or no spread in `x`.
pub fn fit_exponential(
    x: &[f64],
    y: &[f64],
    params: &LevMarParams,
) -> Result<ExponentialModel, CmdError> {
    if x.len() != y.len() {
        return Err(CmdError::InvalidParameter(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(xi, yi)| xi.is_finite() && yi.is_finite() && **yi > 0.0)
        .map(|(xi, yi)| (*xi, *yi))
        .unzip();

    if xs.len() < 3 {
        return Err(CmdError::InsufficientData(format!(
            "an exponential fit needs at least 3 positive points, got {}",
            xs.len()
        )));
    }
    match min_max(xs.iter().copied()) {
        Some((lo, hi)) if hi > lo => {}
        _ => {
            return Err(CmdError::InsufficientData(
                "an exponential fit needs a spread in the reference values".into(),
            ))
        }
    }

    let pivot = xs.iter().sum::<f64>() / xs.len() as f64;
    let shifted: Vec<f64> = xs.iter().map(|v| v - pivot).collect();
    let log_y: Vec<f64> = ys.iter().map(|v| v.ln()).collect();
    let guess = fit_line(&shifted, &log_y)?;

    // flat errors: start from a very slow growth instead of an infinite scale
    let rate = if guess.slope.abs() < 1e-12 {
        1e-12
    } else {
        guess.slope
    };
    let mut p = Vector2::new(guess.intercept.exp(), 1.0 / rate);

    let mut lambda = params.initial_lambda;
    let mut current = chi2(&xs, &ys, pivot, &p);
    let scale: f64 = ys.iter().map(|v| v * v).sum();
    let mut converged = current <= 1e-24 * scale;
    let mut iterations = 0;

    while !converged && iterations < params.max_iterations {
        iterations += 1;

        let mut jtj = Matrix2::<f64>::zeros();
        let mut jtr = Vector2::<f64>::zeros();
        for (dx, yi) in shifted.iter().zip(&ys) {
            let e = (dx / p[1]).exp();
            let model = p[0] * e;
            let j = Vector2::new(e, -model * dx / (p[1] * p[1]));
            jtj += j * j.transpose();
            jtr += j * (yi - model);
        }

        let mut damped = jtj;
        for i in 0..2 {
            damped[(i, i)] *= 1.0 + lambda;
        }

        let Some(inverse) = damped.try_inverse() else {
            break;
        };
        let delta = inverse * jtr;
        let candidate = p + delta;
        let change = delta
            .component_div(&p.map(|v| v.abs().max(f64::MIN_POSITIVE)))
            .amax();

        let trial = chi2(&xs, &ys, pivot, &candidate);
        if candidate[1] != 0.0 && trial.is_finite() && trial <= current {
            p = candidate;
            current = trial;
            lambda *= params.lambda_down;
            converged = change < params.tolerance;
        } else if change < params.tolerance {
            // the step is below the tolerance and rounding prevents any further decrease
            converged = true;
        } else {
            lambda *= params.lambda_up;
            if lambda > 1e12 {
                break;
            }
        }
    }

    if !converged {
        log::warn!(
            "exponential fit stopped after {iterations} iterations without converging (chi2 = {current:e})"
        );
    }

    Ok(ExponentialModel {
        amplitude_at_pivot: p[0],
        tau: p[1],
        pivot,
        rms: (current / xs.len() as f64).sqrt(),
        iterations,
        converged,
    })
}

#[cfg(test)]
mod exponential_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recover_noiseless_model() {
        let x: Vec<f64> = (0..33).map(|i| 20.0 + 0.25 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|m| 0.002 * ((m - 22.0) / 1.3).exp()).collect();

        let model = fit_exponential(&x, &y, &LevMarParams::default()).unwrap();
        assert!(model.converged);
        assert_relative_eq!(model.tau, 1.3, max_relative = 1e-8);
        assert_relative_eq!(model.eval(22.0), 0.002, max_relative = 1e-8);
        assert_relative_eq!(model.eval(27.5), y[30], max_relative = 1e-8);
        assert_relative_eq!(
            model.amplitude(),
            0.002 * (-22.0f64 / 1.3).exp(),
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_noisy_model() {
        let x: Vec<f64> = (0..200).map(|i| 21.0 + 0.03 * i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, m)| 0.01 * ((m - 24.0) / 1.1).exp() * (1.0 + 0.05 * (i as f64).sin()))
            .collect();

        let model = fit_exponential(&x, &y, &LevMarParams::default()).unwrap();
        assert_relative_eq!(model.tau, 1.1, max_relative = 0.05);
        assert_relative_eq!(model.eval(24.0), 0.01, max_relative = 0.1);
        assert!(model.rms < 0.01);
    }

    #[test]
    fn test_insufficient_points() {
        let params = LevMarParams::default();
        assert!(matches!(
            fit_exponential(&[20.0, 21.0], &[0.01, 0.02], &params),
            Err(CmdError::InsufficientData(_))
        ));
        // non-positive errors do not count
        assert!(matches!(
            fit_exponential(&[20.0, 21.0, 22.0], &[0.01, 0.0, -0.02], &params),
            Err(CmdError::InsufficientData(_))
        ));
        assert!(matches!(
            fit_exponential(&[22.0, 22.0, 22.0], &[0.01, 0.02, 0.03], &params),
            Err(CmdError::InsufficientData(_))
        ));
    }
}
