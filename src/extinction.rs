//! # Reddening geometry
//!
//! Interstellar dust dims a star by `A_λ = c_λ · A_V` in each band, so in a CMD with
//! colour `F1 - F2` and magnitude `F3` a star moves along the direction
//!
//! ```text
//! (Δcolour, Δmagnitude) = ((c1 - c2) · A_V, c3 · A_V)
//! ```
//!
//! whose angle `theta = atan(c3 / (c1 - c2))` does not depend on `A_V`.
//!
//! The coefficients `c_λ = A_λ / A_V` come from an [`ExtinctionTable`] passed in by the
//! caller; [`ExtinctionTable::jwst_hst`] provides the usual HST/WFC3, ACS and
//! JWST/NIRCam values.
//!
//! [`ShearMode`] selects the slope given to the partitioner: the reddening slope,
//! or a slope derived from the ridge-line.
use std::{collections::HashMap, fmt};

use crate::{
    catalog::FilterSet,
    cmd_errors::CmdError,
    cmd_space::CmdAxis,
    conversion::normalize_filter,
    ridge_line::RidgeLineModel,
};

/// Mapping filter token → `A_filter / A_V` (case-insensitive tokens).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtinctionTable {
    coefficients: HashMap<String, f64>,
}

impl ExtinctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// HST (WFC3/UVIS, ACS/WFC) and JWST/NIRCam wide-band coefficients.
    pub fn jwst_hst() -> Self {
        [
            ("f275w", 2.02499),
            ("f336w", 1.67536),
            ("f435w", 1.33879),
            ("f438w", 1.34148),
            ("f555w", 1.03065),
            ("f606w", 0.90941),
            ("f814w", 0.59845),
            ("f115w", 0.419),
            ("f150w", 0.287),
            ("f200w", 0.195),
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, filter: &str, coefficient: f64) -> Self {
        self.insert(filter, coefficient);
        self
    }

    pub fn insert(&mut self, filter: &str, coefficient: f64) {
        self.coefficients
            .insert(normalize_filter(filter), coefficient);
    }

    /// `A_filter / A_V`, or [`CmdError::UnknownFilter`].
    pub fn coefficient(&self, filter: &str) -> Result<f64, CmdError> {
        self.coefficients
            .get(&normalize_filter(filter))
            .copied()
            .ok_or_else(|| CmdError::UnknownFilter(format!("{filter} (no extinction coefficient)")))
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ExtinctionTable {
    fn from_iter<T: IntoIterator<Item = (&'a str, f64)>>(iter: T) -> Self {
        let mut table = ExtinctionTable::new();
        for (filter, coefficient) in iter {
            table.insert(filter, coefficient);
        }
        table
    }
}

/// Extinction in magnitudes in the three CMD filters.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct BandExtinction {
    pub blue: f64,
    pub red: f64,
    pub magnitude: f64,
}

impl BandExtinction {
    /// `A_filter = c_filter · A_V` for each filter of `filters`.
    pub fn from_table(table: &ExtinctionTable, filters: &FilterSet, av: f64) -> Result<Self, CmdError> {
        Ok(BandExtinction {
            blue: table.coefficient(&filters.blue)? * av,
            red: table.coefficient(&filters.red)? * av,
            magnitude: table.coefficient(&filters.magnitude)? * av,
        })
    }

    /// Colour excess `A_blue - A_red`.
    pub fn color_excess(&self) -> f64 {
        self.blue - self.red
    }
}

/// Extinction configuration.
///
/// Fields
/// -----------------
/// * `filters` – CMD filters the vector is built for.
/// * `av` – foreground extinction `A_V` applied to the isochrones (mag).
/// * `arrow_av` – `A_V` represented by the reddening arrow (mag).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtinctionParams {
    pub filters: FilterSet,
    pub av: f64,
    pub arrow_av: f64,
}

impl Default for ExtinctionParams {
    fn default() -> Self {
        ExtinctionParams {
            filters: FilterSet::new("f115w", "f150w"),
            av: 0.19,
            arrow_av: 3.0,
        }
    }
}

impl ExtinctionParams {
    pub fn builder() -> ExtinctionParamsBuilder {
        ExtinctionParamsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtinctionParamsBuilder {
    params: ExtinctionParams,
}

impl ExtinctionParamsBuilder {
    pub fn filters(mut self, v: FilterSet) -> Self {
        self.params.filters = v;
        self
    }
    pub fn av(mut self, v: f64) -> Self {
        self.params.av = v;
        self
    }
    pub fn arrow_av(mut self, v: f64) -> Self {
        self.params.arrow_av = v;
        self
    }

    /// Validate and produce the [`ExtinctionParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `av >= 0` and finite.
    /// * `arrow_av >= 0` and finite.
    pub fn build(self) -> Result<ExtinctionParams, CmdError> {
        let p = &self.params;
        if !(p.av >= 0.0 && p.av.is_finite()) {
            return Err(CmdError::InvalidParameter(
                "av must be finite and >= 0".into(),
            ));
        }
        if !(p.arrow_av >= 0.0 && p.arrow_av.is_finite()) {
            return Err(CmdError::InvalidParameter(
                "arrow_av must be finite and >= 0".into(),
            ));
        }
        Ok(self.params)
    }
}

/// Reddening direction in the CMD of one filter set.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ExtinctionVector {
    /// Angle of the reddening direction from the colour axis (radians).
    pub theta: f64,
    /// `tan(theta)`: magnitude change per unit colour change.
    pub slope: f64,
    /// Coefficients `A_filter / A_V` of the three filters.
    pub coefficients: BandExtinction,
    /// Extinction for the configured `A_V`.
    pub extinction: BandExtinction,
    /// Arrow components `(Δcolour, Δmagnitude)` for the configured `arrow_av`.
    pub arrow: (f64, f64),
}

impl ExtinctionVector {
    /// Build the reddening vector of a filter set.
    ///
    /// Arguments
    /// -----------------
    /// * `table`: injected extinction coefficients
    /// * `params`: filters, `A_V` and arrow size
    ///
    /// Return
    /// ----------
    /// * The vector, [`CmdError::UnknownFilter`] if a filter has no coefficient, or
    ///   [`CmdError::DegenerateVector`] when both colour filters have exactly the same
    ///   coefficient (reddening moves stars vertically; the slope would be infinite).
    pub fn build(table: &ExtinctionTable, params: &ExtinctionParams) -> Result<Self, CmdError> {
        let coefficients = BandExtinction::from_table(table, &params.filters, 1.0)?;
        let excess = coefficients.color_excess();
        if excess == 0.0 {
            return Err(CmdError::DegenerateVector(format!(
                "{} and {} have the same extinction coefficient {}",
                params.filters.blue, params.filters.red, coefficients.blue
            )));
        }

        let slope = coefficients.magnitude / excess;
        let extinction = BandExtinction::from_table(table, &params.filters, params.av)?;
        let arrow = (excess * params.arrow_av, coefficients.magnitude * params.arrow_av);

        Ok(ExtinctionVector {
            theta: slope.atan(),
            slope,
            coefficients,
            extinction,
            arrow,
        })
    }

    /// Slope of the reddening direction as `d(axis) / d(other axis)`.
    ///
    /// Along [`CmdAxis::Magnitude`] this is [`slope`](ExtinctionVector::slope); along
    /// [`CmdAxis::Color`] its inverse, undefined when the magnitude filter has no
    /// extinction.
    pub fn slope_along(&self, axis: CmdAxis) -> Result<f64, CmdError> {
        match axis {
            CmdAxis::Magnitude => Ok(self.slope),
            CmdAxis::Color if self.coefficients.magnitude != 0.0 => {
                Ok(self.coefficients.color_excess() / self.coefficients.magnitude)
            }
            CmdAxis::Color => Err(CmdError::DegenerateVector(
                "no extinction in the magnitude filter, reddening is horizontal".into(),
            )),
        }
    }

    /// Arrow components `(Δcolour, Δmagnitude)` for an arbitrary `A_V`.
    pub fn arrow_for(&self, av: f64) -> (f64, f64) {
        (
            self.coefficients.color_excess() * av,
            self.coefficients.magnitude * av,
        )
    }
}

/// Orientation of the bounding lines of the bins.
///
/// Slopes are resolved as `d(binning axis) / d(cross axis)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub enum ShearMode {
    /// Along the reddening vector.
    #[default]
    Reddening,
    /// Perpendicular to the ridge-line.
    PerpendicularToRidge,
    /// Parallel to the ridge-line.
    ParallelToRidge,
    /// Caller supplied slope.
    Fixed(f64),
}

impl ShearMode {
    /// Resolve the shear slope for bins along `axis`.
    ///
    /// Arguments
    /// -----------------
    /// * `axis`: binning axis
    /// * `vector`: reddening vector, required for [`ShearMode::Reddening`]
    /// * `ridge`: ridge-line, used by the ridge-relative modes
    ///
    /// Return
    /// ----------
    /// * The slope, or [`CmdError::DegenerateVector`] when the requested direction is
    ///   parallel to the cross axis.
    pub fn resolve(
        &self,
        axis: CmdAxis,
        vector: Option<&ExtinctionVector>,
        ridge: &RidgeLineModel,
    ) -> Result<f64, CmdError> {
        match self {
            ShearMode::Reddening => vector
                .ok_or_else(|| {
                    CmdError::InvalidParameter("reddening shear needs an extinction vector".into())
                })?
                .slope_along(axis),
            ShearMode::ParallelToRidge => ridge.derivative(axis.other()).ok_or_else(|| {
                CmdError::DegenerateVector("ridge-line is parallel to the binning axis".into())
            }),
            ShearMode::PerpendicularToRidge => ridge
                .derivative(axis)
                .map(|d| -d)
                .ok_or_else(|| {
                    CmdError::DegenerateVector("ridge-line is parallel to the cross axis".into())
                }),
            ShearMode::Fixed(slope) if slope.is_finite() => Ok(*slope),
            ShearMode::Fixed(slope) => Err(CmdError::InvalidParameter(format!(
                "fixed shear slope must be finite, got {slope}"
            ))),
        }
    }
}

impl fmt::Display for ExtinctionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtinctionVector(theta={:.2}°, slope={:.4}, A=[{:.3}, {:.3}, {:.3}])",
            self.theta.to_degrees(),
            self.slope,
            self.extinction.blue,
            self.extinction.red,
            self.extinction.magnitude
        )
    }
}

#[cfg(test)]
mod extinction_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_table_lookup() {
        let table = ExtinctionTable::jwst_hst();
        assert_eq!(table.len(), 10);
        assert_eq!(table.coefficient("F115W").unwrap(), 0.419);
        assert_eq!(table.coefficient("f814w").unwrap(), 0.59845);
        assert!(matches!(
            table.coefficient("f090w"),
            Err(CmdError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_build_vector() {
        let params = ExtinctionParams::builder().av(0.19).arrow_av(3.0).build().unwrap();
        let v = ExtinctionVector::build(&ExtinctionTable::jwst_hst(), &params).unwrap();

        let expected = 0.287 / (0.419 - 0.287);
        assert_relative_eq!(v.slope, expected, epsilon = 1e-12);
        assert_relative_eq!(v.theta, expected.atan(), epsilon = 1e-12);
        assert_relative_eq!(v.theta.tan(), v.slope, epsilon = 1e-12);
        assert_relative_eq!(v.extinction.blue, 0.419 * 0.19, epsilon = 1e-12);
        assert_relative_eq!(v.arrow.0, (0.419 - 0.287) * 3.0, epsilon = 1e-12);
        assert_relative_eq!(v.arrow.1, 0.287 * 3.0, epsilon = 1e-12);
        assert_eq!(v.arrow_for(3.0), v.arrow);
        assert_relative_eq!(
            v.slope_along(CmdAxis::Color).unwrap(),
            1.0 / expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_degenerate_iff_equal_color_coefficients() {
        let params = ExtinctionParams::builder()
            .filters(FilterSet::new("a", "b").with_magnitude("c"))
            .build()
            .unwrap();

        let equal = ExtinctionTable::new().with("a", 1.0).with("b", 1.0).with("c", 0.5);
        assert!(matches!(
            ExtinctionVector::build(&equal, &params),
            Err(CmdError::DegenerateVector(_))
        ));

        // the magnitude filter plays no role
        let no_mag = ExtinctionTable::new().with("a", 1.0).with("b", 0.9).with("c", 0.0);
        let v = ExtinctionVector::build(&no_mag, &params).unwrap();
        assert_eq!(v.slope, 0.0);
        assert!(matches!(
            v.slope_along(CmdAxis::Color),
            Err(CmdError::DegenerateVector(_))
        ));

        // zero A_V keeps a defined direction
        let zero_av = ExtinctionParams { av: 0.0, ..params };
        let close = ExtinctionTable::new().with("a", 1.0).with("b", 1.0 - 1e-12).with("c", 0.5);
        assert!(ExtinctionVector::build(&close, &zero_av).unwrap().slope.is_finite());
    }

    #[test]
    fn test_unknown_filter() {
        let params = ExtinctionParams::builder()
            .filters(FilterSet::new("f115w", "f444w"))
            .build()
            .unwrap();
        assert!(matches!(
            ExtinctionVector::build(&ExtinctionTable::jwst_hst(), &params),
            Err(CmdError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_params_validation() {
        assert!(ExtinctionParams::builder().av(-0.1).build().is_err());
        assert!(ExtinctionParams::builder().arrow_av(f64::NAN).build().is_err());
        assert_eq!(
            ExtinctionParams::builder().build().unwrap(),
            ExtinctionParams::default()
        );
    }
}
