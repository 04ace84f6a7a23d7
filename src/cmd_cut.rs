//! # CMD cuts
//!
//! Overview
//! -----------------
//! End-to-end selection of stars in sheared strips of a colour-magnitude diagram.
//!
//! * [`magnitude_cut`] bins along magnitude. The strips cross the stellar branch and
//!   follow the reddening vector by default, so a star moved by differential
//!   extinction stays in its strip.
//! * [`color_cut`] bins along colour. The strips run along the branch (parallel to the
//!   ridge-line by default) and are anchored on a reference magnitude.
//!
//! Both pipelines
//! 1. build the [`ExtinctionVector`] of the catalog filters,
//! 2. fit a [`RidgeLineModel`] on an isochrone track or empirically on the catalog,
//! 3. resolve the [`ShearMode`] into one slope,
//! 4. [`partition`] the catalog.
//!
//! They return a [`CmdCut`], plain data meant to be consumed by a plotting layer.
use std::fmt;

use log::{debug, warn};

use crate::{
    catalog::Catalog,
    cmd_errors::CmdError,
    cmd_space::{CmdAxis, CmdPoint},
    constants::Magnitude,
    extinction::{ExtinctionParams, ExtinctionTable, ExtinctionVector, ShearMode},
    isochrone::IsochroneTrack,
    partition::{partition, AcrossTrack, BinningParams, Partition},
    ridge_line::{FitMode, RidgeFitParams, RidgeLineModel},
};

/// Default half width (mag of colour) of the across-track window of [`magnitude_cut`],
/// centred on the ridge-line colour of each bin.
pub const DEFAULT_COLOR_HALF_WIDTH: f64 = 0.5;
/// Default half width (mag of colour) of the colour range of [`color_cut`].
pub const DEFAULT_COLOR_HALF_RANGE: f64 = 1.0;
/// Margin (mag of colour) added to the colour range when selecting isochrone points
/// for [`color_cut`].
pub const ISOCHRONE_COLOR_MARGIN: f64 = 0.2;
/// Magnitude range of the giant branch sampled by [`color_cut`].
pub const COLOR_CUT_MAGNITUDE_RANGE: (Magnitude, Magnitude) = (22.0, 26.5);
/// Margin (mag) added to [`COLOR_CUT_MAGNITUDE_RANGE`] when selecting isochrone points
/// for [`color_cut`].
pub const ISOCHRONE_MAGNITUDE_MARGIN: f64 = 0.5;

/// Data the ridge-line is fitted on.
#[derive(Debug, Clone, Copy)]
pub enum RidgeInput<'t> {
    /// A model track, already restricted to the wanted evolutionary stages.
    Isochrone(&'t IsochroneTrack),
    /// The catalog itself, through a running statistic.
    Empirical,
}

/// Configuration of a CMD cut.
///
/// Fields
/// -----------------
/// * `ridge` – ridge-line fit configuration.
/// * `extinction` – filters, `A_V` and reddening arrow size.
/// * `shear` – orientation of the bounding lines.
/// * `range` – binning range; `None` uses `[22, 26]` mag for [`magnitude_cut`] and the
///   mean colour ± 1 for [`color_cut`].
/// * `step` – bin width.
/// * `across_track` – cross-axis window; `None` uses the ridge-line colour ± 0.5 at
///   each bin centre for [`magnitude_cut`] and no window for [`color_cut`].
/// * `reference_magnitude` – anchor magnitude of [`color_cut`]; `None` uses the mean
///   magnitude of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CmdCutParams {
    pub ridge: RidgeFitParams,
    pub extinction: ExtinctionParams,
    pub shear: ShearMode,
    pub range: Option<(f64, f64)>,
    pub step: f64,
    pub across_track: Option<AcrossTrack>,
    pub reference_magnitude: Option<Magnitude>,
}

impl Default for CmdCutParams {
    fn default() -> Self {
        CmdCutParams {
            ridge: RidgeFitParams::default(),
            extinction: ExtinctionParams::default(),
            shear: ShearMode::Reddening,
            range: None,
            step: 0.5,
            across_track: None,
            reference_magnitude: None,
        }
    }
}

impl CmdCutParams {
    pub fn builder() -> CmdCutParamsBuilder {
        CmdCutParamsBuilder::default()
    }

    /// Usual setup of [`color_cut`] on an isochrone: magnitude fitted on colour and
    /// strips parallel to the ridge-line.
    pub fn color_cut_defaults() -> Self {
        CmdCutParams {
            ridge: RidgeFitParams {
                mode: FitMode::MagnitudeOnColor,
                ..RidgeFitParams::default()
            },
            shear: ShearMode::ParallelToRidge,
            ..CmdCutParams::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CmdCutParamsBuilder {
    params: CmdCutParams,
}

impl CmdCutParamsBuilder {
    pub fn ridge(mut self, v: RidgeFitParams) -> Self {
        self.params.ridge = v;
        self
    }
    pub fn extinction(mut self, v: ExtinctionParams) -> Self {
        self.params.extinction = v;
        self
    }
    pub fn shear(mut self, v: ShearMode) -> Self {
        self.params.shear = v;
        self
    }
    pub fn range(mut self, low: f64, high: f64) -> Self {
        self.params.range = Some((low, high));
        self
    }
    pub fn step(mut self, v: f64) -> Self {
        self.params.step = v;
        self
    }
    pub fn across_track(mut self, v: AcrossTrack) -> Self {
        self.params.across_track = Some(v);
        self
    }
    pub fn reference_magnitude(mut self, v: Magnitude) -> Self {
        self.params.reference_magnitude = Some(v);
        self
    }

    /// Validate and produce the [`CmdCutParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `step > 0` and finite.
    /// * `range`, if given, finite with `low < high`.
    /// * `reference_magnitude`, if given, finite.
    pub fn build(self) -> Result<CmdCutParams, CmdError> {
        let p = &self.params;
        if !(p.step > 0.0 && p.step.is_finite()) {
            return Err(CmdError::InvalidParameter(format!(
                "step must be finite and > 0, got {}",
                p.step
            )));
        }
        if let Some((low, high)) = p.range {
            if !(low < high && low.is_finite() && high.is_finite()) {
                return Err(CmdError::InvalidParameter(format!(
                    "range must be finite with low < high, got ({low}, {high})"
                )));
            }
        }
        if p.reference_magnitude.is_some_and(|m| !m.is_finite()) {
            return Err(CmdError::InvalidParameter(
                "reference_magnitude must be finite".into(),
            ));
        }
        Ok(self.params)
    }
}

impl fmt::Display for CmdCutParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "CMD Cut Parameters")?;
            writeln!(f, "------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Ridge-line]")?;
            line!("mode             = {:?}", self.ridge.mode, "Axis pair of the fit")?;
            line!("color_window     = {:?}", self.ridge.color_window, "Colour box")?;
            line!("magnitude_window = {:?}", self.ridge.magnitude_window, "Magnitude box")?;
            line!("n_bins           = {}", self.ridge.n_bins, "Running bins (empirical)")?;
            line!("statistic        = {:?}", self.ridge.statistic, "Running statistic")?;

            writeln!(f, "\n[Extinction]")?;
            line!("filters          = {}", self.extinction.filters, "Colour / magnitude filters")?;
            line!("av               = {:.3}", self.extinction.av, "Foreground A_V")?;
            line!("arrow_av         = {:.2}", self.extinction.arrow_av, "A_V of the reddening arrow")?;

            writeln!(f, "\n[Binning]")?;
            line!("shear            = {:?}", self.shear, "Bounding-line orientation")?;
            line!("range            = {:?}", self.range, "Binning range (None = automatic)")?;
            line!("step             = {:.3}", self.step, "Bin width")?;
            line!("across_track     = {:?}", self.across_track, "Cross-axis window")?;
            line!(
                "reference_mag    = {:?}",
                self.reference_magnitude,
                "Anchor of the colour cut"
            )?;
            Ok(())
        } else {
            write!(
                f,
                "CmdCutParams(filters={}, av={:.2}, shear={:?}, range={:?}, step={:.2}, ridge={:?}/{})",
                self.extinction.filters,
                self.extinction.av,
                self.shear,
                self.range,
                self.step,
                self.ridge.mode,
                self.ridge.n_bins
            )
        }
    }
}

/// Result of a CMD cut.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CmdCut<'a> {
    pub partition: Partition<'a>,
    /// The fitted ridge-line, in its own fit mode.
    pub ridge: RidgeLineModel,
    /// Reddening vector; `None` when the filters give no colour excess and the shear
    /// does not need it.
    pub extinction: Option<ExtinctionVector>,
    /// Ridge-line points at the bin centres.
    pub ridge_points: Vec<CmdPoint>,
}

impl CmdCut<'_> {
    pub fn n_bins(&self) -> usize {
        self.partition.len()
    }
}

fn extinction_vector(
    table: &ExtinctionTable,
    params: &CmdCutParams,
) -> Result<Option<ExtinctionVector>, CmdError> {
    match ExtinctionVector::build(table, &params.extinction) {
        Ok(v) => Ok(Some(v)),
        Err(CmdError::DegenerateVector(msg)) if params.shear != ShearMode::Reddening => {
            warn!("no reddening vector: {msg}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn fit_ridge(
    catalog: &Catalog,
    input: RidgeInput<'_>,
    ridge: &RidgeFitParams,
) -> Result<RidgeLineModel, CmdError> {
    match input {
        RidgeInput::Isochrone(track) => RidgeLineModel::from_isochrone(track, ridge),
        RidgeInput::Empirical => RidgeLineModel::from_catalog(catalog, ridge),
    }
}

fn no_stars(catalog: &Catalog) -> CmdError {
    CmdError::InsufficientData(format!(
        "CMD cut of an empty catalog ({})",
        catalog.filters()
    ))
}

/// Bin a catalog along magnitude in reddening-sheared strips.
///
/// Arguments
/// -----------------
/// * `catalog`: stars of the CMD, already error- and spatially-cut
/// * `input`: isochrone track or empirical ridge-line
/// * `table`: extinction coefficients
/// * `params`: cut configuration (see [`CmdCutParams`] for the defaults)
///
/// Return
/// ----------
/// * The [`CmdCut`], or the first error of the extinction, fit or partition stages.
///
/// Remarks
/// ----------
/// * Without an explicit magnitude window, an isochrone ridge-line is fitted on the
///   track points inside the binning range widened by one step on both sides.
/// * A ridge-line fitted with [`FitMode::MagnitudeOnColor`] is inverted before
///   anchoring the strips.
pub fn magnitude_cut<'a>(
    catalog: &'a Catalog,
    input: RidgeInput<'_>,
    table: &ExtinctionTable,
    params: &CmdCutParams,
) -> Result<CmdCut<'a>, CmdError> {
    if catalog.is_empty() {
        return Err(no_stars(catalog));
    }
    let (low, high) = params.range.unwrap_or((22.0, 26.0));
    let across = params.across_track.unwrap_or(AcrossTrack::AroundRidge {
        half_width: DEFAULT_COLOR_HALF_WIDTH,
    });
    let binning = BinningParams::builder()
        .axis(CmdAxis::Magnitude)
        .range(low, high)
        .step(params.step)
        .across_track(across)
        .build()?;

    let extinction = extinction_vector(table, params)?;

    let mut ridge_params = params.ridge.clone();
    if matches!(input, RidgeInput::Isochrone(_)) && ridge_params.magnitude_window.is_none() {
        ridge_params.magnitude_window = Some((low - params.step, high + params.step));
    }
    let ridge = fit_ridge(catalog, input, &ridge_params)?;
    let anchor = match ridge.mode.independent() {
        CmdAxis::Magnitude => ridge,
        CmdAxis::Color => ridge.inverted()?,
    };

    let shear = params
        .shear
        .resolve(CmdAxis::Magnitude, extinction.as_ref(), &ridge)?;
    debug!("magnitude cut: shear dmag/dcolor = {shear:.4}, ridge {ridge}");

    let partition = partition(catalog, &anchor, shear, &binning)?;
    let ridge_points = partition.iter().map(|b| b.anchor).collect();

    Ok(CmdCut {
        partition,
        ridge,
        extinction,
        ridge_points,
    })
}

/// Bin a catalog along colour in strips anchored on a reference magnitude.
///
/// Arguments
/// -----------------
/// * `catalog`: stars of the CMD, already error- and spatially-cut
/// * `input`: isochrone track or empirical ridge-line
/// * `table`: extinction coefficients
/// * `params`: cut configuration, usually starting from
///   [`CmdCutParams::color_cut_defaults`]
///
/// Return
/// ----------
/// * The [`CmdCut`], or the first error of the extinction, fit or partition stages.
///
/// Remarks
/// ----------
/// * The strips are anchored on the horizontal line at the reference magnitude: bin
///   edge `e` is the colour of the bounding line at that magnitude.
/// * Without explicit windows, an isochrone ridge-line is fitted on the track points
///   within 0.2 mag of the colour range and within 0.5 mag of
///   [`COLOR_CUT_MAGNITUDE_RANGE`]. Fainter or brighter stages sharing the branch
///   colours stay out of the fit.
/// * [`ShearMode::PerpendicularToRidge`] has no meaning here; use
///   `ShearMode::Fixed(0.0)` for vertical strips.
pub fn color_cut<'a>(
    catalog: &'a Catalog,
    input: RidgeInput<'_>,
    table: &ExtinctionTable,
    params: &CmdCutParams,
) -> Result<CmdCut<'a>, CmdError> {
    if params.shear == ShearMode::PerpendicularToRidge {
        return Err(CmdError::InvalidParameter(
            "colour cuts take strips parallel to the ridge-line, a fixed slope or the reddening vector"
                .into(),
        ));
    }
    let mean_color = catalog.mean_color().ok_or_else(|| no_stars(catalog))?;
    let reference = match params.reference_magnitude {
        Some(m) => m,
        None => catalog.mean_magnitude().ok_or_else(|| no_stars(catalog))?,
    };
    let (low, high) = params.range.unwrap_or((
        mean_color - DEFAULT_COLOR_HALF_RANGE,
        mean_color + DEFAULT_COLOR_HALF_RANGE,
    ));

    let mut builder = BinningParams::builder()
        .axis(CmdAxis::Color)
        .range(low, high)
        .step(params.step);
    if let Some(across) = params.across_track {
        builder = builder.across_track(across);
    }
    let binning = builder.build()?;

    let extinction = extinction_vector(table, params)?;

    let mut ridge_params = params.ridge.clone();
    if matches!(input, RidgeInput::Isochrone(_)) {
        if ridge_params.color_window.is_none() {
            ridge_params.color_window =
                Some((low - ISOCHRONE_COLOR_MARGIN, high + ISOCHRONE_COLOR_MARGIN));
        }
        if ridge_params.magnitude_window.is_none() {
            let (mag_lo, mag_hi) = COLOR_CUT_MAGNITUDE_RANGE;
            ridge_params.magnitude_window = Some((
                mag_lo - ISOCHRONE_MAGNITUDE_MARGIN,
                mag_hi + ISOCHRONE_MAGNITUDE_MARGIN,
            ));
        }
    }
    let ridge = fit_ridge(catalog, input, &ridge_params)?;

    let shear = params
        .shear
        .resolve(CmdAxis::Color, extinction.as_ref(), &ridge)?;
    debug!("colour cut at magnitude {reference:.3}: shear dcolor/dmag = {shear:.4}, ridge {ridge}");

    let anchor = RidgeLineModel::constant(CmdAxis::Color, reference);
    let partition = partition(catalog, &anchor, shear, &binning)?;
    let ridge_points = partition
        .iter()
        .map(|b| match ridge.mode {
            FitMode::MagnitudeOnColor => ridge.point_at(b.center),
            FitMode::ColorOnMagnitude => match ridge.inverse(b.center) {
                Some(mag) => CmdPoint::new(b.center, mag),
                None => b.anchor,
            },
        })
        .collect();

    Ok(CmdCut {
        partition,
        ridge,
        extinction,
        ridge_points,
    })
}

#[cfg(test)]
mod cmd_cut_test {
    use super::*;
    use crate::{
        catalog::{FilterSet, StarRecord},
        isochrone::IsochronePoint,
    };
    use approx::assert_relative_eq;

    fn branch_catalog() -> Catalog {
        // colour = 0.2 · mag - 4.3 with a small colour spread
        let stars = (0..400)
            .map(|i| {
                let mag = 21.5 + 0.0125 * i as f64;
                let offset = 0.02 * ((i % 5) as f64 - 2.0);
                StarRecord::new(0.2 * mag - 4.3 + offset, mag, 0.02, 0.01, 0.0, 0.0)
            })
            .collect();
        Catalog::new(FilterSet::new("f115w", "f150w"), stars)
    }

    fn track() -> IsochroneTrack {
        let points = (0..40)
            .map(|i| {
                let mag = 20.0 + 0.2 * i as f64;
                IsochronePoint {
                    label: 3,
                    color: 0.2 * mag - 4.3,
                    magnitude: mag,
                    absolute_magnitude: mag - 29.0,
                }
            })
            .collect();
        IsochroneTrack::new(9.0, 0.02, points)
    }

    #[test]
    fn test_magnitude_cut_isochrone() {
        let catalog = branch_catalog();
        let track = track();
        let table = ExtinctionTable::jwst_hst();
        let params = CmdCutParams::builder().build().unwrap();

        let cut = magnitude_cut(&catalog, RidgeInput::Isochrone(&track), &table, &params).unwrap();
        assert_eq!(cut.n_bins(), 8);
        assert_relative_eq!(cut.ridge.slope, 0.2, epsilon = 1e-10);

        let vector = cut.extinction.unwrap();
        assert_relative_eq!(cut.partition.shear, vector.slope, epsilon = 1e-12);
        assert_eq!(cut.ridge_points.len(), 8);
        assert_relative_eq!(cut.ridge_points[0].color, 0.2 * 22.25 - 4.3, epsilon = 1e-10);

        // stars well inside the range are all assigned, once
        for star in catalog
            .iter()
            .filter(|s| s.magnitude > 22.25 && s.magnitude < 25.75)
        {
            assert!(cut.partition.bin_of(star).is_some());
        }
        let owned: usize = catalog
            .iter()
            .map(|s| cut.partition.iter().filter(|b| b.contains(s)).count())
            .sum();
        assert_eq!(cut.partition.n_members(), owned);
    }

    #[test]
    fn test_magnitude_cut_perpendicular_empirical() {
        let catalog = branch_catalog();
        let params = CmdCutParams::builder()
            .shear(ShearMode::PerpendicularToRidge)
            .range(22.0, 25.0)
            .step(1.0)
            .build()
            .unwrap();

        let cut = magnitude_cut(
            &catalog,
            RidgeInput::Empirical,
            &ExtinctionTable::jwst_hst(),
            &params,
        )
        .unwrap();
        assert_eq!(cut.n_bins(), 3);
        assert_relative_eq!(cut.ridge.slope, 0.2, epsilon = 0.01);
        assert_relative_eq!(cut.partition.shear, -cut.ridge.slope, epsilon = 1e-12);
    }

    #[test]
    fn test_magnitude_cut_window_follows_ridge() {
        // stars exactly on colour = 0.2 · mag - 4.3, whose colour spans -0.3 to 1.3
        let stars = (0..800)
            .map(|i| {
                let mag = 20.005 + 0.01 * i as f64;
                StarRecord::from_cmd(0.2 * mag - 4.3, mag)
            })
            .collect();
        let catalog = Catalog::new(FilterSet::new("f115w", "f150w"), stars);
        let params = CmdCutParams::builder()
            .range(20.0, 28.0)
            .step(1.0)
            .build()
            .unwrap();

        let cut = magnitude_cut(
            &catalog,
            RidgeInput::Empirical,
            &ExtinctionTable::jwst_hst(),
            &params,
        )
        .unwrap();
        assert_eq!(cut.n_bins(), 8);
        for bin in cut.partition.iter() {
            let (lo, hi) = bin.window.unwrap();
            let ridge_color = cut.ridge.eval(bin.center);
            assert_relative_eq!(0.5 * (lo + hi), ridge_color, epsilon = 1e-9);
            assert_relative_eq!(hi - lo, 2.0 * DEFAULT_COLOR_HALF_WIDTH, epsilon = 1e-12);
        }

        // every on-ridge star lands in a bin, the outermost ones included
        assert_eq!(cut.partition.n_members(), catalog.len());
        assert!(cut.partition.iter().all(|b| b.len() == 100));
    }

    #[test]
    fn test_isochrone_windows_exclude_other_stages() {
        // giant branch magnitude = 5 · colour + 21.5 plus a faint stage at the same
        // colours
        let mut points: Vec<IsochronePoint> = (0..=16)
            .map(|i| {
                let mag = 22.0 + 0.25 * i as f64;
                IsochronePoint {
                    label: 3,
                    color: (mag - 21.5) / 5.0,
                    magnitude: mag,
                    absolute_magnitude: mag - 29.0,
                }
            })
            .collect();
        points.extend((0..=8).map(|i| {
            let color = 0.1 + 0.1 * i as f64;
            IsochronePoint {
                label: 1,
                color,
                magnitude: 31.0 + 0.1 * color,
                absolute_magnitude: 2.0 + 0.1 * color,
            }
        }));
        let track = IsochroneTrack::new(10.0, 0.02, points);
        let catalog = branch_catalog();
        let table = ExtinctionTable::jwst_hst();

        let params = CmdCutParams {
            range: Some((0.1, 0.9)),
            step: 0.1,
            reference_magnitude: Some(24.0),
            ..CmdCutParams::color_cut_defaults()
        };
        let cut = color_cut(&catalog, RidgeInput::Isochrone(&track), &table, &params).unwrap();
        assert_relative_eq!(cut.ridge.slope, 5.0, epsilon = 1e-8);
        assert_relative_eq!(cut.partition.shear, 0.2, epsilon = 1e-10);
        assert_relative_eq!(cut.ridge.domain.0, 0.1, epsilon = 1e-9);
        assert_relative_eq!(cut.ridge.domain.1, 0.9, epsilon = 1e-9);

        // the magnitude cut fits the track one step beyond the binning range
        let long = IsochroneTrack::new(
            10.0,
            0.02,
            (0..=40)
                .map(|i| {
                    let mag = 20.0 + 0.2 * i as f64;
                    IsochronePoint {
                        label: 3,
                        color: 0.2 * mag - 4.3,
                        magnitude: mag,
                        absolute_magnitude: mag - 29.0,
                    }
                })
                .collect(),
        );
        let params = CmdCutParams::builder().step(0.5).build().unwrap();
        let cut = magnitude_cut(&catalog, RidgeInput::Isochrone(&long), &table, &params).unwrap();
        assert_relative_eq!(cut.ridge.domain.0, 21.6, epsilon = 1e-9);
        assert_relative_eq!(cut.ridge.domain.1, 26.4, epsilon = 1e-9);
    }

    #[test]
    fn test_magnitude_cut_degenerate_reddening() {
        let catalog = branch_catalog();
        let table = ExtinctionTable::new()
            .with("f115w", 1.0)
            .with("f150w", 1.0);
        let params = CmdCutParams::default();
        assert!(matches!(
            magnitude_cut(&catalog, RidgeInput::Empirical, &table, &params),
            Err(CmdError::DegenerateVector(_))
        ));

        // a ridge-relative shear does not need the vector
        let perp = CmdCutParams {
            shear: ShearMode::PerpendicularToRidge,
            ..params
        };
        let cut = magnitude_cut(&catalog, RidgeInput::Empirical, &table, &perp).unwrap();
        assert!(cut.extinction.is_none());
    }

    #[test]
    fn test_color_cut_parallel() {
        let catalog = branch_catalog();
        let track = track();
        let params = CmdCutParams {
            step: 0.1,
            reference_magnitude: Some(24.0),
            ..CmdCutParams::color_cut_defaults()
        };

        let cut = color_cut(
            &catalog,
            RidgeInput::Isochrone(&track),
            &ExtinctionTable::jwst_hst(),
            &params,
        )
        .unwrap();
        // magnitude = 5 · colour + 21.5, strips parallel to it
        assert_relative_eq!(cut.ridge.slope, 5.0, epsilon = 1e-8);
        assert_relative_eq!(cut.partition.shear, 0.2, epsilon = 1e-10);
        assert_eq!(cut.n_bins(), 20);
        assert_relative_eq!(
            cut.ridge_points[0].magnitude,
            5.0 * cut.partition.bins()[0].center + 21.5,
            epsilon = 1e-8
        );
        // every bin line passes at its edge colour on the reference magnitude
        let bin = &cut.partition.bins()[3];
        assert_relative_eq!(bin.lower.eval(24.0), bin.lower_edge, epsilon = 1e-12);
    }

    #[test]
    fn test_color_cut_vertical_and_errors() {
        let catalog = branch_catalog();
        let table = ExtinctionTable::jwst_hst();
        let vertical = CmdCutParams::builder()
            .shear(ShearMode::Fixed(0.0))
            .range(0.0, 1.0)
            .step(0.25)
            .build()
            .unwrap();
        let cut = color_cut(&catalog, RidgeInput::Empirical, &table, &vertical).unwrap();
        assert_eq!(cut.n_bins(), 4);
        let expected = catalog
            .iter()
            .filter(|s| s.color > 0.0 && s.color <= 1.0)
            .count();
        assert_eq!(cut.partition.n_members(), expected);

        let perp = CmdCutParams {
            shear: ShearMode::PerpendicularToRidge,
            ..vertical
        };
        assert!(matches!(
            color_cut(&catalog, RidgeInput::Empirical, &table, &perp),
            Err(CmdError::InvalidParameter(_))
        ));

        let empty = Catalog::new(FilterSet::new("f115w", "f150w"), vec![]);
        assert!(matches!(
            color_cut(&empty, RidgeInput::Empirical, &table, &CmdCutParams::default()),
            Err(CmdError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_params() {
        assert!(CmdCutParams::builder().step(-1.0).build().is_err());
        assert!(CmdCutParams::builder().range(2.0, 1.0).build().is_err());
        assert!(CmdCutParams::builder()
            .reference_magnitude(f64::NAN)
            .build()
            .is_err());

        let text = format!("{:#}", CmdCutParams::default());
        assert!(text.contains("[Binning]"));
        assert!(text.contains("F115W - F150W / F150W"));
        assert!(format!("{}", CmdCutParams::default()).starts_with("CmdCutParams("));
    }
}
