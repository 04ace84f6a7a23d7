//! # Sheared-strip partition of a catalog
//!
//! Overview
//! -----------------
//! The partitioner cuts the CMD into parallel strips along a *binning axis* `B`
//! (magnitude or colour). The other axis is the *cross axis* `C`.
//!
//! The anchor ridge-line maps `B → C`. For a bin edge `e` on `B`, the bounding line
//! goes through the ridge point `(e, ridge(e))` with the shear slope `s = dB/dC`:
//!
//! ```text
//! B(C) = e + s · (C - ridge(e))
//! ```
//!
//! Bin `i` is the strip between the lines of edges `e_i = low + i·step` and
//! `e_{i+1}`. A star `(b, c)` belongs to it when
//!
//! ```text
//! lower(c) < b <= upper(c)
//! ```
//!
//! so a star lying exactly on a shared line belongs to the bin below it (open lower
//! bound, closed upper bound). Each edge line is computed once and shared by the two
//! bins it separates, hence no star can be in two bins.
//!
//! An optional across-track window further restricts the cross-axis coordinate.
//!
//! Bins whose strip misses every star are returned empty, they are not an error.
pub mod export;

use log::{debug, warn};

use crate::{
    catalog::{Catalog, StarRecord},
    cmd_errors::CmdError,
    cmd_space::{CmdAxis, CmdPoint},
    constants::EPS,
    ridge_line::RidgeLineModel,
};

/// Acceptance window on the cross axis.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum AcrossTrack {
    /// `|c - ridge(bin centre)| <= half_width`
    AroundRidge { half_width: f64 },
    /// `|c - center| <= half_width`, the same for every bin.
    Fixed { center: f64, half_width: f64 },
}

impl AcrossTrack {
    fn half_width(&self) -> f64 {
        match self {
            AcrossTrack::AroundRidge { half_width } | AcrossTrack::Fixed { half_width, .. } => {
                *half_width
            }
        }
    }
}

/// Binning configuration.
///
/// Fields
/// -----------------
/// * `axis` – binning axis.
/// * `low`, `high` – range covered on the binning axis.
/// * `step` – bin width.
/// * `across_track` – optional cross-axis window.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BinningParams {
    pub axis: CmdAxis,
    pub low: f64,
    pub high: f64,
    pub step: f64,
    pub across_track: Option<AcrossTrack>,
}

impl Default for BinningParams {
    fn default() -> Self {
        BinningParams {
            axis: CmdAxis::Magnitude,
            low: 22.0,
            high: 26.0,
            step: 0.5,
            across_track: None,
        }
    }
}

impl BinningParams {
    pub fn builder() -> BinningParamsBuilder {
        BinningParamsBuilder::default()
    }

    /// Number of bins `floor((high - low) / step)`.
    ///
    /// A relative tolerance of [`EPS`] keeps ranges that are an exact multiple of the
    /// step from losing their last bin to rounding.
    ///
    /// Return
    /// ----------
    /// * The count, or [`CmdError::EmptyRange`] if it is below one.
    pub fn n_bins(&self) -> Result<usize, CmdError> {
        let n = ((self.high - self.low) / self.step + EPS).floor();
        if !(n >= 1.0) {
            return Err(CmdError::EmptyRange(format!(
                "[{}, {}) with step {} holds no bin",
                self.low, self.high, self.step
            )));
        }
        Ok(n as usize)
    }

    /// Bin edges `low + k·step` for `k = 0..=n_bins`.
    pub fn edges(&self) -> Result<Vec<f64>, CmdError> {
        let n = self.n_bins()?;
        Ok((0..=n).map(|k| self.low + k as f64 * self.step).collect())
    }

    /// Bin centres `low + i·step + step/2`.
    pub fn centers(&self) -> Result<Vec<f64>, CmdError> {
        let n = self.n_bins()?;
        Ok((0..n)
            .map(|i| self.low + i as f64 * self.step + 0.5 * self.step)
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BinningParamsBuilder {
    params: BinningParams,
}

impl BinningParamsBuilder {
    pub fn axis(mut self, v: CmdAxis) -> Self {
        self.params.axis = v;
        self
    }
    pub fn range(mut self, low: f64, high: f64) -> Self {
        self.params.low = low;
        self.params.high = high;
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

    /// Validate and produce the [`BinningParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `low` and `high` finite, `step > 0` and finite.
    /// * across-track `half_width > 0`.
    /// * at least one bin, otherwise [`CmdError::EmptyRange`].
    pub fn build(self) -> Result<BinningParams, CmdError> {
        let p = &self.params;
        if !(p.low.is_finite() && p.high.is_finite()) {
            return Err(CmdError::InvalidParameter(format!(
                "binning range must be finite, got [{}, {})",
                p.low, p.high
            )));
        }
        if !(p.step > 0.0 && p.step.is_finite()) {
            return Err(CmdError::InvalidParameter(format!(
                "step must be finite and > 0, got {}",
                p.step
            )));
        }
        if let Some(window) = p.across_track {
            if !(window.half_width() > 0.0) {
                return Err(CmdError::InvalidParameter(format!(
                    "across-track half width must be > 0, got {}",
                    window.half_width()
                )));
            }
        }
        p.n_bins()?;
        Ok(self.params)
    }
}

/// Straight line `b = slope · c + intercept` in (cross axis, binning axis)
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BoundingLine {
    /// Binning axis of the line.
    pub axis: CmdAxis,
    pub slope: f64,
    pub intercept: f64,
}

impl BoundingLine {
    /// Line of slope `slope` through the point (`along` on `axis`, `across` on the
    /// other axis).
    pub fn through(axis: CmdAxis, slope: f64, along: f64, across: f64) -> Self {
        BoundingLine {
            axis,
            slope,
            intercept: along - slope * across,
        }
    }

    /// Binning-axis value at cross-axis coordinate `c`.
    pub fn eval(&self, c: f64) -> f64 {
        self.slope * c + self.intercept
    }

    pub fn point_at(&self, c: f64) -> CmdPoint {
        CmdPoint::from_axes(self.axis, self.eval(c), c)
    }

    /// End points of the line between two cross-axis coordinates.
    pub fn segment(&self, c_from: f64, c_to: f64) -> [CmdPoint; 2] {
        [self.point_at(c_from), self.point_at(c_to)]
    }
}

/// One strip of the partition.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Bin<'a> {
    pub index: usize,
    pub center: f64,
    pub width: f64,
    pub lower_edge: f64,
    pub upper_edge: f64,
    pub lower: BoundingLine,
    pub upper: BoundingLine,
    /// Inclusive cross-axis window `(lo, hi)`, if any.
    pub window: Option<(f64, f64)>,
    /// Ridge-line point at the bin centre.
    pub anchor: CmdPoint,
    pub members: Vec<&'a StarRecord>,
}

impl Bin<'_> {
    /// Membership test with the open-lower, closed-upper convention.
    pub fn contains(&self, star: &StarRecord) -> bool {
        let b = self.lower.axis.of_star(star);
        let c = self.lower.axis.other().of_star(star);
        let in_strip = self.lower.eval(c) < b && b <= self.upper.eval(c);
        in_strip && self.window.map_or(true, |(lo, hi)| c >= lo && c <= hi)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Ordered bins of a catalog.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Partition<'a> {
    pub axis: CmdAxis,
    /// Shear slope `dB/dC` shared by every bounding line.
    pub shear: f64,
    pub ridge: RidgeLineModel,
    bins: Vec<Bin<'a>>,
}

impl<'a> Partition<'a> {
    pub fn bins(&self) -> &[Bin<'a>] {
        &self.bins
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bin<'a>> {
        self.bins.iter()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Total number of assigned stars.
    pub fn n_members(&self) -> usize {
        self.bins.iter().map(Bin::len).sum()
    }

    /// Index of the bin holding `star`, if any.
    pub fn bin_of(&self, star: &StarRecord) -> Option<usize> {
        self.bins.iter().find(|b| b.contains(star)).map(|b| b.index)
    }

    /// All bounding lines, lower line of each bin then the upper line of the last one.
    pub fn lines(&self) -> Vec<BoundingLine> {
        self.bins
            .iter()
            .map(|b| b.lower)
            .chain(self.bins.last().map(|b| b.upper))
            .collect()
    }
}

/// Partition `catalog` into sheared strips anchored on a ridge-line.
///
/// Arguments
/// -----------------
/// * `catalog`: stars to distribute; bins keep references into it
/// * `ridge`: anchor ridge-line, its independent variable must be the binning axis
/// * `shear`: slope `dB/dC` of every bounding line (see
///   [`crate::extinction::ShearMode::resolve`])
/// * `params`: binning axis, range, step and across-track window
///
/// Return
/// ----------
/// * The bins in increasing order of the binning axis, or
///   [`CmdError::EmptyRange`] when the range holds no bin, or
///   [`CmdError::InvalidParameter`] for a ridge-line of the wrong orientation or a
///   non-finite shear.
pub fn partition<'a>(
    catalog: &'a Catalog,
    ridge: &RidgeLineModel,
    shear: f64,
    params: &BinningParams,
) -> Result<Partition<'a>, CmdError> {
    let axis = params.axis;
    if ridge.mode.independent() != axis {
        return Err(CmdError::InvalidParameter(format!(
            "the anchor ridge-line ({:?}) must be a function of the binning axis {axis:?}",
            ridge.mode
        )));
    }
    if !shear.is_finite() {
        return Err(CmdError::InvalidParameter(format!(
            "shear slope must be finite, got {shear}"
        )));
    }

    let edges = params.edges()?;
    // s · dC/dB >= 1: the strips turn back across the ridge-line
    if shear * ridge.slope >= 1.0 {
        warn!(
            "shear {shear:.4} against ridge slope {:.4}: strips fold over the ridge-line",
            ridge.slope
        );
    }

    let lines: Vec<BoundingLine> = edges
        .iter()
        .map(|&e| BoundingLine::through(axis, shear, e, ridge.eval(e)))
        .collect();

    let bins: Vec<Bin<'a>> = edges
        .windows(2)
        .zip(lines.windows(2))
        .enumerate()
        .map(|(index, (edge, line))| {
            let center = edge[0] + 0.5 * params.step;
            let anchor = ridge.point_at(center);
            let window = params.across_track.map(|w| match w {
                AcrossTrack::AroundRidge { half_width } => {
                    let c = ridge.eval(center);
                    (c - half_width, c + half_width)
                }
                AcrossTrack::Fixed { center, half_width } => {
                    (center - half_width, center + half_width)
                }
            });
            let mut bin = Bin {
                index,
                center,
                width: params.step,
                lower_edge: edge[0],
                upper_edge: edge[1],
                lower: line[0],
                upper: line[1],
                window,
                anchor,
                members: Vec::new(),
            };
            bin.members = catalog.iter().filter(|s| bin.contains(s)).collect();
            bin
        })
        .collect();

    let result = Partition {
        axis,
        shear,
        ridge: *ridge,
        bins,
    };
    debug!(
        "partition along {axis:?}: {} bins over [{}, {}), {} of {} stars assigned",
        result.len(),
        params.low,
        params.high,
        result.n_members(),
        catalog.len()
    );
    Ok(result)
}
