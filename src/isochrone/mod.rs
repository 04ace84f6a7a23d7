//! # Stellar isochrones
//!
//! Overview
//! -----------------
//! An isochrone model grid (e.g. PARSEC/CMD 3.7 output exported as CSV) holds one row
//! per (metallicity, age, initial mass) with:
//!
//! * `Zini` – initial metallicity,
//! * a `logAge` column – decimal log of the age in years,
//! * `label` – evolutionary-stage code (0 = pre-main sequence, 1 = main sequence,
//!   2 = sub-giant branch, 3 = red giant branch, …),
//! * `<FILTER>mag` – absolute magnitude in each filter (e.g. `F115Wmag`).
//!
//! [`IsochroneGrid::select`] extracts the [`IsochroneTrack`]s matching an
//! [`IsochroneQuery`] (age, metallicity, label range) and projects them into the
//! observed CMD of a [`FilterSet`] with an [`IsochroneProjection`] (per-band
//! extinction and distance modulus). Tracks are immutable once built.
use camino::Utf8Path;
use itertools::Itertools;
use log::debug;
use std::io::Read;

use crate::{
    catalog::{FilterSet, PhotometryTable},
    cmd_errors::CmdError,
    cmd_space::CmdPoint,
    constants::{Color, LogAge, Magnitude, Metallicity, ISOCHRONE_GAP_MAG},
    conversion::{age_label, normalize_filter},
    extinction::BandExtinction,
};

/// Selection of tracks in a model grid.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneQuery {
    /// Target log age.
    pub log_age: LogAge,
    /// Number of decimals the grid ages are rounded to before comparison.
    pub age_decimals: u32,
    /// Target metallicity; `None` keeps every metallicity of the grid.
    pub metallicity: Option<Metallicity>,
    /// Inclusive range of evolutionary-stage labels.
    pub label_range: (i32, i32),
}

impl IsochroneQuery {
    pub fn new(log_age: LogAge) -> Self {
        IsochroneQuery {
            log_age,
            age_decimals: 1,
            metallicity: None,
            label_range: (0, 10),
        }
    }

    pub fn with_metallicity(mut self, metallicity: Metallicity) -> Self {
        self.metallicity = Some(metallicity);
        self
    }

    pub fn with_labels(mut self, label_min: i32, label_max: i32) -> Self {
        self.label_range = (label_min, label_max);
        self
    }

    pub fn with_age_decimals(mut self, decimals: u32) -> Self {
        self.age_decimals = decimals;
        self
    }

    fn matches_age(&self, log_age: f64) -> bool {
        let scale = 10f64.powi(self.age_decimals as i32);
        ((log_age * scale).round() / scale - self.log_age).abs() < 1e-9
    }

    fn matches_metallicity(&self, z: f64) -> bool {
        self.metallicity.map_or(true, |met| (z - met).abs() <= 1e-9)
    }

    fn matches_label(&self, label: i32) -> bool {
        label >= self.label_range.0 && label <= self.label_range.1
    }
}

/// Shift from absolute model magnitudes to the observed CMD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsochroneProjection {
    pub extinction: BandExtinction,
    pub distance_modulus: f64,
}

impl IsochroneProjection {
    pub fn new(extinction: BandExtinction, distance_modulus: f64) -> Self {
        IsochroneProjection {
            extinction,
            distance_modulus,
        }
    }

    /// Distance only, no extinction.
    pub fn unreddened(distance_modulus: f64) -> Self {
        IsochroneProjection::new(BandExtinction::default(), distance_modulus)
    }
}

/// One point of a projected isochrone.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct IsochronePoint {
    pub label: i32,
    /// Reddened colour.
    pub color: Color,
    /// Reddened apparent magnitude.
    pub magnitude: Magnitude,
    /// Model absolute magnitude in the magnitude-axis filter.
    pub absolute_magnitude: Magnitude,
}

impl IsochronePoint {
    pub fn cmd(&self) -> CmdPoint {
        CmdPoint::new(self.color, self.magnitude)
    }
}

/// Brightest point of a track (tip of the giant branch for old populations).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TrackTip {
    pub absolute_magnitude: Magnitude,
    pub color: Color,
    pub magnitude: Magnitude,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IsochroneTrack {
    pub log_age: LogAge,
    pub metallicity: Metallicity,
    points: Vec<IsochronePoint>,
}

impl IsochroneTrack {
    pub fn new(log_age: LogAge, metallicity: Metallicity, points: Vec<IsochronePoint>) -> Self {
        IsochroneTrack {
            log_age,
            metallicity,
            points,
        }
    }

    pub fn points(&self) -> &[IsochronePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn cmd_points(&self) -> Vec<CmdPoint> {
        self.points.iter().map(IsochronePoint::cmd).collect()
    }

    /// Readable age, e.g. `"1.0 Gyr"`.
    pub fn age_label(&self) -> String {
        age_label(self.log_age)
    }

    /// Brightest point of the track, `None` if the track is empty.
    pub fn tip(&self) -> Option<TrackTip> {
        self.points
            .iter()
            .min_by(|a, b| a.magnitude.total_cmp(&b.magnitude))
            .map(|p| TrackTip {
                absolute_magnitude: p.absolute_magnitude,
                color: p.color,
                magnitude: p.magnitude,
            })
    }

    /// Split the track where the magnitude jumps by at least `max_jump` toward faint
    /// magnitudes, so that separate branches are not drawn as one line.
    pub fn segments(&self, max_jump: f64) -> Vec<&[IsochronePoint]> {
        let mut segments = Vec::new();
        let mut start = 0;
        for i in 1..self.points.len() {
            let jump = self.points[i].magnitude - self.points[i - 1].magnitude;
            if !(jump < max_jump) {
                segments.push(&self.points[start..i]);
                start = i;
            }
        }
        if start < self.points.len() {
            segments.push(&self.points[start..]);
        }
        segments
    }

    /// [`segments`](IsochroneTrack::segments) with the default 1 mag gap.
    pub fn branches(&self) -> Vec<&[IsochronePoint]> {
        self.segments(ISOCHRONE_GAP_MAG)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneGrid {
    table: PhotometryTable,
    age_column: String,
    metallicity_column: String,
}

impl IsochroneGrid {
    /// Wrap an already loaded table, locating the `logAge` and `Zini` columns.
    pub fn new(table: PhotometryTable) -> Result<Self, CmdError> {
        let find = |key: &str| -> Result<String, CmdError> {
            let key_lower = key.to_ascii_lowercase();
            table
                .headers()
                .iter()
                .find(|h| h.eq_ignore_ascii_case(key))
                .or_else(|| {
                    table
                        .headers()
                        .iter()
                        .find(|h| h.to_ascii_lowercase().contains(&key_lower))
                })
                .cloned()
                .ok_or_else(|| CmdError::MissingColumn(key.to_string()))
        };

        let age_column = find("logAge")?;
        let metallicity_column = find("Zini")?;
        table.column("label")?;

        Ok(IsochroneGrid {
            table,
            age_column,
            metallicity_column,
        })
    }

    pub fn from_csv_path(path: &Utf8Path) -> Result<Self, CmdError> {
        let grid = IsochroneGrid::new(PhotometryTable::from_csv_path(path)?)?;
        debug!("loaded isochrone grid {path}: {} rows", grid.table.len());
        Ok(grid)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CmdError> {
        IsochroneGrid::new(PhotometryTable::from_csv_reader(reader)?)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Distinct metallicities of the grid, sorted.
    pub fn metallicities(&self) -> Result<Vec<Metallicity>, CmdError> {
        Ok(self
            .table
            .column(&self.metallicity_column)?
            .iter()
            .copied()
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect())
    }

    /// Absolute magnitude column of a filter (`<FILTER>mag`).
    pub fn magnitude(&self, filter: &str) -> Result<&[f64], CmdError> {
        let name = format!("{}mag", normalize_filter(filter));
        self.table
            .column(&name)
            .map_err(|_| CmdError::UnknownFilter(format!("{filter} (no isochrone column {name})")))
    }

    /// Extract the tracks matching a query, one per metallicity, projected in the CMD.
    ///
    /// Arguments
    /// -----------------
    /// * `query`: age, metallicity and label selection
    /// * `filters`: the CMD filters
    /// * `projection`: per-band extinction and distance modulus
    ///
    /// Return
    /// ----------
    /// * The tracks sorted by metallicity, each with its rows in grid order. An empty
    ///   vector when nothing matches.
    pub fn select(
        &self,
        query: &IsochroneQuery,
        filters: &FilterSet,
        projection: &IsochroneProjection,
    ) -> Result<Vec<IsochroneTrack>, CmdError> {
        if query.label_range.0 > query.label_range.1 {
            return Err(CmdError::InvalidParameter(format!(
                "label range {:?} is empty",
                query.label_range
            )));
        }

        let ages = self.table.column(&self.age_column)?;
        let zs = self.table.column(&self.metallicity_column)?;
        let labels = self.table.column("label")?;
        let blue = self.magnitude(&filters.blue)?;
        let red = self.magnitude(&filters.red)?;
        let mag = self.magnitude(&filters.magnitude)?;
        let ext = projection.extinction;

        let tracks = (0..self.table.len())
            .filter(|&i| {
                query.matches_age(ages[i])
                    && query.matches_metallicity(zs[i])
                    && query.matches_label(labels[i].round() as i32)
            })
            .map(|i| {
                let point = IsochronePoint {
                    label: labels[i].round() as i32,
                    color: (blue[i] + ext.blue) - (red[i] + ext.red),
                    magnitude: mag[i] + ext.magnitude + projection.distance_modulus,
                    absolute_magnitude: mag[i],
                };
                (zs[i], point)
            })
            .into_group_map_by(|(z, _)| z.to_bits())
            .into_iter()
            .map(|(bits, rows)| {
                let points = rows.into_iter().map(|(_, p)| p).collect();
                IsochroneTrack::new(query.log_age, f64::from_bits(bits), points)
            })
            .sorted_by(|a, b| a.metallicity.total_cmp(&b.metallicity))
            .collect_vec();

        debug!(
            "isochrone selection log_age={} Z={:?}: {} track(s)",
            query.log_age,
            query.metallicity,
            tracks.len()
        );
        Ok(tracks)
    }
}
