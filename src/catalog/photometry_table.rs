//! Column-oriented photometry table.
//!
//! Overview
//! -----------------
//! A [`PhotometryTable`] is the tabular export of a PSF photometry run: one row per
//! detection, one numeric column per measured quantity. Per-filter columns follow the
//! naming used by the photometry pipeline:
//!
//! * `mag_vega_<FILTER>` – Vega-system magnitude,
//! * `mag_err_<FILTER>` – magnitude uncertainty,
//!
//! where `<FILTER>` is a filter token such as `F115W`. Column lookups are
//! case-insensitive, so `f115w` and `F115W` address the same column.
//!
//! The table is only used to *narrow* the detections (error cuts, star quality split)
//! before being turned into a [`Catalog`] for a given [`FilterSet`].
//!
//! Errors
//! -----------------
//! * A magnitude column missing for a requested filter → [`CmdError::UnknownFilter`].
//! * Any other missing column → [`CmdError::MissingColumn`].
//! * A cell that is not a number → [`CmdError::InvalidValue`]. Empty cells are read as `NaN`.
use std::{fmt, fs::File, io::Read};

use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use log::debug;

use crate::{
    catalog::{Catalog, StarRecord},
    cmd_errors::CmdError,
    conversion::normalize_filter,
};

/// The three filters defining a colour-magnitude diagram.
///
/// The colour axis is `blue - red`, the magnitude axis is `magnitude`. When only two
/// filters are given the magnitude axis uses the red filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct FilterSet {
    pub blue: String,
    pub red: String,
    pub magnitude: String,
}

impl FilterSet {
    /// Colour `blue - red` against magnitude `red`.
    pub fn new(blue: &str, red: &str) -> Self {
        FilterSet {
            blue: normalize_filter(blue),
            red: normalize_filter(red),
            magnitude: normalize_filter(red),
        }
    }

    /// Replace the magnitude-axis filter.
    pub fn with_magnitude(mut self, magnitude: &str) -> Self {
        self.magnitude = normalize_filter(magnitude);
        self
    }

    /// The three filters in the order (blue, red, magnitude).
    pub fn tokens(&self) -> [&str; 3] {
        [&self.blue, &self.red, &self.magnitude]
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} / {}", self.blue, self.red, self.magnitude)
    }
}

/// Photometric error cut applied to every filter of a [`FilterSet`].
///
/// A row is kept when `|mag_err| < limit` (or `<= limit` when `inclusive`) holds for
/// all filters of the set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorCut {
    pub limit: f64,
    pub inclusive: bool,
}

impl ErrorCut {
    pub fn strict(limit: f64) -> Self {
        ErrorCut {
            limit,
            inclusive: false,
        }
    }

    pub fn inclusive(limit: f64) -> Self {
        ErrorCut {
            limit,
            inclusive: true,
        }
    }

    fn accepts(&self, err: f64) -> bool {
        if self.inclusive {
            err.abs() <= self.limit
        } else {
            err.abs() < self.limit
        }
    }
}

impl Default for ErrorCut {
    fn default() -> Self {
        ErrorCut::strict(0.5)
    }
}

/// Star/galaxy quality criteria on the photometry diagnostics.
///
/// Defaults follow Warfield et al. (2023) for JWST/NIRCam:
/// `sharpness² <= 0.01`, `crowding <= 0.5`, `flags <= 2`, `type <= 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityCriteria {
    pub max_sharpness_sq: f64,
    pub max_crowding: f64,
    pub max_flags: f64,
    pub max_type: f64,
    pub sharpness_column: String,
    pub crowding_column: String,
    pub flags_column: String,
    pub type_column: String,
}

impl Default for QualityCriteria {
    fn default() -> Self {
        QualityCriteria {
            max_sharpness_sq: 0.01,
            max_crowding: 0.5,
            max_flags: 2.0,
            max_type: 2.0,
            sharpness_column: "sharpness".into(),
            crowding_column: "obj_crowd".into(),
            flags_column: "flags".into(),
            type_column: "type".into(),
        }
    }
}

/// Names of the celestial coordinate columns, in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateColumns {
    pub ra: String,
    pub dec: String,
}

impl Default for CoordinateColumns {
    fn default() -> Self {
        CoordinateColumns {
            ra: "ra".into(),
            dec: "dec".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotometryTable {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl PhotometryTable {
    /// Build a table from already parsed columns.
    ///
    /// Arguments
    /// -----------------
    /// * `headers`: column names
    /// * `columns`: one vector per column, all of the same length
    ///
    /// Return
    /// ----------
    /// * The table, or [`CmdError::InvalidParameter`] if the shapes disagree.
    pub fn new(headers: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, CmdError> {
        if headers.len() != columns.len() {
            return Err(CmdError::InvalidParameter(format!(
                "{} headers for {} columns",
                headers.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first() {
            if columns.iter().any(|c| c.len() != first.len()) {
                return Err(CmdError::InvalidParameter(
                    "all columns must have the same length".into(),
                ));
            }
        }
        Ok(PhotometryTable { headers, columns })
    }

    /// Read a CSV table from disk. Lines starting with `#` are ignored.
    pub fn from_csv_path(path: &Utf8Path) -> Result<Self, CmdError> {
        let file = File::open(path)?;
        let table = Self::from_csv_reader(file)?;
        debug!(
            "loaded photometry table {path}: {} rows, {} columns",
            table.len(),
            table.headers.len()
        );
        Ok(table)
    }

    /// Read a CSV table from any reader. Lines starting with `#` are ignored.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CmdError> {
        let mut csv_reader = ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut columns = vec![Vec::new(); headers.len()];

        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            for ((column, header), cell) in columns.iter_mut().zip(&headers).zip(record.iter()) {
                column.push(parse_cell(cell, header, row)?);
            }
        }

        PhotometryTable::new(headers, columns)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name.trim()))
    }

    /// Get a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Result<&[f64], CmdError> {
        self.column_index(name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| CmdError::MissingColumn(name.to_string()))
    }

    /// Vega magnitude column of a filter (`mag_vega_<FILTER>`).
    pub fn magnitude(&self, filter: &str) -> Result<&[f64], CmdError> {
        let name = format!("mag_vega_{}", normalize_filter(filter));
        self.column(&name)
            .map_err(|_| CmdError::UnknownFilter(format!("{filter} (no column {name})")))
    }

    /// Magnitude uncertainty column of a filter (`mag_err_<FILTER>`).
    pub fn magnitude_error(&self, filter: &str) -> Result<&[f64], CmdError> {
        let name = format!("mag_err_{}", normalize_filter(filter));
        self.column(&name)
            .map_err(|_| CmdError::UnknownFilter(format!("{filter} (no column {name})")))
    }

    /// Keep the rows where `mask` is `true`.
    pub fn select_rows(&self, mask: &[bool]) -> PhotometryTable {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                col.iter()
                    .zip(mask)
                    .filter_map(|(v, keep)| keep.then_some(*v))
                    .collect()
            })
            .collect();

        PhotometryTable {
            headers: self.headers.clone(),
            columns,
        }
    }

    /// Apply a photometric error cut on every filter of `filters`.
    ///
    /// Arguments
    /// -----------------
    /// * `filters`: the filters whose `mag_err_<FILTER>` columns are tested
    /// * `cut`: the error limit and comparison convention
    ///
    /// Return
    /// ----------
    /// * A new table holding the rows accepted in all filters.
    pub fn error_cut(&self, filters: &FilterSet, cut: ErrorCut) -> Result<PhotometryTable, CmdError> {
        let mut mask = vec![true; self.len()];
        for filter in filters.tokens() {
            let errors = self.magnitude_error(filter)?;
            for (keep, err) in mask.iter_mut().zip(errors) {
                *keep &= cut.accepts(*err);
            }
        }
        Ok(self.select_rows(&mask))
    }

    /// Split the table into (accepted, rejected) star samples.
    ///
    /// See also
    /// ------------
    /// * [`QualityCriteria`] – thresholds and column names.
    pub fn quality_split(
        &self,
        criteria: &QualityCriteria,
    ) -> Result<(PhotometryTable, PhotometryTable), CmdError> {
        let sharpness = self.column(&criteria.sharpness_column)?;
        let crowding = self.column(&criteria.crowding_column)?;
        let flags = self.column(&criteria.flags_column)?;
        let kind = self.column(&criteria.type_column)?;

        let accepted: Vec<bool> = (0..self.len())
            .map(|i| {
                sharpness[i] * sharpness[i] <= criteria.max_sharpness_sq
                    && crowding[i] <= criteria.max_crowding
                    && flags[i] <= criteria.max_flags
                    && kind[i] <= criteria.max_type
            })
            .collect();
        let rejected: Vec<bool> = accepted.iter().map(|a| !a).collect();

        Ok((self.select_rows(&accepted), self.select_rows(&rejected)))
    }

    /// Convert the table into a [`Catalog`] for a colour-magnitude diagram.
    ///
    /// Colour is `blue - red`, magnitude is the magnitude-axis filter. The colour
    /// uncertainty is the quadrature sum of the two colour-filter uncertainties.
    /// Rows with a non-finite colour or magnitude are dropped.
    ///
    /// Arguments
    /// -----------------
    /// * `filters`: the CMD filters
    /// * `coords`: names of the RA/Dec columns
    ///
    /// Return
    /// ----------
    /// * The catalog, or [`CmdError::UnknownFilter`] / [`CmdError::MissingColumn`].
    pub fn to_catalog(
        &self,
        filters: &FilterSet,
        coords: &CoordinateColumns,
    ) -> Result<Catalog, CmdError> {
        let blue = self.magnitude(&filters.blue)?;
        let red = self.magnitude(&filters.red)?;
        let mag = self.magnitude(&filters.magnitude)?;
        let blue_err = self.magnitude_error(&filters.blue)?;
        let red_err = self.magnitude_error(&filters.red)?;
        let mag_err = self.magnitude_error(&filters.magnitude)?;
        let ra = self.column(&coords.ra)?;
        let dec = self.column(&coords.dec)?;

        let stars: Vec<StarRecord> = (0..self.len())
            .map(|i| {
                StarRecord::new(
                    blue[i] - red[i],
                    mag[i],
                    blue_err[i].hypot(red_err[i]),
                    mag_err[i],
                    ra[i],
                    dec[i],
                )
            })
            .filter(|s| s.color.is_finite() && s.magnitude.is_finite())
            .collect();

        let dropped = self.len() - stars.len();
        if dropped > 0 {
            log::warn!("{dropped} rows without finite photometry in {filters} were dropped");
        }

        Ok(Catalog::new(filters.clone(), stars))
    }
}

fn parse_cell(cell: &str, header: &str, row: usize) -> Result<f64, CmdError> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| CmdError::InvalidValue {
        column: header.to_string(),
        row,
        value: cell.to_string(),
    })
}
