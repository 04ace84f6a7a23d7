//! # Stellar catalogs
//!
//! A [`Catalog`] is the set of detections placed in one colour-magnitude diagram:
//! every [`StarRecord`] carries its colour, magnitude, uncertainties and sky position,
//! and all records share the same [`FilterSet`].
//!
//! Catalogs are never modified in place. Every cut ([`Catalog::annulus_cut`],
//! [`Catalog::cmd_box`], [`Catalog::filter`]) returns a new catalog, so an upstream
//! catalog can be narrowed several ways without copying it first.
//!
//! Catalogs are usually built from a [`PhotometryTable`] with
//! [`PhotometryTable::to_catalog`], after the table-level error and quality cuts.
pub mod photometry_table;

use itertools::{Itertools, MinMaxResult};

use crate::{
    constants::{ArcSec, Color, Degree, Magnitude},
    conversion::angular_separation,
};

pub use photometry_table::{CoordinateColumns, ErrorCut, FilterSet, PhotometryTable, QualityCriteria};

/// One detection in a colour-magnitude diagram.
///
/// # Fields
///
/// * `color` - colour index `blue - red` (mag)
/// * `magnitude` - magnitude on the CMD vertical axis (mag)
/// * `color_error` - uncertainty on the colour (mag)
/// * `magnitude_error` - uncertainty on the magnitude (mag)
/// * `ra`, `dec` - sky position in degrees
/// * `radius` - separation from the reference point of the last spatial cut (arcsec)
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StarRecord {
    pub color: Color,
    pub magnitude: Magnitude,
    pub color_error: Color,
    pub magnitude_error: Magnitude,
    pub ra: Degree,
    pub dec: Degree,
    pub radius: Option<ArcSec>,
}

impl StarRecord {
    pub fn new(
        color: Color,
        magnitude: Magnitude,
        color_error: Color,
        magnitude_error: Magnitude,
        ra: Degree,
        dec: Degree,
    ) -> Self {
        StarRecord {
            color,
            magnitude,
            color_error,
            magnitude_error,
            ra,
            dec,
            radius: None,
        }
    }

    /// A record with only photometry, placed at the origin of the sky.
    pub fn from_cmd(color: Color, magnitude: Magnitude) -> Self {
        StarRecord::new(color, magnitude, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn with_radius(mut self, radius: ArcSec) -> Self {
        self.radius = Some(radius);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    filters: FilterSet,
    stars: Vec<StarRecord>,
}

impl Catalog {
    pub fn new(filters: FilterSet, stars: Vec<StarRecord>) -> Self {
        Catalog { filters, stars }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn stars(&self) -> &[StarRecord] {
        &self.stars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StarRecord> {
        self.stars.iter()
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    pub fn colors(&self) -> Vec<Color> {
        self.stars.iter().map(|s| s.color).collect()
    }

    pub fn magnitudes(&self) -> Vec<Magnitude> {
        self.stars.iter().map(|s| s.magnitude).collect()
    }

    /// Observed colour domain `(min, max)`, `None` for an empty catalog.
    pub fn color_range(&self) -> Option<(Color, Color)> {
        min_max(self.stars.iter().map(|s| s.color))
    }

    /// Observed magnitude domain `(min, max)`, `None` for an empty catalog.
    pub fn magnitude_range(&self) -> Option<(Magnitude, Magnitude)> {
        min_max(self.stars.iter().map(|s| s.magnitude))
    }

    pub fn mean_color(&self) -> Option<Color> {
        mean(self.stars.iter().map(|s| s.color))
    }

    pub fn mean_magnitude(&self) -> Option<Magnitude> {
        mean(self.stars.iter().map(|s| s.magnitude))
    }

    /// Keep the records accepted by `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Catalog
    where
        P: Fn(&StarRecord) -> bool,
    {
        Catalog {
            filters: self.filters.clone(),
            stars: self.stars.iter().filter(|s| predicate(s)).cloned().collect(),
        }
    }

    /// Keep the stars whose separation from a reference point lies in `[r_in, r_out]`.
    ///
    /// The separation of each kept star is stored in [`StarRecord::radius`].
    ///
    /// Arguments
    /// -----------------
    /// * `ra_cen`, `dec_cen`: reference point in degrees
    /// * `r_in`, `r_out`: inner and outer radius in arcseconds (both inclusive)
    ///
    /// Return
    /// ----------
    /// * A new catalog with the annulus members.
    pub fn annulus_cut(&self, ra_cen: Degree, dec_cen: Degree, r_in: ArcSec, r_out: ArcSec) -> Catalog {
        let stars = self
            .stars
            .iter()
            .map(|s| {
                let r = angular_separation(s.ra, s.dec, ra_cen, dec_cen);
                s.clone().with_radius(r)
            })
            .filter(|s| s.radius.is_some_and(|r| r >= r_in && r <= r_out))
            .collect();

        Catalog {
            filters: self.filters.clone(),
            stars,
        }
    }

    /// Keep the stars inside a closed colour × magnitude box.
    pub fn cmd_box(&self, color: (Color, Color), magnitude: (Magnitude, Magnitude)) -> Catalog {
        self.filter(|s| {
            s.color >= color.0
                && s.color <= color.1
                && s.magnitude >= magnitude.0
                && s.magnitude <= magnitude.1
        })
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a StarRecord;
    type IntoIter = std::slice::Iter<'a, StarRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.stars.iter()
    }
}

pub(crate) fn min_max<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    match values.minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v, v)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

pub(crate) fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
