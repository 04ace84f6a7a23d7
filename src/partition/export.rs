//! CSV export of a [`Partition`].
//!
//! Two tables are written:
//!
//! * members – one row per assigned star, tagged with its bin,
//! * geometry – one row per bin with its edges, bounding lines and window.
use std::{fs::File, io::Write};

use camino::Utf8Path;
use log::info;

use crate::{cmd_errors::CmdError, partition::Partition};

#[derive(Debug, serde::Serialize)]
struct MemberRow {
    bin: usize,
    center: f64,
    color: f64,
    magnitude: f64,
    color_error: f64,
    magnitude_error: f64,
    ra: f64,
    dec: f64,
    radius: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
struct GeometryRow {
    bin: usize,
    center: f64,
    lower_edge: f64,
    upper_edge: f64,
    slope: f64,
    lower_intercept: f64,
    upper_intercept: f64,
    anchor_color: f64,
    anchor_magnitude: f64,
    window_low: Option<f64>,
    window_high: Option<f64>,
    n_members: usize,
}

/// Write one row per member star.
pub fn write_members<W: Write>(partition: &Partition<'_>, writer: W) -> Result<(), CmdError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bin in partition.iter() {
        for star in &bin.members {
            wtr.serialize(MemberRow {
                bin: bin.index,
                center: bin.center,
                color: star.color,
                magnitude: star.magnitude,
                color_error: star.color_error,
                magnitude_error: star.magnitude_error,
                ra: star.ra,
                dec: star.dec,
                radius: star.radius,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write one row per bin.
pub fn write_geometry<W: Write>(partition: &Partition<'_>, writer: W) -> Result<(), CmdError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bin in partition.iter() {
        wtr.serialize(GeometryRow {
            bin: bin.index,
            center: bin.center,
            lower_edge: bin.lower_edge,
            upper_edge: bin.upper_edge,
            slope: bin.lower.slope,
            lower_intercept: bin.lower.intercept,
            upper_intercept: bin.upper.intercept,
            anchor_color: bin.anchor.color,
            anchor_magnitude: bin.anchor.magnitude,
            window_low: bin.window.map(|w| w.0),
            window_high: bin.window.map(|w| w.1),
            n_members: bin.len(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the members and the geometry tables to two files.
pub fn export_partition(
    partition: &Partition<'_>,
    members_path: &Utf8Path,
    geometry_path: &Utf8Path,
) -> Result<(), CmdError> {
    write_members(partition, File::create(members_path)?)?;
    write_geometry(partition, File::create(geometry_path)?)?;
    info!(
        "partition of {} bins written to {members_path} and {geometry_path}",
        partition.len()
    );
    Ok(())
}
