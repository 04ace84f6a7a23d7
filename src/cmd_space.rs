//! Axes and points of the colour-magnitude plane.
//!
//! Geometry in this crate is written in terms of a *binning axis* and a *cross axis*
//! rather than colour and magnitude directly, so that the same code bins along
//! magnitude (strips across the giant branch) or along colour (strips parallel to it).
use crate::{
    catalog::StarRecord,
    constants::{Color, Magnitude},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum CmdAxis {
    Color,
    Magnitude,
}

impl CmdAxis {
    /// The other axis of the plane.
    pub fn other(&self) -> CmdAxis {
        match self {
            CmdAxis::Color => CmdAxis::Magnitude,
            CmdAxis::Magnitude => CmdAxis::Color,
        }
    }

    /// Coordinate of a star on this axis.
    pub fn of_star(&self, star: &StarRecord) -> f64 {
        match self {
            CmdAxis::Color => star.color,
            CmdAxis::Magnitude => star.magnitude,
        }
    }

    /// Coordinate of a point on this axis.
    pub fn of_point(&self, point: &CmdPoint) -> f64 {
        match self {
            CmdAxis::Color => point.color,
            CmdAxis::Magnitude => point.magnitude,
        }
    }
}

/// A position in the colour-magnitude plane.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CmdPoint {
    pub color: Color,
    pub magnitude: Magnitude,
}

impl CmdPoint {
    pub fn new(color: Color, magnitude: Magnitude) -> Self {
        CmdPoint { color, magnitude }
    }

    /// Build a point from its coordinate on `axis` and on the other axis.
    pub fn from_axes(axis: CmdAxis, along: f64, across: f64) -> Self {
        match axis {
            CmdAxis::Color => CmdPoint::new(along, across),
            CmdAxis::Magnitude => CmdPoint::new(across, along),
        }
    }
}

impl From<&StarRecord> for CmdPoint {
    fn from(star: &StarRecord) -> Self {
        CmdPoint::new(star.color, star.magnitude)
    }
}
