//! # Constants and type definitions for cmdcut
//!
//! This module centralizes the **unit conversions**, **numerical tolerances** and
//! **type aliases** shared by the catalog, isochrone and geometry modules.
//!
//! ## Overview
//!
//! - Angle conversions (degrees ↔ radians ↔ arcseconds)
//! - Photometric type aliases (magnitudes, colours, log ages)
//! - Default values shared by several parameter structures

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds in one degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Number of uniform bins used by the empirical running statistic
pub const DEFAULT_RUNNING_BINS: usize = 100;

/// Magnitude jump (mag) above which two consecutive isochrone points are not joined
pub const ISOCHRONE_GAP_MAG: f64 = 1.0;

/// Spacing (mag) of the synthetic error-bar grid
pub const ERROR_BAR_STEP: f64 = 0.5;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Vega-system magnitude
pub type Magnitude = f64;
/// Colour index (difference of two magnitudes)
pub type Color = f64;
/// Decimal logarithm of an age in years
pub type LogAge = f64;
/// Initial metal fraction Z
pub type Metallicity = f64;
