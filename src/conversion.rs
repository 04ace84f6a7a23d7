use crate::constants::{ArcSec, Degree, LogAge, ARCSEC_PER_DEG, RADEG};

/// Angular separation between two celestial positions.
///
/// Uses the Vincenty formula, which stays accurate both for very small and for
/// nearly antipodal separations.
///
/// Arguments
/// ---------------
/// * `ra1`, `dec1`: first position in degrees
/// * `ra2`, `dec2`: second position in degrees
///
/// Return
/// ----------
/// * The separation in arcseconds
pub fn angular_separation(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> ArcSec {
    let (sin_dra, cos_dra) = ((ra2 - ra1) * RADEG).sin_cos();
    let (sin_d1, cos_d1) = (dec1 * RADEG).sin_cos();
    let (sin_d2, cos_d2) = (dec2 * RADEG).sin_cos();

    let num1 = cos_d2 * sin_dra;
    let num2 = cos_d1 * sin_d2 - sin_d1 * cos_d2 * cos_dra;
    let denominator = sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_dra;

    num1.hypot(num2).atan2(denominator) / RADEG * ARCSEC_PER_DEG
}

/// Format a logarithmic age as a readable label.
///
/// Ages below 1 Gyr are written in Myr, older ages in Gyr, both rounded to one
/// decimal.
///
/// Arguments
/// ---------------
/// * `log_age`: decimal logarithm of the age in years
///
/// Return
/// ----------
/// * A label such as `"100.0 Myr"` or `"3.2 Gyr"`
pub fn age_label(log_age: LogAge) -> String {
    if log_age < 9.0 {
        let myr = 10f64.powf(log_age - 6.0);
        format!("{:.1} Myr", myr)
    } else {
        let gyr = 10f64.powf(log_age - 9.0);
        format!("{:.1} Gyr", gyr)
    }
}

/// Normalize a filter token for case-insensitive lookups (`"f115w"` → `"F115W"`).
pub(crate) fn normalize_filter(token: &str) -> String {
    token.trim().to_ascii_uppercase()
}
