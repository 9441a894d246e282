use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{ArcMin, Degree, ARCMIN_PER_DEG, ARCSEC_PER_DEG, DEG_PER_HOUR};

// `13h26m47.2s`, `13:26:47.2` or `13 26 47.2`
static RA_SEXAGESIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s*[h:\s]\s*(\d{1,2})\s*[m:\s]\s*(\d{1,2}(?:\.\d*)?)\s*s?$")
        .expect("valid right ascension pattern")
});

// `-47d28m46s`, `-47:28:46`, `-47 28 46` or `-47°28'46"`
static DEC_SEXAGESIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([+-]?)(\d{1,2})\s*[d°:\s]\s*(\d{1,2})\s*[m':\s]\s*(\d{1,2}(?:\.\d*)?)\s*(?:s|")?$"#)
        .expect("valid declination pattern")
});

/// Parse a right ascension string to degrees
///
/// Arguments
/// ---------
/// * `ra`: either decimal degrees (`"201.697"`) or sexagesimal hours
///   (`"13h26m47.2s"`, `"13:26:47.2"`, `"13 26 47.2"`)
///
/// Returns
/// -------
/// * `Option<Degree>`: the right ascension in degrees, or `None` if the input is malformed
///   or out of range (`0 <= ra < 360`, minutes and seconds below 60).
pub fn parse_ra_to_deg(ra: &str) -> Option<Degree> {
    let ra = ra.trim();
    if let Ok(deg) = ra.parse::<f64>() {
        return (0.0..360.0).contains(&deg).then_some(deg);
    }

    let caps = RA_SEXAGESIMAL.captures(ra)?;
    let h: f64 = caps[1].parse().ok()?;
    let m: f64 = caps[2].parse().ok()?;
    let s: f64 = caps[3].parse().ok()?;
    if h >= 24.0 || m >= 60.0 || s >= 60.0 {
        return None;
    }

    Some((h + m / ARCMIN_PER_DEG + s / ARCSEC_PER_DEG) * DEG_PER_HOUR)
}

/// Parse a declination string to degrees
///
/// Arguments
/// ---------
/// * `dec`: either decimal degrees (`"-47.4794"`) or sexagesimal degrees
///   (`"-47d28m46s"`, `"-47:28:46"`, `"-47 28 46"`)
///
/// Returns
/// -------
/// * `Option<Degree>`: the declination in degrees, or `None` if the input is malformed
///   or outside `[-90, 90]`.
pub fn parse_dec_to_deg(dec: &str) -> Option<Degree> {
    let dec = dec.trim();
    if let Ok(deg) = dec.parse::<f64>() {
        return (-90.0..=90.0).contains(&deg).then_some(deg);
    }

    let caps = DEC_SEXAGESIMAL.captures(dec)?;
    let sign = if &caps[1] == "-" { -1.0 } else { 1.0 };
    let d: f64 = caps[2].parse().ok()?;
    let m: f64 = caps[3].parse().ok()?;
    let s: f64 = caps[4].parse().ok()?;
    if m >= 60.0 || s >= 60.0 {
        return None;
    }

    let dec_deg = sign * (d + m / ARCMIN_PER_DEG + s / ARCSEC_PER_DEG);
    (-90.0..=90.0).contains(&dec_deg).then_some(dec_deg)
}

#[inline]
pub fn arcmin_to_deg(arcmin: ArcMin) -> Degree {
    arcmin / ARCMIN_PER_DEG
}

#[inline]
pub fn deg_to_arcmin(deg: Degree) -> ArcMin {
    deg * ARCMIN_PER_DEG
}
