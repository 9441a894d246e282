//! # Sky regions
//!
//! Validated inputs of a cone search:
//!
//! * [`SkyPosition`] – ICRS position in degrees, `0 <= ra < 360`, `-90 <= dec <= 90`.
//! * [`SearchRadius`] – cone radius, finite, strictly positive and at most 180°.
//! * [`Region`] – a named [`SkyPosition`] (the region name keys every log line of a run).
//!
//! All three can only be built through fallible constructors, so a value that reaches
//! [`RetrievalPipeline::run`](crate::pipeline::RetrievalPipeline::run) is always well-formed
//! and invalid inputs fail with a configuration error before any remote call.
use std::fmt;

use crate::constants::{ArcMin, Degree, DEFAULT_SEARCH_RADIUS_ARCMIN, MAX_SEARCH_RADIUS_DEG};
use crate::conversion::{arcmin_to_deg, deg_to_arcmin, parse_dec_to_deg, parse_ra_to_deg};
use crate::hr_errors::HrError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPosition {
    ra: Degree,
    dec: Degree,
}

impl SkyPosition {
    /// Build a position from decimal degrees.
    ///
    /// Return
    /// ----------
    /// * `Err(HrError::InvalidSkyPosition)` if a coordinate is not finite or out of range.
    pub fn new(ra: Degree, dec: Degree) -> Result<Self, HrError> {
        if !(0.0..360.0).contains(&ra) {
            return Err(HrError::InvalidSkyPosition(format!(
                "right ascension {ra} deg outside [0, 360)"
            )));
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(HrError::InvalidSkyPosition(format!(
                "declination {dec} deg outside [-90, 90]"
            )));
        }
        Ok(SkyPosition { ra, dec })
    }

    /// Parse both coordinates from text, decimal degrees or sexagesimal
    /// (see [`parse_ra_to_deg`] and [`parse_dec_to_deg`]).
    pub fn parse(ra: &str, dec: &str) -> Result<Self, HrError> {
        let ra_deg = parse_ra_to_deg(ra)
            .ok_or_else(|| HrError::InvalidSkyPosition(format!("invalid right ascension '{ra}'")))?;
        let dec_deg = parse_dec_to_deg(dec)
            .ok_or_else(|| HrError::InvalidSkyPosition(format!("invalid declination '{dec}'")))?;
        SkyPosition::new(ra_deg, dec_deg)
    }

    pub fn ra(&self) -> Degree {
        self.ra
    }

    pub fn dec(&self) -> Degree {
        self.dec
    }
}

impl fmt::Display for SkyPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RA: {:.2} deg, Dec: {:.2} deg", self.ra, self.dec)
    }
}

/// Cone radius. Stored in degrees, the unit of the ADQL `CIRCLE` function.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SearchRadius(Degree);

impl SearchRadius {
    pub fn from_degrees(deg: Degree) -> Result<Self, HrError> {
        if !deg.is_finite() || deg <= 0.0 || deg > MAX_SEARCH_RADIUS_DEG {
            return Err(HrError::InvalidSearchRadius(format!(
                "{deg} deg must be in (0, {MAX_SEARCH_RADIUS_DEG}]"
            )));
        }
        Ok(SearchRadius(deg))
    }

    pub fn from_arcmin(arcmin: ArcMin) -> Result<Self, HrError> {
        Self::from_degrees(arcmin_to_deg(arcmin)).map_err(|_| {
            HrError::InvalidSearchRadius(format!(
                "{arcmin} arcmin must be in (0, {}]",
                deg_to_arcmin(MAX_SEARCH_RADIUS_DEG)
            ))
        })
    }

    pub fn degrees(&self) -> Degree {
        self.0
    }

    pub fn arcmin(&self) -> ArcMin {
        deg_to_arcmin(self.0)
    }
}

impl Default for SearchRadius {
    /// [`DEFAULT_SEARCH_RADIUS_ARCMIN`]
    fn default() -> Self {
        SearchRadius(arcmin_to_deg(DEFAULT_SEARCH_RADIUS_ARCMIN))
    }
}

impl fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} arcmin", self.arcmin())
    }
}

/// A named target of a cone search.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub position: SkyPosition,
}

impl Region {
    pub fn new(name: impl Into<String>, position: SkyPosition) -> Self {
        Region {
            name: name.into(),
            position,
        }
    }

    /// Lowercase, underscore-separated form of the name, used for output file names.
    pub fn slug(&self) -> String {
        name_slug(&self.name)
    }
}

pub(crate) fn name_slug(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod region_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sky_position_bounds() {
        assert!(SkyPosition::new(0.0, -90.0).is_ok());
        assert!(SkyPosition::new(359.999, 90.0).is_ok());
        assert!(matches!(
            SkyPosition::new(360.0, 0.0),
            Err(HrError::InvalidSkyPosition(_))
        ));
        assert!(SkyPosition::new(10.0, -90.5).is_err());
        assert!(SkyPosition::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_sky_position_parse() {
        let omega_cen = SkyPosition::parse("13h26m47.2s", "-47d28m46s").unwrap();
        assert_relative_eq!(omega_cen.ra(), 201.69666666666666, epsilon = 1e-10);
        assert_relative_eq!(omega_cen.dec(), -47.479444444444445, epsilon = 1e-10);
        assert_eq!(
            format!("{omega_cen}"),
            "RA: 201.70 deg, Dec: -47.48 deg"
        );

        let err = SkyPosition::parse("13h26m47.2s", "south").unwrap_err();
        assert_eq!(
            err,
            HrError::InvalidSkyPosition("invalid declination 'south'".into())
        );
    }

    #[test]
    fn test_search_radius() {
        let r = SearchRadius::from_arcmin(45.0).unwrap();
        assert_eq!(r.degrees(), 0.75);
        assert_eq!(r.arcmin(), 45.0);
        assert_eq!(format!("{r}"), "45.0 arcmin");

        assert!(SearchRadius::from_arcmin(0.0).is_err());
        assert!(SearchRadius::from_arcmin(-3.0).is_err());
        assert!(SearchRadius::from_degrees(180.5).is_err());
        assert!(SearchRadius::from_degrees(f64::INFINITY).is_err());
        assert!(SearchRadius::from_degrees(180.0).is_ok());
        assert_eq!(SearchRadius::default().degrees(), 0.5);
    }

    #[test]
    fn test_region_slug() {
        let pos = SkyPosition::new(6.02, -72.08).unwrap();
        assert_eq!(Region::new("47 Tucanae", pos).slug(), "47_tucanae");
        assert_eq!(name_slug(" Omega Centauri "), "omega_centauri");
    }
}
