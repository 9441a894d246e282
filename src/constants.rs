//! # Constants and type definitions for gaia_hr
//!
//! This module centralizes the **unit conversions**, **default thresholds** and **common type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Angle conversions (hours, degrees, arcminutes, arcseconds)
//! - Quality-filter defaults (parallax error, RUWE)
//! - Retrieval defaults (row cap, cone radius, HTTP timeout)
//! - Gaia archive endpoint and source table
//!
//! Units follow the Gaia DR3 `gaia_source` conventions: positions in degrees, parallaxes and
//! their errors in milliarcseconds, magnitudes in the Vega system, radial velocities in km/s.

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Hours of right ascension → degrees
pub const DEG_PER_HOUR: f64 = 15.0;

/// Arcminutes in one degree
pub const ARCMIN_PER_DEG: f64 = 60.0;

/// Arcseconds in one degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Largest meaningful cone radius (the whole sphere)
pub const MAX_SEARCH_RADIUS_DEG: f64 = 180.0;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Records with `parallax_error >= 5 mas` are rejected by default
pub const DEFAULT_PARALLAX_ERROR_MAX: MilliArcSec = 5.0;

/// Records with `ruwe >= 1.4` are rejected by default (poorly fit astrometric solutions)
pub const DEFAULT_RUWE_MAX: f64 = 1.4;

/// Default row cap for one cone search
pub const DEFAULT_ROW_LIMIT: usize = 300_000;

/// Default cone radius when the target table leaves it empty
pub const DEFAULT_SEARCH_RADIUS_ARCMIN: ArcMin = 30.0;

/// Number of processed rows previewed in the debug log
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Global HTTP timeout; dense cluster queries routinely take minutes
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// Upper bound on a catalog response body (300k rows of CSV stay well below this)
pub const MAX_RESPONSE_BYTES: u64 = 512 * 1024 * 1024;

// -------------------------------------------------------------------------------------------------
// Gaia archive
// -------------------------------------------------------------------------------------------------

/// Synchronous TAP endpoint of the ESA Gaia archive
pub const GAIA_TAP_SYNC_URL: &str = "https://gea.esac.esa.int/tap-server/tap/sync";

/// Gaia DR3 main source table
pub const GAIA_DR3_SOURCE_TABLE: &str = "gaiadr3.gaia_source";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcminutes
pub type ArcMin = f64;
/// Angle in milliarcseconds (parallaxes)
pub type MilliArcSec = f64;
/// Photometric magnitude
pub type Magnitude = f64;
/// Velocity in km/s
pub type KmPerSec = f64;
/// Gaia `source_id`
pub type SourceId = i64;
