//! # Catalog records and the catalog client seam
//!
//! Typed representation of a cone-search answer and the trait every catalog backend
//! implements.
//!
//! Modules
//! -----------------
//! * [`gaia_tap`](crate::catalog::gaia_tap) – Gaia DR3 archive client (ADQL over TAP, CSV answer).
//! * *(crate-private)* `csv_reader` – strict decoding of a CSV answer into a [`RawResultSet`].
//!
//! Data Model
//! -----------------
//! * [`CatalogField`] – the closed set of columns the crate knows about. Column names coming
//!   from a service or from user configuration are parsed into it, so unknown names are
//!   rejected at the boundary.
//! * [`CatalogRecord`] – one source. Every measurement is an `Option`: a missing cell in
//!   the answer is `None`, never a sentinel number.
//! * [`RawResultSet`] – the ordered answer of one query, at most `row_limit` records long.
//!
//! Units
//! -----------------
//! Positions in **degrees**, parallaxes and parallax errors in **mas**, magnitudes in
//! **mag**, radial velocity in **km/s**, auxiliary `dist` (distance to the cone centre) in
//! **degrees**.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, KmPerSec, Magnitude, MilliArcSec, SourceId};
use crate::hr_errors::HrError;
use crate::region::{SearchRadius, SkyPosition};

pub mod gaia_tap;

mod csv_reader;

/// Columns of the Gaia `gaia_source` table used by the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogField {
    SourceId,
    Ra,
    Dec,
    Parallax,
    ParallaxError,
    PhotGMeanMag,
    PhotBpMeanMag,
    PhotRpMeanMag,
    Ruwe,
    RadialVelocity,
    /// Angular distance to the cone centre, computed by the query (auxiliary, never required).
    Dist,
}

impl CatalogField {
    /// The ten catalog columns requested by default, in query order.
    pub const QUERY_FIELDS: [CatalogField; 10] = [
        CatalogField::SourceId,
        CatalogField::Ra,
        CatalogField::Dec,
        CatalogField::Parallax,
        CatalogField::ParallaxError,
        CatalogField::PhotGMeanMag,
        CatalogField::PhotBpMeanMag,
        CatalogField::PhotRpMeanMag,
        CatalogField::Ruwe,
        CatalogField::RadialVelocity,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            CatalogField::SourceId => "source_id",
            CatalogField::Ra => "ra",
            CatalogField::Dec => "dec",
            CatalogField::Parallax => "parallax",
            CatalogField::ParallaxError => "parallax_error",
            CatalogField::PhotGMeanMag => "phot_g_mean_mag",
            CatalogField::PhotBpMeanMag => "phot_bp_mean_mag",
            CatalogField::PhotRpMeanMag => "phot_rp_mean_mag",
            CatalogField::Ruwe => "ruwe",
            CatalogField::RadialVelocity => "radial_velocity",
            CatalogField::Dist => "dist",
        }
    }

    /// `true` for columns computed by the query rather than stored in the catalog.
    pub fn is_auxiliary(&self) -> bool {
        matches!(self, CatalogField::Dist)
    }
}

impl fmt::Display for CatalogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for CatalogField {
    type Err = HrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        CatalogField::QUERY_FIELDS
            .iter()
            .chain(std::iter::once(&CatalogField::Dist))
            .find(|f| f.column_name().eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| HrError::UnknownCatalogField(name.to_string()))
    }
}

/// One catalog source as returned by a cone search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub source_id: SourceId,
    #[serde(default)]
    pub ra: Option<Degree>,
    #[serde(default)]
    pub dec: Option<Degree>,
    #[serde(default)]
    pub parallax: Option<MilliArcSec>,
    #[serde(default)]
    pub parallax_error: Option<MilliArcSec>,
    #[serde(default, rename = "phot_g_mean_mag")]
    pub g_mag: Option<Magnitude>,
    #[serde(default, rename = "phot_bp_mean_mag")]
    pub bp_mag: Option<Magnitude>,
    #[serde(default, rename = "phot_rp_mean_mag")]
    pub rp_mag: Option<Magnitude>,
    #[serde(default)]
    pub ruwe: Option<f64>,
    #[serde(default)]
    pub radial_velocity: Option<KmPerSec>,
    #[serde(default)]
    pub dist: Option<Degree>,
}

impl CatalogRecord {
    /// A record carrying only its identifier; every measurement is missing.
    pub fn new(source_id: SourceId) -> Self {
        CatalogRecord {
            source_id,
            ra: None,
            dec: None,
            parallax: None,
            parallax_error: None,
            g_mag: None,
            bp_mag: None,
            rp_mag: None,
            ruwe: None,
            radial_velocity: None,
            dist: None,
        }
    }

    /// Numeric value of a field, `None` when missing.
    pub fn value(&self, field: CatalogField) -> Option<f64> {
        match field {
            CatalogField::SourceId => Some(self.source_id as f64),
            CatalogField::Ra => self.ra,
            CatalogField::Dec => self.dec,
            CatalogField::Parallax => self.parallax,
            CatalogField::ParallaxError => self.parallax_error,
            CatalogField::PhotGMeanMag => self.g_mag,
            CatalogField::PhotBpMeanMag => self.bp_mag,
            CatalogField::PhotRpMeanMag => self.rp_mag,
            CatalogField::Ruwe => self.ruwe,
            CatalogField::RadialVelocity => self.radial_velocity,
            CatalogField::Dist => self.dist,
        }
    }

    /// `true` when the field holds a finite value; `NaN` and infinities count as missing.
    pub fn has(&self, field: CatalogField) -> bool {
        self.value(field).is_some_and(f64::is_finite)
    }

    /// Turn non-finite values (`NaN`, `inf`) into missing ones.
    pub(crate) fn drop_non_finite(mut self) -> Self {
        for slot in [
            &mut self.ra,
            &mut self.dec,
            &mut self.parallax,
            &mut self.parallax_error,
            &mut self.g_mag,
            &mut self.bp_mag,
            &mut self.rp_mag,
            &mut self.ruwe,
            &mut self.radial_velocity,
            &mut self.dist,
        ] {
            if slot.is_some_and(|v| !v.is_finite()) {
                *slot = None;
            }
        }
        self
    }
}

/// Ordered answer of one cone search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultSet {
    records: Vec<CatalogRecord>,
}

impl RawResultSet {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        RawResultSet { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.records
    }

    /// Fail on the first `source_id` seen twice.
    ///
    /// Return
    /// ----------
    /// * `Err(HrError::DuplicateSourceId)` with the first repeated `source_id`.
    pub fn ensure_unique_ids(&self) -> Result<(), HrError> {
        let mut seen: HashSet<SourceId, RandomState> =
            HashSet::with_capacity_and_hasher(self.records.len(), RandomState::default());
        for record in &self.records {
            if !seen.insert(record.source_id) {
                return Err(HrError::DuplicateSourceId(record.source_id));
            }
        }
        Ok(())
    }
}

impl From<Vec<CatalogRecord>> for RawResultSet {
    fn from(records: Vec<CatalogRecord>) -> Self {
        RawResultSet::new(records)
    }
}

impl IntoIterator for RawResultSet {
    type Item = CatalogRecord;
    type IntoIter = std::vec::IntoIter<CatalogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// A remote (or in-memory) catalog able to answer cone searches.
///
/// Implementations must return at most `row_limit` records and expose every requested
/// field by name; a failure of any kind is reported as an [`HrError`] and no partial result
/// is returned. The call is the single blocking step of a pipeline run.
pub trait CatalogClient {
    fn search(
        &self,
        position: &SkyPosition,
        radius: SearchRadius,
        row_limit: usize,
        fields: &[CatalogField],
    ) -> Result<RawResultSet, HrError>;

    /// Human-readable name of the backing service, used in log lines.
    fn service_name(&self) -> &str {
        "catalog"
    }
}

impl<C: CatalogClient + ?Sized> CatalogClient for &C {
    fn search(
        &self,
        position: &SkyPosition,
        radius: SearchRadius,
        row_limit: usize,
        fields: &[CatalogField],
    ) -> Result<RawResultSet, HrError> {
        (**self).search(position, radius, row_limit, fields)
    }

    fn service_name(&self) -> &str {
        (**self).service_name()
    }
}

impl<C: CatalogClient + ?Sized> CatalogClient for Box<C> {
    fn search(
        &self,
        position: &SkyPosition,
        radius: SearchRadius,
        row_limit: usize,
        fields: &[CatalogField],
    ) -> Result<RawResultSet, HrError> {
        (**self).search(position, radius, row_limit, fields)
    }

    fn service_name(&self) -> &str {
        (**self).service_name()
    }
}
