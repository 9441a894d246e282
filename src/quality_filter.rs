//! # Quality filtering of raw catalog answers
//!
//! Turns a [`RawResultSet`] into a [`FilteredResultSet`] in three stable passes:
//!
//! 1. **completeness** – drop every record missing a value (or holding a non-finite one) in
//!    one of [`FilterParams::required_fields`];
//! 2. **astrometric precision** – keep only records with `parallax_error < parallax_error_max`;
//! 3. **fit quality** – keep only records with `ruwe < quality_indicator_max`.
//!
//! A record whose `parallax_error` (or `ruwe`) is missing but not listed as required is
//! dropped by the corresponding threshold pass: a missing value is never below a threshold.
//!
//! Filtering is a total function (no error path) and preserves the input order, so the
//! output is always an ordered subset of the input with untouched field values.
//! Filtering can also be bypassed with [`QualityFilter::passthrough`], which forwards the
//! raw set unchanged.
//!
//! ## Example
//!
//! ```rust
//! use gaia_hr::catalog::{CatalogRecord, RawResultSet};
//! use gaia_hr::quality_filter::{FilterParams, QualityFilter};
//!
//! let raw = RawResultSet::new(vec![CatalogRecord::new(1)]);
//! let params = FilterParams::builder().ruwe_max(1.2).build().unwrap();
//! let filtered = QualityFilter::new(params).filter(raw);
//! assert_eq!(filtered.removed_count(), 1);
//! ```
use std::cmp::Ordering::Greater;
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::catalog::{CatalogField, CatalogRecord, RawResultSet};
use crate::constants::{MilliArcSec, DEFAULT_PARALLAX_ERROR_MAX, DEFAULT_RUWE_MAX};
use crate::hr_errors::HrError;

/// Thresholds and completeness requirements of the quality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParams {
    /// Records with `parallax_error >= parallax_error_max` (mas) are rejected.
    parallax_error_max: MilliArcSec,
    /// Records with `ruwe >= quality_indicator_max` are rejected.
    quality_indicator_max: f64,
    /// Fields that must be present (and finite) in a record for it to survive.
    required_fields: BTreeSet<CatalogField>,
}

impl FilterParams {
    /// Fields required by default: the three magnitudes, parallax and its error, and RUWE.
    pub const DEFAULT_REQUIRED_FIELDS: [CatalogField; 6] = [
        CatalogField::PhotGMeanMag,
        CatalogField::PhotBpMeanMag,
        CatalogField::PhotRpMeanMag,
        CatalogField::Parallax,
        CatalogField::ParallaxError,
        CatalogField::Ruwe,
    ];

    pub fn builder() -> FilterParamsBuilder {
        FilterParamsBuilder::new()
    }

    pub fn parallax_error_max(&self) -> MilliArcSec {
        self.parallax_error_max
    }

    /// Upper bound (exclusive) on RUWE.
    pub fn ruwe_max(&self) -> f64 {
        self.quality_indicator_max
    }

    pub fn required_fields(&self) -> &BTreeSet<CatalogField> {
        &self.required_fields
    }

    /// Return true iff x > 0.0, finite and comparable (i.e., not NaN).
    #[inline]
    fn finite_gt0(x: f64) -> bool {
        x.is_finite() && x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Check the thresholds and the required-field set.
    ///
    /// Validation rules
    /// -----------------
    /// * `parallax_error_max` and `ruwe_max` are finite and strictly positive.
    /// * the required-field set does not contain the auxiliary `dist` column.
    ///
    /// Returns
    /// -----------------
    /// * `Err(HrError::InvalidFilterParameter)` on the first violated rule.
    pub fn validate(&self) -> Result<(), HrError> {
        if !Self::finite_gt0(self.parallax_error_max) {
            return Err(HrError::InvalidFilterParameter(format!(
                "parallax_error_max must be finite and > 0 (got {})",
                self.parallax_error_max
            )));
        }
        if !Self::finite_gt0(self.quality_indicator_max) {
            return Err(HrError::InvalidFilterParameter(format!(
                "ruwe_max must be finite and > 0 (got {})",
                self.quality_indicator_max
            )));
        }
        if let Some(aux) = self.required_fields.iter().find(|f| f.is_auxiliary()) {
            return Err(HrError::InvalidFilterParameter(format!(
                "'{aux}' is computed by the query and cannot be required"
            )));
        }
        Ok(())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams {
            parallax_error_max: DEFAULT_PARALLAX_ERROR_MAX,
            quality_indicator_max: DEFAULT_RUWE_MAX,
            required_fields: Self::DEFAULT_REQUIRED_FIELDS.into_iter().collect(),
        }
    }
}

impl fmt::Display for FilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Quality filter")?;
            writeln!(f, "--------------")?;
            writeln!(f, "  parallax_error_max = {} mas", self.parallax_error_max)?;
            writeln!(f, "  ruwe_max           = {}", self.quality_indicator_max)?;
            write!(
                f,
                "  required_fields    = [{}]",
                self.required_fields.iter().join(", ")
            )
        } else {
            write!(
                f,
                "parallax_error < {} mas, ruwe < {}, {} required fields",
                self.parallax_error_max,
                self.quality_indicator_max,
                self.required_fields.len()
            )
        }
    }
}

/// Builder for [`FilterParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct FilterParamsBuilder {
    params: FilterParams,
}

impl FilterParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: FilterParams::default(),
        }
    }

    pub fn parallax_error_max(mut self, v: MilliArcSec) -> Self {
        self.params.parallax_error_max = v;
        self
    }

    pub fn ruwe_max(mut self, v: f64) -> Self {
        self.params.quality_indicator_max = v;
        self
    }

    /// Replace the whole required-field set.
    pub fn required_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = CatalogField>,
    {
        self.params.required_fields = fields.into_iter().collect();
        self
    }

    pub fn require(mut self, field: CatalogField) -> Self {
        self.params.required_fields.insert(field);
        self
    }

    /// Finalize the builder, see [`FilterParams::validate`].
    pub fn build(self) -> Result<FilterParams, HrError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// How many records each pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterBreakdown {
    pub missing_required: usize,
    pub parallax_error_rejected: usize,
    pub ruwe_rejected: usize,
}

impl FilterBreakdown {
    pub fn total(&self) -> usize {
        self.missing_required + self.parallax_error_rejected + self.ruwe_rejected
    }
}

impl fmt::Display for FilterBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing fields: {}, parallax_error: {}, ruwe: {}",
            self.missing_required, self.parallax_error_rejected, self.ruwe_rejected
        )
    }
}

/// Records that survived the quality filter (or the raw set itself on the passthrough path).
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredResultSet {
    records: Vec<CatalogRecord>,
    raw_count: usize,
    filters_applied: bool,
    breakdown: FilterBreakdown,
}

impl FilteredResultSet {
    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    pub fn filtered_count(&self) -> usize {
        self.records.len()
    }

    pub fn removed_count(&self) -> usize {
        self.raw_count - self.records.len()
    }

    pub fn filters_applied(&self) -> bool {
        self.filters_applied
    }

    pub fn breakdown(&self) -> FilterBreakdown {
        self.breakdown
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityFilter {
    params: FilterParams,
}

impl QualityFilter {
    pub fn new(params: FilterParams) -> Self {
        QualityFilter { params }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    fn is_complete(&self, record: &CatalogRecord) -> bool {
        self.params.required_fields.iter().all(|f| record.has(*f))
    }

    fn precise_enough(&self, record: &CatalogRecord) -> bool {
        record
            .parallax_error
            .is_some_and(|e| e < self.params.parallax_error_max)
    }

    fn well_fitted(&self, record: &CatalogRecord) -> bool {
        record
            .ruwe
            .is_some_and(|r| r < self.params.quality_indicator_max)
    }

    /// `true` if the record passes all three passes.
    pub fn accepts(&self, record: &CatalogRecord) -> bool {
        self.is_complete(record) && self.precise_enough(record) && self.well_fitted(record)
    }

    /// Apply the three passes in order.
    ///
    /// Arguments
    /// -----------------
    /// * `raw`: the catalog answer, consumed.
    ///
    /// Return
    /// ----------
    /// * The surviving records in their original order, with the raw count and the number of
    ///   records removed by each pass.
    pub fn filter(&self, raw: RawResultSet) -> FilteredResultSet {
        let raw_count = raw.len();
        let mut records = raw.into_records();
        let mut breakdown = FilterBreakdown::default();

        let before = records.len();
        records.retain(|r| self.is_complete(r));
        breakdown.missing_required = before - records.len();

        let before = records.len();
        records.retain(|r| self.precise_enough(r));
        breakdown.parallax_error_rejected = before - records.len();

        let before = records.len();
        records.retain(|r| self.well_fitted(r));
        breakdown.ruwe_rejected = before - records.len();

        FilteredResultSet {
            records,
            raw_count,
            filters_applied: true,
            breakdown,
        }
    }

    /// Forward the raw set unchanged (filters disabled).
    pub fn passthrough(raw: RawResultSet) -> FilteredResultSet {
        FilteredResultSet {
            raw_count: raw.len(),
            records: raw.into_records(),
            filters_applied: false,
            breakdown: FilterBreakdown::default(),
        }
    }
}

#[cfg(test)]
mod quality_filter_test {
    use super::*;

    fn good(id: i64) -> CatalogRecord {
        CatalogRecord {
            ra: Some(201.7),
            dec: Some(-47.5),
            parallax: Some(2.0),
            parallax_error: Some(0.1),
            g_mag: Some(15.0),
            bp_mag: Some(15.4),
            rp_mag: Some(14.5),
            ruwe: Some(1.0),
            ..CatalogRecord::new(id)
        }
    }

    #[test]
    fn test_default_params() {
        let p = FilterParams::default();
        assert_eq!(p.parallax_error_max, 5.0);
        assert_eq!(p.quality_indicator_max, 1.4);
        assert_eq!(p.required_fields.len(), 6);
        assert!(!p.required_fields.contains(&CatalogField::RadialVelocity));
        assert_eq!(
            format!("{p}"),
            "parallax_error < 5 mas, ruwe < 1.4, 6 required fields"
        );
    }

    #[test]
    fn test_builder_validation() {
        assert!(FilterParams::builder().ruwe_max(2.0).build().is_ok());
        assert!(matches!(
            FilterParams::builder().parallax_error_max(0.0).build(),
            Err(HrError::InvalidFilterParameter(_))
        ));
        assert!(FilterParams::builder().ruwe_max(f64::NAN).build().is_err());
        assert!(FilterParams::builder()
            .parallax_error_max(f64::INFINITY)
            .build()
            .is_err());
        let err = FilterParams::builder()
            .require(CatalogField::Dist)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unchecked_params_rejected_by_pipeline_config() {
        let params = FilterParams {
            parallax_error_max: f64::NAN,
            quality_indicator_max: -1.0,
            ..FilterParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(HrError::InvalidFilterParameter(_))
        ));

        let err = crate::pipeline::PipelineConfig::builder()
            .filter(params)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_non_finite_required_value_is_missing() {
        let nan_bp = CatalogRecord {
            bp_mag: Some(f64::NAN),
            ..good(1)
        };
        let nan_g = CatalogRecord {
            g_mag: Some(f64::NAN),
            ..good(2)
        };
        let inf_parallax = CatalogRecord {
            parallax: Some(f64::INFINITY),
            ..good(3)
        };
        let raw = RawResultSet::new(vec![nan_bp, nan_g, inf_parallax, good(4)]);

        let filtered = QualityFilter::default().filter(raw);
        assert_eq!(filtered.filtered_count(), 1);
        assert_eq!(filtered.records()[0].source_id, 4);
        assert_eq!(filtered.breakdown().missing_required, 3);
    }

    #[test]
    fn test_three_record_scenario() {
        let missing_ruwe = CatalogRecord {
            ruwe: None,
            ..good(1)
        };
        let imprecise = CatalogRecord {
            parallax_error: Some(6.0),
            ..good(2)
        };
        let raw = RawResultSet::new(vec![missing_ruwe, imprecise, good(3)]);

        let filtered = QualityFilter::default().filter(raw);
        assert_eq!(filtered.raw_count(), 3);
        assert_eq!(filtered.filtered_count(), 1);
        assert_eq!(filtered.removed_count(), 2);
        assert_eq!(filtered.records()[0].source_id, 3);
        assert_eq!(
            filtered.breakdown(),
            FilterBreakdown {
                missing_required: 1,
                parallax_error_rejected: 1,
                ruwe_rejected: 0
            }
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let at_parallax_limit = CatalogRecord {
            parallax_error: Some(5.0),
            ..good(1)
        };
        let at_ruwe_limit = CatalogRecord {
            ruwe: Some(1.4),
            ..good(2)
        };
        let just_below = CatalogRecord {
            parallax_error: Some(4.999),
            ruwe: Some(1.399),
            ..good(3)
        };
        let filter = QualityFilter::default();
        assert!(!filter.accepts(&at_parallax_limit));
        assert!(!filter.accepts(&at_ruwe_limit));
        assert!(filter.accepts(&just_below));

        let filtered =
            filter.filter(RawResultSet::new(vec![at_parallax_limit, at_ruwe_limit, just_below]));
        assert_eq!(filtered.breakdown().total(), 2);
        assert_eq!(filtered.records()[0].source_id, 3);
    }

    #[test]
    fn test_missing_threshold_field_not_required() {
        // ruwe not required, but still needed by the threshold pass
        let params = FilterParams::builder()
            .required_fields([CatalogField::PhotGMeanMag, CatalogField::Parallax])
            .build()
            .unwrap();
        let no_ruwe = CatalogRecord {
            ruwe: None,
            ..good(1)
        };
        let filtered = QualityFilter::new(params).filter(RawResultSet::new(vec![no_ruwe, good(2)]));
        assert_eq!(filtered.filtered_count(), 1);
        assert_eq!(filtered.breakdown().ruwe_rejected, 1);
        assert_eq!(filtered.breakdown().missing_required, 0);
    }

    #[test]
    fn test_order_and_values_preserved() {
        let raw: Vec<CatalogRecord> = (0..20)
            .map(|i| CatalogRecord {
                ruwe: Some(if i % 3 == 0 { 2.0 } else { 1.0 }),
                radial_velocity: (i % 2 == 0).then_some(i as f64),
                ..good(i)
            })
            .collect();
        let filtered = QualityFilter::default().filter(RawResultSet::new(raw.clone()));

        let ids: Vec<i64> = filtered.records().iter().map(|r| r.source_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for rec in filtered.records() {
            let original = raw.iter().find(|r| r.source_id == rec.source_id).unwrap();
            assert_eq!(rec, original);
        }
        assert_eq!(filtered.filtered_count(), 13);
    }

    #[test]
    fn test_empty_raw_set() {
        let filtered = QualityFilter::default().filter(RawResultSet::default());
        assert!(filtered.is_empty());
        assert_eq!(filtered.raw_count(), 0);
        assert_eq!(filtered.removed_count(), 0);
        assert!(filtered.filters_applied());
    }

    #[test]
    fn test_passthrough_is_identity() {
        let raw = RawResultSet::new(vec![CatalogRecord::new(1), good(2)]);
        let passed = QualityFilter::passthrough(raw.clone());
        assert_eq!(passed.records(), raw.records());
        assert_eq!(passed.removed_count(), 0);
        assert!(!passed.filters_applied());
    }
}
