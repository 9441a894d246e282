//! Derived photometric quantities.
//!
//! * colour index `BP − RP`,
//! * absolute G magnitude `M_G = G + 5·log10(ϖ) − 10` with the parallax `ϖ` in mas.
//!
//! Both are total functions: an undefined value (missing band, non-positive or missing
//! parallax) is `NaN` in the output record, never an error, and the record is kept.
use crate::catalog::CatalogRecord;
use crate::constants::{Magnitude, MilliArcSec};
use crate::quality_filter::FilteredResultSet;

/// A filtered catalog record with its two derived values.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub record: CatalogRecord,
    pub bp_rp_color: Magnitude,
    pub abs_g_mag: Magnitude,
}

impl AnalysisRecord {
    pub fn from_record(record: CatalogRecord) -> Self {
        let bp_rp_color = color_index(record.bp_mag, record.rp_mag);
        let abs_g_mag = absolute_magnitude(record.g_mag, record.parallax);
        AnalysisRecord {
            record,
            bp_rp_color,
            abs_g_mag,
        }
    }

    /// `true` iff both derived values are finite.
    pub fn is_plottable(&self) -> bool {
        self.bp_rp_color.is_finite() && self.abs_g_mag.is_finite()
    }
}

/// `BP − RP`, `NaN` when either band is missing.
pub fn color_index(bp: Option<Magnitude>, rp: Option<Magnitude>) -> Magnitude {
    match (bp, rp) {
        (Some(bp), Some(rp)) => bp - rp,
        _ => f64::NAN,
    }
}

/// Absolute magnitude from an apparent magnitude and a parallax in milliarcseconds.
///
/// The distance modulus in parsecs is `5·log10(d) − 5` with `d = 1000 / ϖ`, which reduces
/// to `M = m + 5·log10(ϖ) − 10`.
///
/// Return
/// ----------
/// * `NaN` if the magnitude is missing or the parallax is missing, non-finite or `<= 0`.
pub fn absolute_magnitude(mag: Option<Magnitude>, parallax: Option<MilliArcSec>) -> Magnitude {
    match (mag, parallax) {
        (Some(m), Some(plx)) if plx.is_finite() && plx > 0.0 => m + 5.0 * plx.log10() - 10.0,
        _ => f64::NAN,
    }
}

/// Attach derived values to every record, preserving count and order.
pub fn derive(filtered: FilteredResultSet) -> Vec<AnalysisRecord> {
    filtered
        .into_records()
        .into_iter()
        .map(AnalysisRecord::from_record)
        .collect()
}

#[cfg(test)]
mod derived_fields_test {
    use super::*;
    use crate::catalog::RawResultSet;
    use crate::quality_filter::QualityFilter;
    use approx::assert_relative_eq;

    #[test]
    fn test_absolute_magnitude() {
        assert_relative_eq!(
            absolute_magnitude(Some(15.0), Some(2.0)),
            6.505149978319906,
            epsilon = 1e-12
        );
        // 10 mas -> 100 pc -> distance modulus 5
        assert_relative_eq!(absolute_magnitude(Some(12.0), Some(10.0)), 7.0);
        assert!(absolute_magnitude(Some(15.0), Some(-1.0)).is_nan());
        assert!(absolute_magnitude(Some(15.0), Some(0.0)).is_nan());
        assert!(absolute_magnitude(Some(15.0), None).is_nan());
        assert!(absolute_magnitude(None, Some(2.0)).is_nan());
        assert!(absolute_magnitude(Some(15.0), Some(f64::INFINITY)).is_nan());
    }

    #[test]
    fn test_color_index() {
        assert_relative_eq!(color_index(Some(15.4), Some(14.5)), 0.9, epsilon = 1e-12);
        assert!(color_index(None, Some(14.5)).is_nan());
        assert!(color_index(Some(15.4), None).is_nan());
    }

    #[test]
    fn test_negative_parallax_keeps_record() {
        let rec = CatalogRecord {
            parallax: Some(-1.0),
            g_mag: Some(15.0),
            bp_mag: Some(15.5),
            rp_mag: Some(14.6),
            ..CatalogRecord::new(9)
        };
        let out = derive(QualityFilter::passthrough(RawResultSet::new(vec![rec])));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.source_id, 9);
        assert!(out[0].abs_g_mag.is_nan());
        assert_relative_eq!(out[0].bp_rp_color, 0.9, epsilon = 1e-12);
        assert!(!out[0].is_plottable());
    }

    #[test]
    fn test_derive_preserves_cardinality() {
        let records: Vec<CatalogRecord> = (0..50)
            .map(|i| CatalogRecord {
                parallax: Some(i as f64 - 10.0),
                g_mag: (i % 4 != 0).then_some(14.0),
                ..CatalogRecord::new(i)
            })
            .collect();
        let out = derive(QualityFilter::passthrough(RawResultSet::new(records)));
        assert_eq!(out.len(), 50);
        assert!(out.iter().enumerate().all(|(i, a)| a.record.source_id == i as i64));
        assert!(out.iter().all(|a| a.bp_rp_color.is_nan()));
    }
}
