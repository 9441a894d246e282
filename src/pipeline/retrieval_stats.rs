use std::fmt;

use crate::constants::MilliArcSec;
use crate::derived_fields::AnalysisRecord;
use crate::quality_filter::{FilterBreakdown, FilterParams, FilteredResultSet};

/// Counts of one pipeline run, computed once when the run completes.
///
/// `removed_count = raw_count - filtered_count` always holds; on the passthrough path
/// both counts are equal and no thresholds are recorded.
///
/// Display
/// -----------------
/// Compact by default, multi-line with the alternate flag:
///
/// ```text
/// Retrieval statistics
/// --------------------
/// raw rows        : 1200
/// kept            : 950
/// removed         : 250
///   missing fields: 180
///   parallax_error: 12
///   ruwe          : 58
/// thresholds      : parallax_error < 5 mas, ruwe < 1.4
/// undefined M_G   : 0
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalStats {
    raw_count: usize,
    filtered_count: usize,
    parallax_error_max: Option<MilliArcSec>,
    ruwe_max: Option<f64>,
    breakdown: FilterBreakdown,
    undefined_abs_mag_count: usize,
}

impl RetrievalStats {
    pub(crate) fn new(filtered: &FilteredResultSet, params: &FilterParams) -> Self {
        let applied = filtered.filters_applied();
        RetrievalStats {
            raw_count: filtered.raw_count(),
            filtered_count: filtered.filtered_count(),
            parallax_error_max: applied.then_some(params.parallax_error_max()),
            ruwe_max: applied.then_some(params.ruwe_max()),
            breakdown: filtered.breakdown(),
            undefined_abs_mag_count: 0,
        }
    }

    /// Complete the counts once the derived values exist.
    pub(crate) fn with_derived(mut self, derived: &[AnalysisRecord]) -> Self {
        self.undefined_abs_mag_count = derived.iter().filter(|a| a.abs_g_mag.is_nan()).count();
        self
    }

    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_count
    }

    pub fn removed_count(&self) -> usize {
        self.raw_count - self.filtered_count
    }

    pub fn filters_applied(&self) -> bool {
        self.parallax_error_max.is_some()
    }

    /// `(parallax_error_max, ruwe_max)` used by the run, `None` on the passthrough path.
    pub fn thresholds(&self) -> Option<(MilliArcSec, f64)> {
        self.parallax_error_max.zip(self.ruwe_max)
    }

    pub fn breakdown(&self) -> FilterBreakdown {
        self.breakdown
    }

    /// Records whose absolute magnitude is undefined (non-positive or missing parallax).
    pub fn undefined_abs_mag_count(&self) -> usize {
        self.undefined_abs_mag_count
    }
}

impl fmt::Display for RetrievalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Retrieval statistics")?;
            writeln!(f, "--------------------")?;
            writeln!(f, "raw rows        : {}", self.raw_count)?;
            writeln!(f, "kept            : {}", self.filtered_count)?;
            writeln!(f, "removed         : {}", self.removed_count())?;
            match self.thresholds() {
                Some((plx, ruwe)) => {
                    writeln!(f, "  missing fields: {}", self.breakdown.missing_required)?;
                    writeln!(f, "  parallax_error: {}", self.breakdown.parallax_error_rejected)?;
                    writeln!(f, "  ruwe          : {}", self.breakdown.ruwe_rejected)?;
                    writeln!(f, "thresholds      : parallax_error < {plx} mas, ruwe < {ruwe}")?;
                }
                None => writeln!(f, "thresholds      : none (filters disabled)")?,
            }
            write!(f, "undefined M_G   : {}", self.undefined_abs_mag_count)
        } else {
            write!(
                f,
                "raw={}, kept={}, removed={}, filters={}, undefined_abs_mag={}",
                self.raw_count,
                self.filtered_count,
                self.removed_count(),
                if self.filters_applied() { "on" } else { "off" },
                self.undefined_abs_mag_count
            )
        }
    }
}

#[cfg(test)]
mod retrieval_stats_test {
    use super::*;
    use crate::catalog::{CatalogRecord, RawResultSet};
    use crate::derived_fields::derive;
    use crate::quality_filter::QualityFilter;

    fn raw() -> RawResultSet {
        RawResultSet::new(vec![
            CatalogRecord {
                parallax: Some(-0.5),
                parallax_error: Some(0.2),
                g_mag: Some(18.0),
                bp_mag: Some(18.5),
                rp_mag: Some(17.6),
                ruwe: Some(1.0),
                ..CatalogRecord::new(1)
            },
            CatalogRecord::new(2),
        ])
    }

    #[test]
    fn test_filtered_stats() {
        let params = FilterParams::default();
        let filtered = QualityFilter::new(params.clone()).filter(raw());
        let stats = RetrievalStats::new(&filtered, &params).with_derived(&derive(filtered));

        assert_eq!(stats.raw_count(), 2);
        assert_eq!(stats.filtered_count(), 1);
        assert_eq!(stats.removed_count(), 1);
        assert_eq!(stats.thresholds(), Some((5.0, 1.4)));
        assert_eq!(stats.undefined_abs_mag_count(), 1);
        assert_eq!(
            stats.to_string(),
            "raw=2, kept=1, removed=1, filters=on, undefined_abs_mag=1"
        );
        let pretty = format!("{stats:#}");
        assert!(pretty.contains("thresholds      : parallax_error < 5 mas, ruwe < 1.4"));
        assert!(pretty.contains("  missing fields: 1"));
    }

    #[test]
    fn test_passthrough_stats() {
        let params = FilterParams::default();
        let passed = QualityFilter::passthrough(raw());
        let stats = RetrievalStats::new(&passed, &params).with_derived(&derive(passed));

        assert_eq!(stats.removed_count(), 0);
        assert!(!stats.filters_applied());
        assert_eq!(stats.thresholds(), None);
        assert_eq!(stats.undefined_abs_mag_count(), 2);
        assert!(format!("{stats:#}").contains("none (filters disabled)"));
    }
}
