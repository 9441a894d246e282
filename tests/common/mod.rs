#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use gaia_hr::catalog::{CatalogClient, CatalogField, CatalogRecord, RawResultSet};
use gaia_hr::hr_errors::HrError;
use gaia_hr::region::{Region, SearchRadius, SkyPosition};

type Answer =
    dyn Fn(&SkyPosition, SearchRadius, usize, &[CatalogField]) -> Result<RawResultSet, HrError>
        + Send
        + Sync;

/// Catalog client answering from a closure and counting its invocations.
pub struct MockCatalogClient {
    answer: Box<Answer>,
    calls: AtomicUsize,
}

impl MockCatalogClient {
    pub fn new<F>(answer: F) -> Self
    where
        F: Fn(&SkyPosition, SearchRadius, usize, &[CatalogField]) -> Result<RawResultSet, HrError>
            + Send
            + Sync
            + 'static,
    {
        MockCatalogClient {
            answer: Box::new(answer),
            calls: AtomicUsize::new(0),
        }
    }

    /// Same records for every search.
    pub fn fixed(records: Vec<CatalogRecord>) -> Self {
        Self::new(move |_, _, _, _| Ok(RawResultSet::new(records.clone())))
    }

    pub fn failing() -> Self {
        Self::new(|_, _, _, _| Err(HrError::CatalogQueryFailed("service unavailable".into())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CatalogClient for MockCatalogClient {
    fn search(
        &self,
        position: &SkyPosition,
        radius: SearchRadius,
        row_limit: usize,
        fields: &[CatalogField],
    ) -> Result<RawResultSet, HrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.answer)(position, radius, row_limit, fields)
    }

    fn service_name(&self) -> &str {
        "mock catalog"
    }
}

/// A star passing the default quality cut.
pub fn good_star(source_id: i64, parallax: f64, g_mag: f64) -> CatalogRecord {
    CatalogRecord {
        ra: Some(201.7),
        dec: Some(-47.48),
        parallax: Some(parallax),
        parallax_error: Some(0.1),
        g_mag: Some(g_mag),
        bp_mag: Some(g_mag + 0.4),
        rp_mag: Some(g_mag - 0.5),
        ruwe: Some(1.0),
        ..CatalogRecord::new(source_id)
    }
}

pub fn region(name: &str, ra: f64, dec: f64) -> Region {
    Region::new(name, SkyPosition::new(ra, dec).unwrap())
}

pub fn omega_centauri() -> Region {
    region("Omega Centauri", 201.697, -47.4794)
}

pub fn arcmin(v: f64) -> SearchRadius {
    SearchRadius::from_arcmin(v).unwrap()
}
