//! # Gaia archive TAP client
//!
//! [`GaiaTapClient`] answers cone searches with one **synchronous** ADQL query against the
//! ESA Gaia archive (`/tap-server/tap/sync`) and asks for a CSV answer:
//!
//! ```text
//! SELECT TOP {row_limit} {fields},
//!        DISTANCE(POINT('ICRS', ra, dec), POINT('ICRS', {ra0}, {dec0})) AS dist
//! FROM gaiadr3.gaia_source
//! WHERE 1 = CONTAINS(POINT('ICRS', ra, dec), CIRCLE('ICRS', {ra0}, {dec0}, {radius_deg}))
//! ORDER BY dist ASC
//! ```
//!
//! Rows are ordered by distance to the cone centre, so truncation by `TOP` keeps the
//! innermost sources. The answer is decoded strictly (see `csv_reader`).
//!
//! The endpoint and the table can be swapped for a mirror or a local test server with
//! [`GaiaTapClient::with_endpoint`] and [`GaiaTapClient::with_table`].
use itertools::Itertools;

use super::csv_reader::decode_catalog_csv;
use super::{CatalogClient, CatalogField, RawResultSet};
use crate::constants::{GAIA_DR3_SOURCE_TABLE, GAIA_TAP_SYNC_URL};
use crate::env_state::HrEnv;
use crate::hr_errors::HrError;
use crate::region::{SearchRadius, SkyPosition};

#[derive(Debug, Clone)]
pub struct GaiaTapClient {
    env: HrEnv,
    endpoint: String,
    table: String,
}

impl GaiaTapClient {
    pub fn new(env: HrEnv) -> Self {
        GaiaTapClient {
            env,
            endpoint: GAIA_TAP_SYNC_URL.to_string(),
            table: GAIA_DR3_SOURCE_TABLE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the ADQL cone-search query.
    ///
    /// `source_id` is always selected first; the auxiliary `dist` column is computed by the
    /// query itself and is never taken from `fields`.
    pub fn build_adql(
        &self,
        position: &SkyPosition,
        radius: SearchRadius,
        row_limit: usize,
        fields: &[CatalogField],
    ) -> String {
        let columns = std::iter::once(CatalogField::SourceId)
            .chain(fields.iter().copied())
            .filter(|f| !f.is_auxiliary())
            .unique()
            .map(|f| f.column_name())
            .join(", ");

        let (ra0, dec0) = (position.ra(), position.dec());
        format!(
            "SELECT TOP {row_limit} {columns}, \
             DISTANCE(POINT('ICRS', ra, dec), POINT('ICRS', {ra0}, {dec0})) AS dist \
             FROM {table} \
             WHERE 1 = CONTAINS(POINT('ICRS', ra, dec), CIRCLE('ICRS', {ra0}, {dec0}, {r})) \
             ORDER BY dist ASC",
            table = self.table,
            r = radius.degrees(),
        )
    }
}

/// The archive reports query errors as a VOTable document instead of CSV.
fn reject_votable_error(body: &str) -> Result<(), HrError> {
    let head = body.trim_start();
    if head.starts_with('<') {
        let snippet: String = head.chars().take(300).collect();
        return Err(HrError::CatalogQueryFailed(format!(
            "archive answered with an XML document instead of CSV: {snippet}"
        )));
    }
    Ok(())
}

impl CatalogClient for GaiaTapClient {
    fn search(
        &self,
        position: &SkyPosition,
        radius: SearchRadius,
        row_limit: usize,
        fields: &[CatalogField],
    ) -> Result<RawResultSet, HrError> {
        let query = self.build_adql(position, radius, row_limit, fields);
        tracing::debug!(endpoint = %self.endpoint, %query, "Submitting ADQL query");

        let body = self.env.post_form(
            &self.endpoint,
            [
                ("REQUEST", "doQuery"),
                ("LANG", "ADQL"),
                ("FORMAT", "csv"),
                ("QUERY", query.as_str()),
            ],
        )?;
        reject_votable_error(&body)?;

        decode_catalog_csv(&body, fields)
    }

    fn service_name(&self) -> &str {
        "Gaia DR3"
    }
}
