//! # Retrieval pipeline
//!
//! Orchestrates one cone search end to end:
//!
//! ```text
//! REQUESTED ──► RAW_RECEIVED ──► FILTERED ───┬──► DERIVED ──► DONE
//!                         └────► PASSTHROUGH ┘
//! ```
//!
//! * `REQUESTED → RAW_RECEIVED`: the [`CatalogClient`] call, the only blocking step. Any
//!   failure aborts the run with a retrieval error and no partial result. The answer is then
//!   checked against the row cap and for duplicated identifiers.
//! * `RAW_RECEIVED → FILTERED | PASSTHROUGH`: [`QualityFilter`] when `apply_filters` is set,
//!   otherwise the raw set is forwarded untouched.
//! * `→ DERIVED`: [`derive`] always runs.
//! * `DERIVED → DONE`: the records and their [`RetrievalStats`] are frozen into a
//!   [`PipelineResult`].
//!
//! Every transition emits one `tracing` event carrying a `region` field. Inputs are
//! validated before the catalog is contacted, so configuration errors never cost a query.
//!
//! The pipeline holds no mutable state: a [`RetrievalPipeline`] can be shared between
//! threads (given a `Sync` client) and re-running it is idempotent.
use std::fmt;

use tracing::{debug, info, Level};

use crate::catalog::{CatalogClient, CatalogField, RawResultSet};
use crate::constants::DEFAULT_SAMPLE_ROWS;
use crate::derived_fields::{derive, AnalysisRecord};
use crate::display::AnalysisDisplay;
use crate::hr_errors::HrError;
use crate::quality_filter::{FilterParams, QualityFilter};
use crate::region::{Region, SearchRadius};

pub mod retrieval_stats;

pub use retrieval_stats::RetrievalStats;

/// States of a pipeline run, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Requested,
    RawReceived,
    Filtered,
    Passthrough,
    Derived,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Requested => "REQUESTED",
            PipelineStage::RawReceived => "RAW_RECEIVED",
            PipelineStage::Filtered => "FILTERED",
            PipelineStage::Passthrough => "PASSTHROUGH",
            PipelineStage::Derived => "DERIVED",
            PipelineStage::Done => "DONE",
        };
        f.write_str(s)
    }
}

/// Constructor-supplied configuration of a [`RetrievalPipeline`].
///
/// Fields
/// -----------------
/// * `filter` – thresholds and required fields of the quality filter.
/// * `fields` – columns requested from the catalog (always includes `source_id`).
/// * `sample_rows` – number of processed rows previewed at debug level, `0` disables it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    filter: FilterParams,
    fields: Vec<CatalogField>,
    sample_rows: usize,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn filter(&self) -> &FilterParams {
        &self.filter
    }

    pub fn fields(&self) -> &[CatalogField] {
        &self.fields
    }

    pub fn sample_rows(&self) -> usize {
        self.sample_rows
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            filter: FilterParams::default(),
            fields: CatalogField::QUERY_FIELDS.to_vec(),
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

/// Builder for [`PipelineConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn filter(mut self, filter: FilterParams) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = CatalogField>,
    {
        self.config.fields = fields.into_iter().collect();
        self
    }

    pub fn sample_rows(mut self, n: usize) -> Self {
        self.config.sample_rows = n;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * the field list is not empty and does not contain the auxiliary `dist` column
    ///   (the query always computes it);
    /// * every required field of the filter is requested;
    /// * the filter thresholds pass [`FilterParams::validate`] (`InvalidFilterParameter`).
    ///
    /// `source_id` is prepended when missing and duplicated fields are removed, keeping the
    /// first occurrence.
    ///
    /// Returns
    /// -----------------
    /// * `Err(HrError::InvalidPipelineParameter)` on the first violated rule.
    pub fn build(self) -> Result<PipelineConfig, HrError> {
        let mut config = self.config;

        config.filter.validate()?;
        if config.fields.is_empty() {
            return Err(HrError::InvalidPipelineParameter(
                "at least one catalog field must be requested".into(),
            ));
        }
        if let Some(aux) = config.fields.iter().find(|f| f.is_auxiliary()) {
            return Err(HrError::InvalidPipelineParameter(format!(
                "'{aux}' is computed by the query and cannot be requested"
            )));
        }
        if let Some(missing) = config
            .filter
            .required_fields()
            .iter()
            .find(|f| !config.fields.contains(f))
        {
            return Err(HrError::InvalidPipelineParameter(format!(
                "required field '{missing}' is not requested from the catalog"
            )));
        }

        let mut fields = Vec::with_capacity(config.fields.len() + 1);
        if !config.fields.contains(&CatalogField::SourceId) {
            fields.push(CatalogField::SourceId);
        }
        for f in config.fields {
            if !fields.contains(&f) {
                fields.push(f);
            }
        }
        config.fields = fields;

        Ok(config)
    }
}

/// Immutable outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    region: Region,
    search_radius: SearchRadius,
    records: Vec<AnalysisRecord>,
    stats: RetrievalStats,
}

impl PipelineResult {
    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn search_radius(&self) -> SearchRadius {
        self.search_radius
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn stats(&self) -> &RetrievalStats {
        &self.stats
    }

    /// Number of records with both derived values defined.
    pub fn plottable_count(&self) -> usize {
        self.records.iter().filter(|a| a.is_plottable()).count()
    }

    pub fn into_parts(self) -> (Vec<AnalysisRecord>, RetrievalStats) {
        (self.records, self.stats)
    }
}

/// Retrieval → quality filter → derived fields, around one [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct RetrievalPipeline<C> {
    client: C,
    config: PipelineConfig,
    filter: QualityFilter,
}

impl<C: CatalogClient> RetrievalPipeline<C> {
    pub fn new(client: C, config: PipelineConfig) -> Self {
        let filter = QualityFilter::new(config.filter.clone());
        RetrievalPipeline {
            client,
            config,
            filter,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run the pipeline for one region.
    ///
    /// Arguments
    /// -----------------
    /// * `region`: named, validated sky position.
    /// * `search_radius`: cone radius.
    /// * `row_limit`: cap on the number of rows returned by the catalog, `>= 1`.
    /// * `apply_filters`: run the quality filter (`true`) or forward the raw rows (`false`).
    ///
    /// Return
    /// ----------
    /// * The analysis-ready records with their statistics.
    /// * `Err` with a configuration error (before any catalog call) when `row_limit == 0`,
    ///   or a retrieval error when the catalog call fails or its answer is malformed.
    pub fn run(
        &self,
        region: &Region,
        search_radius: SearchRadius,
        row_limit: usize,
        apply_filters: bool,
    ) -> Result<PipelineResult, HrError> {
        if row_limit == 0 {
            return Err(HrError::InvalidPipelineParameter(
                "row_limit must be >= 1".into(),
            ));
        }
        let name = region.name.as_str();

        info!(
            region = name,
            stage = %PipelineStage::Requested,
            "Searching around {name} ({}) with a radius of {search_radius}.",
            region.position
        );
        info!(
            region = name,
            service = self.client.service_name(),
            row_limit,
            "Submitting cone search query with a row limit of {row_limit}..."
        );

        let raw = self.client.search(
            &region.position,
            search_radius,
            row_limit,
            self.config.fields(),
        )?;
        check_answer(&raw, row_limit)?;

        info!(
            region = name,
            stage = %PipelineStage::RawReceived,
            raw_count = raw.len(),
            "Retrieved {} stars from {}.",
            raw.len(),
            self.client.service_name()
        );

        let filtered = if apply_filters {
            let filtered = self.filter.filter(raw);
            info!(
                region = name,
                stage = %PipelineStage::Filtered,
                raw_count = filtered.raw_count(),
                filtered_count = filtered.filtered_count(),
                parallax_error_max = self.config.filter.parallax_error_max(),
                ruwe_max = self.config.filter.ruwe_max(),
                "After filtering, {} stars remain for plotting (removed {}).",
                filtered.filtered_count(),
                filtered.removed_count()
            );
            debug!(region = name, "Removed by pass: {}", filtered.breakdown());
            filtered
        } else {
            let passed = QualityFilter::passthrough(raw);
            info!(
                region = name,
                stage = %PipelineStage::Passthrough,
                raw_count = passed.raw_count(),
                "Filters disabled, keeping all {} stars.",
                passed.raw_count()
            );
            passed
        };

        let stats = RetrievalStats::new(&filtered, &self.config.filter);
        let records = derive(filtered);
        let stats = stats.with_derived(&records);
        info!(
            region = name,
            stage = %PipelineStage::Derived,
            undefined_abs_mag = stats.undefined_abs_mag_count(),
            "Computed BP-RP colour and absolute G magnitude for {} stars.",
            records.len()
        );

        if self.config.sample_rows > 0 && tracing::enabled!(Level::DEBUG) {
            debug!(
                region = name,
                "Sample of processed data:\n{}",
                AnalysisDisplay::new(&records).head(self.config.sample_rows)
            );
        }

        info!(region = name, stage = %PipelineStage::Done, "{stats}");

        Ok(PipelineResult {
            region: region.clone(),
            search_radius,
            records,
            stats,
        })
    }
}

/// Reject answers that break the catalog contract.
fn check_answer(raw: &RawResultSet, row_limit: usize) -> Result<(), HrError> {
    if raw.len() > row_limit {
        return Err(HrError::RowLimitExceeded {
            returned: raw.len(),
            row_limit,
        });
    }
    raw.ensure_unique_ids()
}
