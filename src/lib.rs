//! # gaia_hr
//!
//! Retrieve stars around named sky regions from the Gaia DR3 archive, keep the ones with
//! reliable astrometry, derive their colour index and absolute magnitude, and draw
//! Hertzsprung-Russell diagrams.
//!
//! ```text
//! Region ──► CatalogClient::search ──► RawResultSet
//!                                        │  QualityFilter::filter / passthrough
//!                                        ▼
//!                                  FilteredResultSet ──► derive ──► Vec<AnalysisRecord>
//!                                                                        │
//!                                                         Renderer (scatter, density, panels)
//! ```
//!
//! [`pipeline::RetrievalPipeline`] runs one region end to end, [`batch::BatchRunner`] runs a
//! CSV table of regions and isolates per-region failures.
//!
//! ```rust,no_run
//! use gaia_hr::prelude::*;
//!
//! # fn main() -> Result<(), HrError> {
//! let client = GaiaTapClient::new(HrEnv::new());
//! let pipeline = RetrievalPipeline::new(client, PipelineConfig::default());
//!
//! let region = Region::new("Omega Centauri", SkyPosition::parse("13h26m47.2s", "-47d28m46s")?);
//! let result = pipeline.run(&region, SearchRadius::from_arcmin(30.0)?, 300_000, true)?;
//! println!("{:#}", result.stats());
//!
//! PlotRenderer::new("plots").scatter(result.records(), &RenderMeta::from(&result))?;
//! # Ok(())
//! # }
//! ```
pub mod batch;
pub mod catalog;
pub mod constants;
pub mod conversion;
pub mod derived_fields;
pub mod display;
pub mod env_state;
pub mod hr_errors;
pub mod pipeline;
pub mod quality_filter;
pub mod region;
pub mod render;

pub mod prelude {
    pub use crate::batch::{
        load_targets, parse_targets, BatchDefaults, BatchOutcome, BatchReport, BatchRunner,
        BatchTarget,
    };
    pub use crate::catalog::gaia_tap::GaiaTapClient;
    pub use crate::catalog::{CatalogClient, CatalogField, CatalogRecord, RawResultSet};
    pub use crate::derived_fields::AnalysisRecord;
    pub use crate::display::AnalysisDisplayExt;
    pub use crate::env_state::HrEnv;
    pub use crate::hr_errors::{ErrorKind, HrError};
    pub use crate::pipeline::{PipelineConfig, PipelineResult, RetrievalPipeline};
    pub use crate::quality_filter::{FilterParams, FilteredResultSet, QualityFilter};
    pub use crate::region::{Region, SearchRadius, SkyPosition};
    pub use crate::render::{render_results, PlotRenderer, RenderMeta, Renderer};
}
